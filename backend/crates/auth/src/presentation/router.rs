//! Auth Router

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::{
    Router,
    routing::{delete, get, post},
};
use platform::mail::Mailer;
use platform::rate_limit::RateLimitConfig;

use crate::domain::gateway::OAuthGateway;
use crate::domain::repository::AuthStore;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{RateLimitState, rate_limit};

/// Routes mounted under `/api/auth`
pub fn auth_router<R, G, M>(state: AuthAppState<R, G, M>) -> Router
where
    R: AuthStore,
    G: OAuthGateway + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    let limits = state.config.rate_limits.clone();
    let repo = state.repo.clone();
    let trusted_proxies = Arc::new(state.config.trusted_proxies.clone());
    let limit = move |scope: &'static str, config: &RateLimitConfig| {
        from_fn_with_state(
            RateLimitState::new(repo.clone(), scope, config.clone(), trusted_proxies.clone()),
            rate_limit::<R>,
        )
    };

    Router::new()
        .route(
            "/signup",
            post(handlers::sign_up::<R, G, M>).layer(limit("signup", &limits.sign_up)),
        )
        .route(
            "/signin",
            post(handlers::sign_in::<R, G, M>).layer(limit("signin", &limits.sign_in)),
        )
        .route(
            "/signin/totp",
            post(handlers::sign_in_totp::<R, G, M>).layer(limit("signin", &limits.sign_in)),
        )
        .route("/refresh", post(handlers::refresh::<R, G, M>))
        .route("/signout", post(handlers::sign_out::<R, G, M>))
        .route("/signout/all", post(handlers::sign_out_all::<R, G, M>))
        .route("/sessions", get(handlers::list_sessions::<R, G, M>))
        .route("/sessions/{id}", delete(handlers::revoke_session::<R, G, M>))
        .route("/me", get(handlers::me::<R, G, M>))
        .route("/totp/setup", post(handlers::totp_setup::<R, G, M>))
        .route("/totp/verify", post(handlers::totp_verify::<R, G, M>))
        .route("/totp/disable", post(handlers::totp_disable::<R, G, M>))
        .route("/password/change", post(handlers::change_password::<R, G, M>))
        .route(
            "/password/reset/request",
            post(handlers::request_password_reset::<R, G, M>)
                .layer(limit("password_reset", &limits.password_reset)),
        )
        .route(
            "/password/reset/confirm",
            post(handlers::confirm_password_reset::<R, G, M>)
                .layer(limit("password_reset", &limits.password_reset)),
        )
        .route("/email/change", post(handlers::request_email_change::<R, G, M>))
        .route("/email/confirm", post(handlers::confirm_email_change::<R, G, M>))
        .route(
            "/oauth/{provider}/start",
            get(handlers::oauth_start::<R, G, M>).layer(limit("oauth", &limits.oauth)),
        )
        .route(
            "/oauth/{provider}/callback",
            post(handlers::oauth_callback::<R, G, M>).layer(limit("oauth", &limits.oauth)),
        )
        .route("/oauth/hold/{token}", get(handlers::hold_info::<R, G, M>))
        .route("/account/delete", post(handlers::schedule_deletion::<R, G, M>))
        .route("/account/delete/cancel", post(handlers::cancel_deletion::<R, G, M>))
        .route("/events", get(handlers::events::<R, G, M>))
        .with_state(state)
}
