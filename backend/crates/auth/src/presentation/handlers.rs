//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::{FromRef, Path, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use kernel::extract::ApiJson;
use kernel::id::RefreshSessionId;
use platform::mail::Mailer;
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::application::{
    AccountDeletionUseCase, ChangePasswordInput, ConfirmResetInput, EmailChangeUseCase, MeUseCase,
    OAuthCallbackInput, OAuthOutcome, OAuthUseCase, PasswordUseCase, RefreshUseCase,
    RequestEmailChangeInput, ScheduleDeletionInput, SessionTokens, SessionsUseCase, SignInInput,
    SignInOutcome, SignInTotpInput, SignInTotpUseCase, SignInUseCase, SignOutUseCase, SignUpInput,
    SignUpUseCase, TokenService, TotpUseCase,
};
use crate::domain::entity::OAuthProvider;
use crate::domain::gateway::OAuthGateway;
use crate::domain::repository::AuthStore;
use crate::error::{AuthError, AuthResult};
use crate::infra::events::BroadcastEventHub;
use crate::presentation::dto::{
    ChangePasswordRequest, DeletionScheduledResponse, EmailChangeRequest, EmailConfirmResponse,
    HoldResponse, MeResponse, OAuthCallbackRequest, OAuthStartResponse, ReauthRequest,
    ResetConfirmRequest, ResetRequestRequest, RevokedResponse, SessionItem, SessionResponse,
    SignInRequest, SignInTotpRequest, SignUpRequest, TokenRequest, TotpCodeRequest,
    TotpSetupResponse, TwoFactorRequiredResponse,
};
use crate::presentation::extractor::{AuthUser, Client, EnrollingUser, RefreshCookie, StreamUser};

/// Shared state for auth handlers
pub struct AuthAppState<R, G, M> {
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
    pub tokens: Arc<TokenService>,
    pub oauth: Arc<G>,
    pub mailer: Arc<M>,
    pub events: Arc<BroadcastEventHub>,
}

impl<R, G, M> AuthAppState<R, G, M> {
    /// Fails when the JWT secret is too weak
    pub fn new(
        repo: R,
        config: AuthConfig,
        oauth: G,
        mailer: M,
        events: Arc<BroadcastEventHub>,
    ) -> AuthResult<Self> {
        let tokens = TokenService::new(&config)?;
        Ok(Self {
            repo: Arc::new(repo),
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            oauth: Arc::new(oauth),
            mailer: Arc::new(mailer),
            events,
        })
    }
}

impl<R, G, M> Clone for AuthAppState<R, G, M> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            config: self.config.clone(),
            tokens: self.tokens.clone(),
            oauth: self.oauth.clone(),
            mailer: self.mailer.clone(),
            events: self.events.clone(),
        }
    }
}

impl<R, G, M> FromRef<AuthAppState<R, G, M>> for Arc<TokenService> {
    fn from_ref(state: &AuthAppState<R, G, M>) -> Self {
        state.tokens.clone()
    }
}

impl<R, G, M> FromRef<AuthAppState<R, G, M>> for Arc<AuthConfig> {
    fn from_ref(state: &AuthAppState<R, G, M>) -> Self {
        state.config.clone()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// JSON body plus the rotated refresh cookie
fn session_response(config: &AuthConfig, tokens: SessionTokens) -> Response {
    let cookie = config
        .refresh_cookie()
        .with_max_age(tokens.refresh_max_age_secs)
        .set_cookie_header(&tokens.refresh_token);

    let body = SessionResponse {
        access_token: tokens.access_token,
        token_type: "Bearer",
        expires_in: tokens.expires_in_secs,
        public_id: tokens.user.public_id.to_string(),
        user_name: tokens.user.user_name.display().to_string(),
        user_role: tokens.user.user_role,
    };

    let mut response = Json(body).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

fn sign_in_response(config: &AuthConfig, outcome: SignInOutcome) -> Response {
    match outcome {
        SignInOutcome::SignedIn(tokens) => session_response(config, *tokens),
        SignInOutcome::TwoFactorRequired { ticket } => Json(TwoFactorRequiredResponse {
            requires_2fa: true,
            ticket,
        })
        .into_response(),
        SignInOutcome::TwoFactorSetupRequired { enrollment_ticket } => {
            let error = AuthError::TwoFactorSetupRequired;
            let status = error.status_code();
            let mut body = error.into_app_error().problem_body();
            body["enrollmentTicket"] = enrollment_ticket.into();
            (status, Json(body)).into_response()
        }
    }
}

fn cleared_cookie_response(config: &AuthConfig, status: StatusCode) -> Response {
    let mut response = status.into_response();
    if let Some(cookie) = config.refresh_cookie().delete_cookie_header() {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

fn parse_provider(code: &str) -> AuthResult<OAuthProvider> {
    OAuthProvider::from_code(code).ok_or(AuthError::OAuthProviderNotConfigured)
}

// ============================================================================
// Sign Up / Sign In
// ============================================================================

/// POST /api/auth/signup
pub async fn sign_up<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    Client(fingerprint): Client,
    ApiJson(req): ApiJson<SignUpRequest>,
) -> AuthResult<Response>
where
    R: AuthStore,
{
    let use_case = SignUpUseCase::new(state.repo.clone(), state.tokens.clone(), state.config.clone());

    let input = SignUpInput {
        user_name: req.user_name,
        email: req.email,
        password: req.password,
        hold_token: req.hold_token,
        remember_me: req.remember_me,
    };

    let tokens = use_case.execute(input, fingerprint).await?;
    let mut response = session_response(&state.config, tokens);
    *response.status_mut() = StatusCode::CREATED;
    Ok(response)
}

/// POST /api/auth/signin
pub async fn sign_in<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    Client(fingerprint): Client,
    ApiJson(req): ApiJson<SignInRequest>,
) -> AuthResult<Response>
where
    R: AuthStore,
{
    let use_case = SignInUseCase::new(state.repo.clone(), state.tokens.clone(), state.config.clone());

    let input = SignInInput {
        identifier: req.identifier,
        password: req.password,
        remember_me: req.remember_me,
    };

    let outcome = use_case.execute(input, fingerprint).await?;
    Ok(sign_in_response(&state.config, outcome))
}

/// POST /api/auth/signin/totp
pub async fn sign_in_totp<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    Client(fingerprint): Client,
    ApiJson(req): ApiJson<SignInTotpRequest>,
) -> AuthResult<Response>
where
    R: AuthStore,
{
    let use_case =
        SignInTotpUseCase::new(state.repo.clone(), state.tokens.clone(), state.config.clone());

    let input = SignInTotpInput {
        ticket: req.ticket,
        code: req.code,
    };

    let tokens = use_case.execute(input, fingerprint).await?;
    Ok(session_response(&state.config, tokens))
}

// ============================================================================
// Sessions
// ============================================================================

/// POST /api/auth/refresh
pub async fn refresh<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    Client(fingerprint): Client,
    RefreshCookie(token): RefreshCookie,
) -> Response
where
    R: AuthStore,
{
    let use_case = RefreshUseCase::new(state.repo.clone(), state.tokens.clone(), state.config.clone());

    match use_case.execute(token, fingerprint).await {
        Ok(tokens) => session_response(&state.config, tokens),
        Err(err) => {
            // A dead refresh cookie is useless to the browser; drop it
            let mut response = err.into_response();
            if let Some(cookie) = state.config.refresh_cookie().delete_cookie_header() {
                response.headers_mut().insert(header::SET_COOKIE, cookie);
            }
            response
        }
    }
}

/// POST /api/auth/signout
pub async fn sign_out<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    RefreshCookie(token): RefreshCookie,
) -> Response
where
    R: AuthStore,
{
    let use_case = SignOutUseCase::new(state.repo.clone());
    if let Err(e) = use_case.execute(token).await {
        e.log();
    }
    cleared_cookie_response(&state.config, StatusCode::NO_CONTENT)
}

/// POST /api/auth/signout/all
pub async fn sign_out_all<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    AuthUser(principal): AuthUser,
    RefreshCookie(token): RefreshCookie,
) -> AuthResult<Json<RevokedResponse>>
where
    R: AuthStore,
{
    let use_case = SignOutUseCase::new(state.repo.clone());
    let revoked = use_case.sign_out_others(&principal, token).await?;
    Ok(Json(RevokedResponse { revoked }))
}

/// GET /api/auth/sessions
pub async fn list_sessions<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    AuthUser(principal): AuthUser,
    RefreshCookie(token): RefreshCookie,
) -> AuthResult<Json<Vec<SessionItem>>>
where
    R: AuthStore,
{
    let use_case = SessionsUseCase::new(state.repo.clone());
    let sessions = use_case.list(&principal, token).await?;
    Ok(Json(sessions.into_iter().map(SessionItem::from).collect()))
}

/// DELETE /api/auth/sessions/{id}
pub async fn revoke_session<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    AuthUser(principal): AuthUser,
    Path(session_id): Path<Uuid>,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
{
    let use_case = SessionsUseCase::new(state.repo.clone());
    use_case
        .revoke(&principal, RefreshSessionId::from_uuid(session_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
pub async fn me<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    AuthUser(principal): AuthUser,
) -> AuthResult<Json<MeResponse>>
where
    R: AuthStore,
{
    let use_case = MeUseCase::new(state.repo.clone());
    let info = use_case.execute(&principal).await?;
    Ok(Json(info.into()))
}

// ============================================================================
// TOTP
// ============================================================================

/// POST /api/auth/totp/setup
pub async fn totp_setup<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    EnrollingUser(principal): EnrollingUser,
) -> AuthResult<Json<TotpSetupResponse>>
where
    R: AuthStore,
{
    let use_case = TotpUseCase::new(state.repo.clone(), state.config.clone(), state.events.clone());
    let enrollment = use_case.setup(&principal).await?;
    Ok(Json(enrollment.into()))
}

/// POST /api/auth/totp/verify
pub async fn totp_verify<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    EnrollingUser(principal): EnrollingUser,
    ApiJson(req): ApiJson<TotpCodeRequest>,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
{
    let use_case = TotpUseCase::new(state.repo.clone(), state.config.clone(), state.events.clone());
    use_case.verify(&principal, &req.code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/totp/disable
pub async fn totp_disable<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    AuthUser(principal): AuthUser,
    ApiJson(req): ApiJson<TotpCodeRequest>,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
{
    let use_case = TotpUseCase::new(state.repo.clone(), state.config.clone(), state.events.clone());
    use_case.disable(&principal, &req.code).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Password
// ============================================================================

/// POST /api/auth/password/change
pub async fn change_password<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    AuthUser(principal): AuthUser,
    RefreshCookie(token): RefreshCookie,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
    M: Mailer + Send + Sync + 'static,
{
    let use_case = PasswordUseCase::new(
        state.repo.clone(),
        state.mailer.clone(),
        state.config.clone(),
        state.events.clone(),
    );

    let input = ChangePasswordInput {
        current_password: req.current_password,
        new_password: req.new_password,
        totp_code: req.totp_code,
    };

    use_case.change(&principal, input, token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/password/reset/request
pub async fn request_password_reset<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    ApiJson(req): ApiJson<ResetRequestRequest>,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
    M: Mailer + Send + Sync + 'static,
{
    let use_case = PasswordUseCase::new(
        state.repo.clone(),
        state.mailer.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    use_case.request_reset(&req.email).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/auth/password/reset/confirm
pub async fn confirm_password_reset<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    ApiJson(req): ApiJson<ResetConfirmRequest>,
) -> AuthResult<Response>
where
    R: AuthStore,
    M: Mailer + Send + Sync + 'static,
{
    let use_case = PasswordUseCase::new(
        state.repo.clone(),
        state.mailer.clone(),
        state.config.clone(),
        state.events.clone(),
    );

    let input = ConfirmResetInput {
        token: req.token,
        new_password: req.new_password,
    };

    use_case.confirm_reset(input).await?;
    // Every session was revoked, including one this browser may hold
    Ok(cleared_cookie_response(&state.config, StatusCode::NO_CONTENT))
}

// ============================================================================
// Email change
// ============================================================================

/// POST /api/auth/email/change
pub async fn request_email_change<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    AuthUser(principal): AuthUser,
    ApiJson(req): ApiJson<EmailChangeRequest>,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
    M: Mailer + Send + Sync + 'static,
{
    let use_case = EmailChangeUseCase::new(
        state.repo.clone(),
        state.mailer.clone(),
        state.config.clone(),
        state.events.clone(),
    );

    let input = RequestEmailChangeInput {
        new_email: req.new_email,
        password: req.password,
        totp_code: req.totp_code,
    };

    use_case.request(&principal, input).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/auth/email/confirm
pub async fn confirm_email_change<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    ApiJson(req): ApiJson<TokenRequest>,
) -> AuthResult<Json<EmailConfirmResponse>>
where
    R: AuthStore,
    M: Mailer + Send + Sync + 'static,
{
    let use_case = EmailChangeUseCase::new(
        state.repo.clone(),
        state.mailer.clone(),
        state.config.clone(),
        state.events.clone(),
    );
    let progress = use_case.confirm(&req.token).await?;
    Ok(Json(progress.into()))
}

// ============================================================================
// OAuth
// ============================================================================

/// GET /api/auth/oauth/{provider}/start
pub async fn oauth_start<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    Path(provider): Path<String>,
) -> AuthResult<Json<OAuthStartResponse>>
where
    R: AuthStore,
    G: OAuthGateway + Send + Sync + 'static,
{
    let provider = parse_provider(&provider)?;
    let use_case = OAuthUseCase::new(
        state.repo.clone(),
        state.oauth.clone(),
        state.tokens.clone(),
        state.config.clone(),
    );

    let authorization_url = use_case.start(provider).await?;
    Ok(Json(OAuthStartResponse { authorization_url }))
}

/// POST /api/auth/oauth/{provider}/callback
pub async fn oauth_callback<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    Path(provider): Path<String>,
    Client(fingerprint): Client,
    ApiJson(req): ApiJson<OAuthCallbackRequest>,
) -> AuthResult<Response>
where
    R: AuthStore,
    G: OAuthGateway + Send + Sync + 'static,
{
    let provider = parse_provider(&provider)?;
    let use_case = OAuthUseCase::new(
        state.repo.clone(),
        state.oauth.clone(),
        state.tokens.clone(),
        state.config.clone(),
    );

    let input = OAuthCallbackInput {
        code: req.code,
        state: req.state,
        remember_me: req.remember_me,
    };

    match use_case.callback(provider, input, fingerprint).await? {
        OAuthOutcome::SignedIn(outcome) => Ok(sign_in_response(&state.config, outcome)),
        OAuthOutcome::HoldCreated(hold) => {
            Ok((StatusCode::ACCEPTED, Json(HoldResponse::from(hold))).into_response())
        }
    }
}

/// GET /api/auth/oauth/hold/{token}
pub async fn hold_info<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    Path(token): Path<String>,
) -> AuthResult<Json<HoldResponse>>
where
    R: AuthStore,
    G: OAuthGateway + Send + Sync + 'static,
{
    let use_case = OAuthUseCase::new(
        state.repo.clone(),
        state.oauth.clone(),
        state.tokens.clone(),
        state.config.clone(),
    );
    let hold = use_case.hold_info(&token).await?;
    Ok(Json(hold.into()))
}

// ============================================================================
// Account deletion
// ============================================================================

/// POST /api/auth/account/delete
pub async fn schedule_deletion<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    AuthUser(principal): AuthUser,
    RefreshCookie(token): RefreshCookie,
    ApiJson(req): ApiJson<ReauthRequest>,
) -> AuthResult<Json<DeletionScheduledResponse>>
where
    R: AuthStore,
{
    let use_case =
        AccountDeletionUseCase::new(state.repo.clone(), state.config.clone(), state.events.clone());

    let input = ScheduleDeletionInput {
        password: req.password,
        totp_code: req.totp_code,
    };

    let at = use_case.schedule(&principal, input, token).await?;
    Ok(Json(DeletionScheduledResponse {
        deletion_scheduled_at: at,
    }))
}

/// POST /api/auth/account/delete/cancel
pub async fn cancel_deletion<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    AuthUser(principal): AuthUser,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
{
    let use_case =
        AccountDeletionUseCase::new(state.repo.clone(), state.config.clone(), state.events.clone());
    use_case.cancel(&principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Events
// ============================================================================

/// GET /api/auth/events
pub async fn events<R, G, M>(
    State(state): State<AuthAppState<R, G, M>>,
    StreamUser(principal): StreamUser,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    tracing::debug!(public_id = %principal.public_id, "Account event stream opened");

    let stream = state
        .events
        .subscribe(principal.public_id)
        .map(|event| Event::default().event(event.name()).json_data(&event));

    Sse::new(stream).keep_alive(KeepAlive::default())
}
