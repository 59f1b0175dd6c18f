//! Rate Limit Middleware
//!
//! Fixed-window limit per `{scope}:{client ip}`. The client ip is the socket
//! peer unless that peer is a trusted proxy. When the store is unreachable
//! the request is let through and a warning is logged.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use platform::client::{TrustedProxies, extract_client_ip};
use platform::rate_limit::{RateLimitConfig, RateLimitStore};

use crate::error::AuthError;

/// Middleware state for one rate-limited scope
pub struct RateLimitState<S> {
    pub store: Arc<S>,
    pub scope: &'static str,
    pub config: RateLimitConfig,
    pub trusted_proxies: Arc<TrustedProxies>,
}

impl<S> Clone for RateLimitState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            scope: self.scope,
            config: self.config.clone(),
            trusted_proxies: self.trusted_proxies.clone(),
        }
    }
}

impl<S> RateLimitState<S> {
    pub fn new(
        store: Arc<S>,
        scope: &'static str,
        config: RateLimitConfig,
        trusted_proxies: Arc<TrustedProxies>,
    ) -> Self {
        Self {
            store,
            scope,
            config,
            trusted_proxies,
        }
    }
}

/// Reject with 429 and `Retry-After` once the scope's budget is spent
pub async fn rate_limit<S>(
    State(state): State<RateLimitState<S>>,
    req: Request<Body>,
    next: Next,
) -> Response
where
    S: RateLimitStore + Send + Sync + 'static,
{
    let peer_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let client = extract_client_ip(req.headers(), peer_ip, &state.trusted_proxies)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let key = format!("{}:{}", state.scope, client);

    match state.store.check_and_increment(&key, &state.config).await {
        Ok(decision) if decision.allowed => next.run(req).await,
        Ok(decision) => {
            tracing::warn!(
                scope = state.scope,
                client = %client,
                retry_after = decision.retry_after_secs,
                "Rate limit exceeded"
            );
            AuthError::RateLimited {
                retry_after_secs: decision.retry_after_secs,
            }
            .into_response()
        }
        Err(e) => {
            tracing::warn!(scope = state.scope, error = %e, "Rate limit store unavailable; allowing request");
            next.run(req).await
        }
    }
}
