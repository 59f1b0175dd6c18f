//! Request Extractors
//!
//! [`AuthUser`] and [`MaybeAuthUser`] only need an `Arc<TokenService>` in
//! the router state, so other crates' routers can use them too.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRef, FromRequestParts, Query};
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use platform::client::{ClientFingerprint, extract_client_ip, extract_fingerprint};
use platform::cookie::extract_cookie;

use crate::application::config::AuthConfig;
use crate::application::tokens::{Principal, TokenService};
use crate::error::AuthError;
use crate::presentation::dto::EventsQuery;

async fn bearer_token<S>(parts: &mut Parts, state: &S) -> Option<String>
where
    S: Send + Sync,
{
    TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
        .await
        .ok()
        .map(|TypedHeader(auth)| auth.token().to_string())
}

/// Caller authenticated by `Authorization: Bearer <access token>`
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state)
            .await
            .ok_or(AuthError::Unauthenticated)?;
        let tokens = Arc::<TokenService>::from_ref(state);
        Ok(Self(tokens.verify_access(&token)?))
    }
}

/// Caller of the TOTP enrollment routes
///
/// Also accepts the enrollment ticket handed to a Moderator+ whose sign-in
/// was refused for lack of 2FA.
#[derive(Debug, Clone, Copy)]
pub struct EnrollingUser(pub Principal);

impl<S> FromRequestParts<S> for EnrollingUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state)
            .await
            .ok_or(AuthError::Unauthenticated)?;
        let tokens = Arc::<TokenService>::from_ref(state);
        Ok(Self(tokens.verify_enrollment(&token)?))
    }
}

/// Like [`AuthUser`], but anonymous callers are let through
///
/// A token that is present but invalid is still rejected so the client
/// knows to refresh.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts, state).await {
            Some(token) => {
                let tokens = Arc::<TokenService>::from_ref(state);
                Ok(Self(Some(tokens.verify_access(&token)?)))
            }
            None => Ok(Self(None)),
        }
    }
}

/// Caller of the event stream; the token may also come from
/// `?access_token=` because `EventSource` cannot send headers
#[derive(Debug, Clone, Copy)]
pub struct StreamUser(pub Principal);

impl<S> FromRequestParts<S> for StreamUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(parts, state).await {
            Some(token) => Some(token),
            None => Query::<EventsQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(query)| query.access_token),
        }
        .ok_or(AuthError::Unauthenticated)?;

        let tokens = Arc::<TokenService>::from_ref(state);
        Ok(Self(tokens.verify_access(&token)?))
    }
}

/// Fingerprint of the calling client; requires a User-Agent
#[derive(Debug, Clone)]
pub struct Client(pub ClientFingerprint);

impl<S> FromRequestParts<S> for Client
where
    Arc<AuthConfig>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Arc::<AuthConfig>::from_ref(state);
        let peer_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let client_ip = extract_client_ip(&parts.headers, peer_ip, &config.trusted_proxies);
        Ok(Self(extract_fingerprint(&parts.headers, client_ip)?))
    }
}

/// Raw refresh token from the cookie, if any
#[derive(Debug, Clone)]
pub struct RefreshCookie(pub Option<String>);

impl<S> FromRequestParts<S> for RefreshCookie
where
    Arc<AuthConfig>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Arc::<AuthConfig>::from_ref(state);
        Ok(Self(extract_cookie(&parts.headers, &config.refresh_cookie_name)))
    }
}
