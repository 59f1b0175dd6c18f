//! Auth Error Types
//!
//! Auth-specific variants that render through the unified
//! `kernel::error::AppError` problem response.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::client::FingerprintError;
use platform::jwt::JwtError;
use platform::mail::MailError;
use thiserror::Error;

use crate::domain::value_object::user_name::UserNameError;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not found")]
    UserNotFound,

    #[error("User name is already taken")]
    UserNameTaken,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Invalid user name: {0}")]
    InvalidUserName(#[from] UserNameError),

    #[error("{0}")]
    Validation(String),

    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is temporarily locked")]
    AccountLocked,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Access token has expired")]
    TokenExpired,

    #[error("Session not found or expired")]
    SessionInvalid,

    #[error("Session fingerprint mismatch")]
    SessionFingerprintMismatch,

    #[error("Invalid two-factor authentication code")]
    InvalidTwoFactorCode,

    #[error("Two-factor ticket is invalid or expired")]
    InvalidTwoFactorTicket,

    #[error("Two-factor authentication must be set up for this role")]
    TwoFactorSetupRequired,

    #[error("Two-factor authentication is already enabled")]
    TwoFactorAlreadyEnabled,

    #[error("Two-factor authentication has not been set up")]
    TwoFactorNotSetup,

    #[error("Two-factor authentication cannot be disabled for this role")]
    TwoFactorMandatory,

    #[error("Link is invalid or has expired")]
    LinkExpired,

    #[error("Account deletion is already scheduled")]
    DeletionAlreadyScheduled,

    #[error("Account deletion is not scheduled")]
    DeletionNotScheduled,

    #[error("OAuth provider is not available")]
    OAuthProviderNotConfigured,

    #[error("OAuth state is invalid or expired")]
    OAuthStateInvalid,

    #[error("The provider did not confirm this email address")]
    OAuthEmailUnverified,

    #[error("OAuth provider error: {0}")]
    OAuthProviderError(String),

    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    #[error("Mail delivery failed: {0}")]
    Mail(#[from] MailError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    App(#[from] AppError),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        use AuthError::*;
        match self {
            UserNotFound | OAuthProviderNotConfigured => ErrorKind::NotFound,
            UserNameTaken | EmailTaken | TwoFactorAlreadyEnabled | DeletionAlreadyScheduled
            | DeletionNotScheduled => ErrorKind::Conflict,
            InvalidUserName(_) | Validation(_) | MissingHeader(_) | OAuthStateInvalid
            | TwoFactorNotSetup => ErrorKind::BadRequest,
            InvalidCredentials
            | Unauthenticated
            | TokenExpired
            | SessionInvalid
            | SessionFingerprintMismatch
            | InvalidTwoFactorCode
            | InvalidTwoFactorTicket => ErrorKind::Unauthorized,
            AccountLocked => ErrorKind::Locked,
            AccountDisabled | TwoFactorMandatory | OAuthEmailUnverified => ErrorKind::Forbidden,
            TwoFactorSetupRequired => ErrorKind::PreconditionFailed,
            LinkExpired => ErrorKind::Gone,
            RateLimited { .. } => ErrorKind::TooManyRequests,
            OAuthProviderError(_) | Mail(_) => ErrorKind::BadGateway,
            Database(_) | Internal(_) => ErrorKind::InternalServerError,
            App(e) => e.kind(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn into_app_error(self) -> AppError {
        use AuthError::*;
        let kind = self.kind();
        match self {
            App(e) => e,
            // no driver or relay detail in responses
            Database(e) => AppError::from(e),
            Internal(_) => AppError::new(kind, "Internal server error"),
            Mail(_) => AppError::new(kind, "Could not send email").with_action("Try again later"),
            AccountLocked => AppError::new(kind, self.to_string())
                .with_action("Wait a few minutes or reset your password"),
            TwoFactorSetupRequired => AppError::new(kind, self.to_string())
                .with_action("Set up an authenticator app before signing in"),
            RateLimited { retry_after_secs } => AppError::new(kind, self.to_string())
                .with_action(format!("Retry in {retry_after_secs} seconds")),
            other => AppError::new(kind, other.to_string()),
        }
    }

    pub fn log(&self) {
        match self {
            AuthError::Database(e) => tracing::error!(error = %e, "Auth database error"),
            AuthError::Internal(msg) => tracing::error!(message = %msg, "Auth internal error"),
            AuthError::Mail(e) => tracing::error!(error = %e, "Auth mail delivery failed"),
            AuthError::OAuthProviderError(msg) => {
                tracing::warn!(message = %msg, "OAuth provider call failed")
            }
            AuthError::InvalidCredentials => tracing::warn!("Invalid sign-in attempt"),
            AuthError::AccountLocked => tracing::warn!("Sign-in attempt on locked account"),
            AuthError::SessionFingerprintMismatch => {
                tracing::warn!("Refresh session fingerprint mismatch")
            }
            AuthError::InvalidTwoFactorCode => tracing::warn!("Invalid two-factor code"),
            AuthError::App(e) if e.is_server_error() => tracing::error!(error = %e, "Auth error"),
            _ => tracing::debug!(error = %self, "Auth error"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        let retry_after = match &self {
            AuthError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let mut response = self.into_app_error().into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<FingerprintError> for AuthError {
    fn from(err: FingerprintError) -> Self {
        match err {
            FingerprintError::MissingHeader(header) => AuthError::MissingHeader(header),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::TokenExpired,
            JwtError::Invalid => AuthError::Unauthenticated,
            JwtError::WeakSecret | JwtError::Encoding(_) => AuthError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::UserNameTaken.status_code(), StatusCode::CONFLICT);
        assert_eq!(AuthError::AccountLocked.status_code(), StatusCode::LOCKED);
        assert_eq!(
            AuthError::TwoFactorSetupRequired.status_code(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(AuthError::LinkExpired.status_code(), StatusCode::GONE);
        assert_eq!(
            AuthError::OAuthProviderError("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AuthError::App(AppError::bad_request("bad")).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_internal_detail_hidden() {
        let app = AuthError::Internal("pool timed out on host db-1".into()).into_app_error();
        assert_eq!(app.kind(), ErrorKind::InternalServerError);
        assert!(!app.message().contains("db-1"));
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AuthError::RateLimited {
            retry_after_secs: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn test_jwt_error_mapping() {
        assert!(matches!(
            AuthError::from(JwtError::Expired),
            AuthError::TokenExpired
        ));
        assert!(matches!(
            AuthError::from(JwtError::Invalid),
            AuthError::Unauthenticated
        ));
    }
}
