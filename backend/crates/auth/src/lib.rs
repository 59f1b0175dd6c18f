//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository and gateway traits
//! - `application/` - Use cases and application services
//! - `infra/` - PostgreSQL, OAuth providers, mail, event hub
//! - `presentation/` - HTTP handlers, DTOs, extractors, router
//!
//! ## Features
//! - Sign-up with user name + email + password, or through a Google/Discord
//!   identity held until the user picks a name
//! - TOTP-based 2FA (Google Authenticator compatible)
//! - Short-lived JWT access tokens, rotating refresh tokens in an HttpOnly cookie
//! - Password reset and double-confirmed email change by mail
//! - Scheduled account deletion with a grace period
//! - Account events streamed over SSE
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, optional pepper and breach check
//! - Refresh sessions bound to the client fingerprint (User-Agent)
//! - Lockout after repeated failed sign-ins
//! - Moderator+ roles require 2FA
//! - One-time tokens are stored as SHA-256 only

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


// Re-exports for convenience
pub use application::config::AuthConfig;
pub use application::tokens::{Principal, TokenService};
pub use error::{AuthError, AuthResult};
pub use infra::{AppMailer, BroadcastEventHub, HttpOAuthGateway, PgAuthRepository};
pub use presentation::extractor::{AuthUser, MaybeAuthUser};
pub use presentation::handlers::AuthAppState;
pub use presentation::router::auth_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}
