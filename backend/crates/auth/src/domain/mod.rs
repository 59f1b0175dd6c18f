//! Domain Layer
//!
//! Entities, value objects, and the repository and gateway traits the
//! application layer depends on.

pub mod entity;
pub mod gateway;
pub mod repository;
pub mod value_object;

pub use entity::{Credential, RefreshSession, User};
pub use gateway::{EventPublisher, OAuthGateway};
pub use repository::{
    AuthStore, CredentialRepository, EmailChangeRepository, OAuthRepository,
    PasswordResetRepository, RateLimitRepository, RefreshSessionRepository, UserRepository,
};
