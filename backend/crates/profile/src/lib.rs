//! Profile Backend Module
//!
//! User pages, avatar/banner images and the follower graph, served under
//! `/api/users`. Accounts themselves belong to the `auth` crate; this crate
//! reads the `users` table and authenticates callers with the auth crate's
//! access tokens.
//!
//! Layout follows `auth`:
//! - `domain/` - Entities, media types, repository and storage traits
//! - `application/` - Use cases and configuration
//! - `infra/` - PostgreSQL repository, filesystem media store
//! - `presentation/` - HTTP handlers, DTOs, router

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

pub use application::{FollowUseCase, MediaUseCase, ProfileConfig, ProfileUseCase, ProfileView};
pub use error::{ProfileError, ProfileResult};
pub use infra::{FsMediaStore, PgProfileRepository};
pub use presentation::handlers::ProfileAppState;
pub use presentation::router::profile_router;
