//! Shared Kernel
//!
//! Vocabulary every backend crate agrees on:
//! - the unified [`error::app_error::AppError`] and its [`error::kind::ErrorKind`]
//! - typed IDs ([`id::UserId`] is shared between `auth` and `profile`)
//! - `extract::ApiJson`, a JSON body extractor that rejects with `AppError`

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
#[cfg(feature = "axum")]
pub mod extract;
pub mod id;

pub use error::app_error::{AppError, AppResult};
pub use error::kind::ErrorKind;
pub use id::UserId;
