//! Application Layer - Use Cases

pub mod config;
pub mod follow;
mod lookup;
pub mod media;
pub mod profile;

pub use config::ProfileConfig;
pub use follow::FollowUseCase;
pub use media::MediaUseCase;
pub use profile::{ProfileUseCase, ProfileView};
