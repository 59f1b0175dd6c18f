//! Domain Layer

pub mod entity;
pub mod gateway;
pub mod media;
pub mod repository;

pub use entity::{Account, Profile, ProfilePatch};
pub use gateway::MediaStore;
pub use media::{ImageFormat, MediaKind};
pub use repository::{AccountRepository, FollowRepository, ProfileRepository, ProfileStore};
