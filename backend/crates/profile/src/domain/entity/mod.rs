//! Entities

pub mod account;
pub mod follow;
pub mod profile;

pub use account::Account;
pub use follow::{FollowDirection, FollowEntry, Page, PageRequest};
pub use profile::{Profile, ProfilePatch};
