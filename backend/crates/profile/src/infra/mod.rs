//! Infrastructure Layer
//!
//! PostgreSQL repository and filesystem media storage.

pub mod media_store;
pub mod postgres;

pub use media_store::FsMediaStore;
pub use postgres::PgProfileRepository;
