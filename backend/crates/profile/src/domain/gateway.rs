//! Media Storage Gateway

use chrono::{DateTime, Utc};

use crate::domain::media::{ImageFormat, MediaKind};
use crate::error::ProfileResult;

/// A stored file as listed by [`MediaStore::list_media`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub key: String,
    pub modified_at: DateTime<Utc>,
}

#[trait_variant::make(MediaStore: Send)]
pub trait LocalMediaStore {
    /// Store `bytes` under a fresh key and return the key
    async fn put_media(
        &self,
        kind: MediaKind,
        format: ImageFormat,
        bytes: &[u8],
    ) -> ProfileResult<String>;

    /// Remove a stored file; a missing file is not an error
    async fn delete_media(&self, key: &str) -> ProfileResult<()>;

    async fn list_media(&self, kind: MediaKind) -> ProfileResult<Vec<StoredMedia>>;
}
