//! Filesystem Media Store
//!
//! Files live at `<root>/<kind dir>/<uuid>.<ext>`; the key is the path
//! relative to the root, which is also the path under the public URL.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use uuid::Uuid;

use crate::domain::gateway::{MediaStore, StoredMedia};
use crate::domain::media::{ImageFormat, MediaKind};
use crate::error::{ProfileError, ProfileResult};

#[derive(Debug, Clone)]
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the per-kind directories up front
    pub async fn prepare(&self) -> ProfileResult<()> {
        for kind in MediaKind::ALL {
            fs::create_dir_all(self.root.join(kind.dir())).await?;
        }
        Ok(())
    }

    /// Keys only ever name a file inside the root
    fn resolve(&self, key: &str) -> ProfileResult<PathBuf> {
        let relative = Path::new(key);
        let inside = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !inside || key.is_empty() {
            return Err(ProfileError::Internal(format!("Invalid media key: {key}")));
        }
        Ok(self.root.join(relative))
    }
}

impl MediaStore for FsMediaStore {
    async fn put_media(
        &self,
        kind: MediaKind,
        format: ImageFormat,
        bytes: &[u8],
    ) -> ProfileResult<String> {
        let dir = self.root.join(kind.dir());
        fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), format.extension());
        fs::write(dir.join(&file_name), bytes).await?;

        Ok(format!("{}/{}", kind.dir(), file_name))
    }

    async fn delete_media(&self, key: &str) -> ProfileResult<()> {
        match fs::remove_file(self.resolve(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_media(&self, kind: MediaKind) -> ProfileResult<Vec<StoredMedia>> {
        let mut entries = match fs::read_dir(self.root.join(kind.dir())).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut media = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            media.push(StoredMedia {
                key: format!("{}/{}", kind.dir(), file_name),
                modified_at: DateTime::<Utc>::from(metadata.modified()?),
            });
        }
        Ok(media)
    }
}
