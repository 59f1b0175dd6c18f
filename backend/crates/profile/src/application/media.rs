//! Avatar and Banner Uploads
//!
//! The new file is written first and the profile pointed at it; only then
//! is the previous file removed. A failed removal leaves an orphan for
//! [`MediaUseCase::sweep_orphans`].

use std::collections::HashSet;
use std::sync::Arc;

use auth::Principal;
use chrono::Utc;

use crate::application::config::ProfileConfig;
use crate::application::lookup::load_caller;
use crate::domain::entity::Profile;
use crate::domain::gateway::MediaStore;
use crate::domain::media::{ImageFormat, MediaKind};
use crate::domain::repository::{AccountRepository, ProfileRepository};
use crate::error::{ProfileError, ProfileResult};

pub struct MediaUseCase<R, S>
where
    R: AccountRepository + ProfileRepository,
    S: MediaStore,
{
    repo: Arc<R>,
    store: Arc<S>,
    config: Arc<ProfileConfig>,
}

impl<R, S> MediaUseCase<R, S>
where
    R: AccountRepository + ProfileRepository,
    S: MediaStore,
{
    pub fn new(repo: Arc<R>, store: Arc<S>, config: Arc<ProfileConfig>) -> Self {
        Self {
            repo,
            store,
            config,
        }
    }

    /// Check an upload before anything is written
    pub fn validate(&self, kind: MediaKind, bytes: &[u8]) -> ProfileResult<ImageFormat> {
        let max_bytes = self.config.max_bytes(kind);
        if bytes.len() > max_bytes {
            return Err(ProfileError::MediaTooLarge { max_bytes });
        }
        if bytes.is_empty() {
            return Err(ProfileError::MissingFile);
        }
        ImageFormat::detect(bytes).ok_or(ProfileError::UnsupportedMediaType)
    }

    pub async fn upload(
        &self,
        principal: &Principal,
        kind: MediaKind,
        bytes: &[u8],
    ) -> ProfileResult<Profile> {
        let format = self.validate(kind, bytes)?;
        let account = load_caller(self.repo.as_ref(), principal).await?;

        let key = self.store.put_media(kind, format, bytes).await?;

        let mut profile = self
            .repo
            .find_profile(&account.user_id)
            .await?
            .unwrap_or_else(|| Profile::empty(account.user_id));
        let previous = profile.set_media_key(kind, Some(key.clone()));

        if let Err(e) = self.repo.save_profile(&profile).await {
            self.discard(&key).await;
            return Err(e);
        }

        tracing::info!(
            public_id = %account.public_id,
            %kind,
            %format,
            size = bytes.len(),
            "Media uploaded"
        );

        if let Some(previous) = previous {
            self.discard(&previous).await;
        }
        Ok(profile)
    }

    pub async fn remove(&self, principal: &Principal, kind: MediaKind) -> ProfileResult<Profile> {
        let account = load_caller(self.repo.as_ref(), principal).await?;

        let Some(mut profile) = self.repo.find_profile(&account.user_id).await? else {
            return Ok(Profile::empty(account.user_id));
        };
        let Some(previous) = profile.set_media_key(kind, None) else {
            return Ok(profile);
        };

        self.repo.save_profile(&profile).await?;
        tracing::info!(public_id = %account.public_id, %kind, "Media removed");

        self.discard(&previous).await;
        Ok(profile)
    }

    /// Delete stored files no profile points at any more
    ///
    /// Covers replaced files whose removal failed and the media of purged
    /// accounts (their profile rows go with the user row).
    pub async fn sweep_orphans(&self) -> ProfileResult<u64> {
        let in_use: HashSet<String> = self.repo.media_keys_in_use().await?.into_iter().collect();
        let grace = chrono::Duration::from_std(self.config.orphan_grace)
            .unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now() - grace;

        let mut removed = 0;
        for kind in MediaKind::ALL {
            for media in self.store.list_media(kind).await? {
                if in_use.contains(&media.key) || media.modified_at > cutoff {
                    continue;
                }
                self.store.delete_media(&media.key).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(count = removed, "Removed orphaned media files");
        }
        Ok(removed)
    }

    async fn discard(&self, key: &str) {
        if let Err(e) = self.store.delete_media(key).await {
            tracing::warn!(key, error = %e, "Failed to remove media file");
        }
    }
}
