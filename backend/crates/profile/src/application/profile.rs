//! Profile Use Cases
//!
//! The public view of a user page and the owner's edits to it.

use std::sync::Arc;

use auth::Principal;

use crate::application::lookup::{find_target, load_caller};
use crate::domain::entity::{Account, Profile, ProfilePatch};
use crate::domain::repository::{AccountRepository, FollowRepository, ProfileRepository};
use crate::error::ProfileResult;

/// Everything a profile page shows
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub account: Account,
    pub profile: Profile,
    pub followers: i64,
    pub following: i64,
    /// Whether the caller follows this user; `None` for anonymous callers
    /// and on one's own page
    pub is_following: Option<bool>,
}

pub struct ProfileUseCase<R>
where
    R: AccountRepository + ProfileRepository + FollowRepository,
{
    repo: Arc<R>,
}

impl<R> ProfileUseCase<R>
where
    R: AccountRepository + ProfileRepository + FollowRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    async fn profile_of(&self, account: &Account) -> ProfileResult<Profile> {
        Ok(self
            .repo
            .find_profile(&account.user_id)
            .await?
            .unwrap_or_else(|| Profile::empty(account.user_id)))
    }

    pub async fn view(
        &self,
        user_name: &str,
        viewer: Option<&Principal>,
    ) -> ProfileResult<ProfileView> {
        let account = find_target(self.repo.as_ref(), user_name).await?;
        let profile = self.profile_of(&account).await?;
        let (followers, following) = self.repo.follow_counts(&account.user_id).await?;

        let is_following = match viewer {
            Some(viewer) if viewer.user_id != account.user_id => Some(
                self.repo
                    .is_following(&viewer.user_id, &account.user_id)
                    .await?,
            ),
            _ => None,
        };

        Ok(ProfileView {
            account,
            profile,
            followers,
            following,
            is_following,
        })
    }

    /// The caller's own profile, visible even while deletion is pending
    pub async fn own(&self, principal: &Principal) -> ProfileResult<ProfileView> {
        let account = load_caller(self.repo.as_ref(), principal).await?;
        let profile = self.profile_of(&account).await?;
        let (followers, following) = self.repo.follow_counts(&account.user_id).await?;

        Ok(ProfileView {
            account,
            profile,
            followers,
            following,
            is_following: None,
        })
    }

    pub async fn update(&self, principal: &Principal, patch: ProfilePatch) -> ProfileResult<ProfileView> {
        let account = load_caller(self.repo.as_ref(), principal).await?;

        if !patch.is_empty() {
            let mut profile = self.profile_of(&account).await?;
            profile.apply(patch);
            self.repo.save_profile(&profile).await?;
            tracing::info!(public_id = %account.public_id, "Profile updated");
        }

        self.own(principal).await
    }
}
