//! Follow Use Cases
//!
//! Following and unfollowing are idempotent; both sides must be active
//! accounts.

use std::sync::Arc;

use auth::Principal;

use crate::application::lookup::{find_target, load_caller};
use crate::domain::entity::{FollowDirection, FollowEntry, Page, PageRequest};
use crate::domain::repository::{AccountRepository, FollowRepository};
use crate::error::{ProfileError, ProfileResult};

pub struct FollowUseCase<R>
where
    R: AccountRepository + FollowRepository,
{
    repo: Arc<R>,
}

impl<R> FollowUseCase<R>
where
    R: AccountRepository + FollowRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn follow(&self, principal: &Principal, target_name: &str) -> ProfileResult<()> {
        let caller = load_caller(self.repo.as_ref(), principal).await?;
        let target = find_target(self.repo.as_ref(), target_name).await?;
        if caller.user_id == target.user_id {
            return Err(ProfileError::CannotFollowSelf);
        }

        if self.repo.add_follow(&caller.user_id, &target.user_id).await? {
            tracing::info!(
                follower = %caller.public_id,
                followee = %target.public_id,
                "Followed"
            );
        }
        Ok(())
    }

    pub async fn unfollow(&self, principal: &Principal, target_name: &str) -> ProfileResult<()> {
        let caller = load_caller(self.repo.as_ref(), principal).await?;
        let target = find_target(self.repo.as_ref(), target_name).await?;
        if caller.user_id == target.user_id {
            return Err(ProfileError::CannotFollowSelf);
        }

        if self
            .repo
            .remove_follow(&caller.user_id, &target.user_id)
            .await?
        {
            tracing::info!(
                follower = %caller.public_id,
                followee = %target.public_id,
                "Unfollowed"
            );
        }
        Ok(())
    }

    pub async fn list(
        &self,
        user_name: &str,
        direction: FollowDirection,
        page: PageRequest,
    ) -> ProfileResult<Page<FollowEntry>> {
        let account = find_target(self.repo.as_ref(), user_name).await?;
        self.repo
            .list_follows(&account.user_id, direction, page)
            .await
    }
}
