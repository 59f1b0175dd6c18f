//! Repository Traits
//!
//! `infra::postgres::PgProfileRepository` implements all of them against
//! the shared database; `crate::tests` has an in-memory double.

use kernel::UserId;

use crate::domain::entity::{Account, FollowDirection, FollowEntry, Page, PageRequest, Profile};
use crate::error::ProfileResult;

#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// Active account by canonical (lowercase) user name
    async fn find_active_by_name(&self, canonical: &str) -> ProfileResult<Option<Account>>;

    /// Account of a signed-in caller: active or pending deletion
    async fn find_member_by_id(&self, user_id: &UserId) -> ProfileResult<Option<Account>>;
}

#[trait_variant::make(ProfileRepository: Send)]
pub trait LocalProfileRepository {
    async fn find_profile(&self, user_id: &UserId) -> ProfileResult<Option<Profile>>;

    /// Insert or replace the user's row
    async fn save_profile(&self, profile: &Profile) -> ProfileResult<()>;

    /// Every avatar and banner key still referenced
    async fn media_keys_in_use(&self) -> ProfileResult<Vec<String>>;
}

#[trait_variant::make(FollowRepository: Send)]
pub trait LocalFollowRepository {
    /// Returns false when the edge already existed
    async fn add_follow(&self, follower: &UserId, followee: &UserId) -> ProfileResult<bool>;

    /// Returns false when there was no edge
    async fn remove_follow(&self, follower: &UserId, followee: &UserId) -> ProfileResult<bool>;

    async fn is_following(&self, follower: &UserId, followee: &UserId) -> ProfileResult<bool>;

    /// (followers, following), counting active accounts only
    async fn follow_counts(&self, user_id: &UserId) -> ProfileResult<(i64, i64)>;

    /// Newest first, active accounts only
    async fn list_follows(
        &self,
        user_id: &UserId,
        direction: FollowDirection,
        page: PageRequest,
    ) -> ProfileResult<Page<FollowEntry>>;
}

/// The full storage surface the profile router needs
pub trait ProfileStore:
    AccountRepository + ProfileRepository + FollowRepository + Send + Sync + 'static
{
}

impl<T> ProfileStore for T where
    T: AccountRepository + ProfileRepository + FollowRepository + Send + Sync + 'static
{
}
