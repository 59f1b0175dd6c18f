use auth::Principal;
use auth::domain::value_object::user_name::UserName;

use crate::domain::entity::Account;
use crate::domain::repository::AccountRepository;
use crate::error::{ProfileError, ProfileResult};

/// Active account behind a `/{userName}` path segment
pub(crate) async fn find_target<R>(repo: &R, user_name: &str) -> ProfileResult<Account>
where
    R: AccountRepository,
{
    repo.find_active_by_name(&UserName::canonicalize(user_name))
        .await?
        .ok_or(ProfileError::UserNotFound)
}

/// The caller's own account; a vanished account ends access
pub(crate) async fn load_caller<R>(repo: &R, principal: &Principal) -> ProfileResult<Account>
where
    R: AccountRepository,
{
    repo.find_member_by_id(&principal.user_id)
        .await?
        .ok_or(ProfileError::Unauthenticated)
}
