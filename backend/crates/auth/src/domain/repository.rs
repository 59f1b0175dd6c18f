//! Repository Traits
//!
//! Persistence contracts. `infra::postgres::PgAuthRepository` implements all
//! of them; `crate::tests` has an in-memory double.

use chrono::{DateTime, Utc};
use kernel::UserId;
use kernel::id::RefreshSessionId;
use platform::rate_limit::RateLimitStore;
use uuid::Uuid;

use crate::domain::entity::{
    AuthHold, AuthProviderLink, Credential, EmailChangeVerification, OAuthProvider, OAuthState,
    PasswordReset, RefreshSession, User,
};
use crate::domain::value_object::{email::Email, public_id::PublicId};
use crate::error::AuthResult;

/// Everything written when an account is created
///
/// Persisted atomically: either all rows exist afterwards or none do.
#[derive(Debug)]
pub struct NewAccount<'a> {
    pub user: &'a User,
    pub credential: &'a Credential,
    pub link: Option<&'a AuthProviderLink>,
    /// Hold turned into this account; deleted in the same transaction
    pub consumed_hold: Option<Uuid>,
}

#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Fails with `UserNameTaken` / `EmailTaken` on a uniqueness conflict
    async fn create_account(&self, account: NewAccount<'_>) -> AuthResult<()>;

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    async fn find_by_public_id(&self, public_id: &PublicId) -> AuthResult<Option<User>>;

    /// Lookup by canonical (lowercase) user name
    async fn find_by_user_name(&self, canonical: &str) -> AuthResult<Option<User>>;

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    async fn exists_by_user_name(&self, canonical: &str) -> AuthResult<bool>;

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool>;

    async fn update_user(&self, user: &User) -> AuthResult<()>;

    /// Delete users whose scheduled deletion time has passed
    async fn purge_due_deletions(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

#[trait_variant::make(CredentialRepository: Send)]
pub trait LocalCredentialRepository {
    async fn find_credential(&self, user_id: &UserId) -> AuthResult<Option<Credential>>;

    async fn update_credential(&self, credential: &Credential) -> AuthResult<()>;
}

#[trait_variant::make(RefreshSessionRepository: Send)]
pub trait LocalRefreshSessionRepository {
    async fn create_session(&self, session: &RefreshSession) -> AuthResult<()>;

    async fn find_session(&self, token_hash: &[u8]) -> AuthResult<Option<RefreshSession>>;

    /// Unexpired sessions, most recently used first
    async fn list_sessions(&self, user_id: &UserId) -> AuthResult<Vec<RefreshSession>>;

    /// Store the rotated session if its token is still `previous_hash`
    ///
    /// `false` means another refresh rotated it first.
    async fn rotate_session(
        &self,
        session: &RefreshSession,
        previous_hash: &[u8],
    ) -> AuthResult<bool>;

    async fn delete_session(&self, session_id: &RefreshSessionId) -> AuthResult<()>;

    /// Delete one session if it belongs to `user_id`
    async fn revoke_session(
        &self,
        user_id: &UserId,
        session_id: &RefreshSessionId,
    ) -> AuthResult<bool>;

    async fn revoke_all_sessions(
        &self,
        user_id: &UserId,
        except: Option<&RefreshSessionId>,
    ) -> AuthResult<u64>;

    async fn cleanup_expired_sessions(&self) -> AuthResult<u64>;
}

#[trait_variant::make(OAuthRepository: Send)]
pub trait LocalOAuthRepository {
    async fn save_state(&self, state: &OAuthState) -> AuthResult<()>;

    /// Fetch and delete in one step so a state is never accepted twice
    async fn take_state(&self, state_hash: &[u8]) -> AuthResult<Option<OAuthState>>;

    async fn find_link(
        &self,
        provider: OAuthProvider,
        provider_user_id: &str,
    ) -> AuthResult<Option<AuthProviderLink>>;

    async fn list_links(&self, user_id: &UserId) -> AuthResult<Vec<AuthProviderLink>>;

    async fn save_hold(&self, hold: &AuthHold) -> AuthResult<()>;

    async fn find_hold(&self, token_hash: &[u8]) -> AuthResult<Option<AuthHold>>;

    /// Expired states and holds
    async fn cleanup_expired_oauth(&self) -> AuthResult<u64>;
}

#[trait_variant::make(PasswordResetRepository: Send)]
pub trait LocalPasswordResetRepository {
    /// Drop earlier resets of the user and store this one
    async fn replace_password_reset(&self, reset: &PasswordReset) -> AuthResult<()>;

    async fn find_password_reset(&self, token_hash: &[u8]) -> AuthResult<Option<PasswordReset>>;

    async fn delete_password_resets(&self, user_id: &UserId) -> AuthResult<()>;

    async fn cleanup_expired_password_resets(&self) -> AuthResult<u64>;
}

#[trait_variant::make(EmailChangeRepository: Send)]
pub trait LocalEmailChangeRepository {
    async fn replace_email_change(&self, verification: &EmailChangeVerification) -> AuthResult<()>;

    /// Match against either side's token
    async fn find_email_change(
        &self,
        token_hash: &[u8],
    ) -> AuthResult<Option<EmailChangeVerification>>;

    async fn update_email_change(&self, verification: &EmailChangeVerification) -> AuthResult<()>;

    async fn delete_email_change(&self, user_id: &UserId) -> AuthResult<()>;

    async fn cleanup_expired_email_changes(&self) -> AuthResult<u64>;
}

#[trait_variant::make(RateLimitRepository: Send)]
pub trait LocalRateLimitRepository {
    /// Remove windows that ended before `before_ms`
    async fn cleanup_stale_rate_limits(&self, before_ms: i64) -> AuthResult<u64>;
}

/// The full storage surface the auth use cases and router need
pub trait AuthStore:
    UserRepository
    + CredentialRepository
    + RefreshSessionRepository
    + OAuthRepository
    + PasswordResetRepository
    + EmailChangeRepository
    + RateLimitRepository
    + RateLimitStore
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> AuthStore for T where
    T: UserRepository
        + CredentialRepository
        + RefreshSessionRepository
        + OAuthRepository
        + PasswordResetRepository
        + EmailChangeRepository
        + RateLimitRepository
        + RateLimitStore
        + Clone
        + Send
        + Sync
        + 'static
{
}
