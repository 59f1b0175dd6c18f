//! Account Deletion Use Cases
//!
//! Deletion is scheduled, not immediate: the account moves to
//! `PendingDeletion` and is purged by maintenance after the grace period.
//! Until then the owner can sign in and cancel.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::config::{AuthConfig, to_chrono};
use crate::application::reauth::verify_reauth;
use crate::application::session::{current_session, load_user};
use crate::application::tokens::Principal;
use crate::domain::entity::{AccountEvent, AccountEventEnvelope};
use crate::domain::gateway::EventPublisher;
use crate::domain::repository::{CredentialRepository, RefreshSessionRepository, UserRepository};
use crate::error::{AuthError, AuthResult};

pub struct ScheduleDeletionInput {
    pub password: Option<String>,
    pub totp_code: Option<String>,
}

pub struct AccountDeletionUseCase<R>
where
    R: UserRepository + CredentialRepository + RefreshSessionRepository,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    events: Arc<dyn EventPublisher>,
}

impl<R> AccountDeletionUseCase<R>
where
    R: UserRepository + CredentialRepository + RefreshSessionRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            repo,
            config,
            events,
        }
    }

    /// Returns the purge time
    pub async fn schedule(
        &self,
        principal: &Principal,
        input: ScheduleDeletionInput,
        refresh_token: Option<String>,
    ) -> AuthResult<DateTime<Utc>> {
        let mut user = load_user(self.repo.as_ref(), principal).await?;
        if user.is_pending_deletion() {
            return Err(AuthError::DeletionAlreadyScheduled);
        }

        let credential = self
            .repo
            .find_credential(&user.user_id)
            .await?
            .ok_or_else(|| AuthError::Internal("Credential missing".to_string()))?;
        verify_reauth(
            &self.config,
            &user,
            &credential,
            input.password,
            input.totp_code.as_deref(),
        )?;

        let at = user.schedule_deletion(to_chrono(self.config.deletion_grace));
        self.repo.update_user(&user).await?;

        let current = current_session(self.repo.as_ref(), principal, refresh_token.as_deref()).await?;
        self.repo
            .revoke_all_sessions(&user.user_id, current.as_ref().map(|s| &s.session_id))
            .await?;

        tracing::info!(public_id = %user.public_id, purge_at = %at, "Account deletion scheduled");
        self.events.publish(AccountEventEnvelope {
            recipient: user.public_id,
            event: AccountEvent::DeletionScheduled { at },
        });
        Ok(at)
    }

    pub async fn cancel(&self, principal: &Principal) -> AuthResult<()> {
        let mut user = load_user(self.repo.as_ref(), principal).await?;
        if !user.is_pending_deletion() {
            return Err(AuthError::DeletionNotScheduled);
        }

        user.cancel_deletion();
        self.repo.update_user(&user).await?;

        tracing::info!(public_id = %user.public_id, "Account deletion cancelled");
        self.events.publish(AccountEventEnvelope {
            recipient: user.public_id,
            event: AccountEvent::DeletionCancelled,
        });
        Ok(())
    }
}
