//! TOTP Use Cases
//!
//! setup → verify enables two-factor; disable turns it off again (not
//! allowed for roles that require it).

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::session::load_user;
use crate::application::tokens::Principal;
use crate::domain::entity::{AccountEvent, AccountEventEnvelope, Credential, User};
use crate::domain::gateway::EventPublisher;
use crate::domain::repository::{CredentialRepository, UserRepository};
use crate::domain::value_object::totp_secret::TotpEnrollment;
use crate::error::{AuthError, AuthResult};

pub struct TotpUseCase<R>
where
    R: UserRepository + CredentialRepository,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    events: Arc<dyn EventPublisher>,
}

impl<R> TotpUseCase<R>
where
    R: UserRepository + CredentialRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            repo,
            config,
            events,
        }
    }

    async fn load(&self, principal: &Principal) -> AuthResult<(User, Credential)> {
        let user = load_user(self.repo.as_ref(), principal).await?;
        let credential = self
            .repo
            .find_credential(&user.user_id)
            .await?
            .ok_or_else(|| AuthError::Internal("Credential missing".to_string()))?;
        Ok((user, credential))
    }

    /// Generate a new secret; replaces any unverified one
    pub async fn setup(&self, principal: &Principal) -> AuthResult<TotpEnrollment> {
        let (user, mut credential) = self.load(principal).await?;
        if credential.totp_enabled {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }

        let secret = credential.begin_totp_setup();
        self.repo.update_credential(&credential).await?;

        tracing::info!(public_id = %user.public_id, "TOTP setup started");
        Ok(secret.enrollment(&self.config.totp_issuer, user.account_label())?)
    }

    pub async fn verify(&self, principal: &Principal, code: &str) -> AuthResult<()> {
        let (user, mut credential) = self.load(principal).await?;
        if credential.totp_enabled {
            return Err(AuthError::TwoFactorAlreadyEnabled);
        }
        let secret = credential
            .totp_secret
            .as_ref()
            .ok_or(AuthError::TwoFactorNotSetup)?;
        if !secret.verify(code, &self.config.totp_issuer, user.account_label())? {
            return Err(AuthError::InvalidTwoFactorCode);
        }

        credential.enable_totp();
        self.repo.update_credential(&credential).await?;

        tracing::info!(public_id = %user.public_id, "TOTP enabled");
        self.events.publish(AccountEventEnvelope {
            recipient: user.public_id,
            event: AccountEvent::TwoFactorEnabled,
        });
        Ok(())
    }

    pub async fn disable(&self, principal: &Principal, code: &str) -> AuthResult<()> {
        let (user, mut credential) = self.load(principal).await?;
        if user.user_role.requires_two_factor() {
            return Err(AuthError::TwoFactorMandatory);
        }
        let secret = credential.active_totp().ok_or(AuthError::TwoFactorNotSetup)?;
        if !secret.verify(code, &self.config.totp_issuer, user.account_label())? {
            return Err(AuthError::InvalidTwoFactorCode);
        }

        credential.disable_totp();
        self.repo.update_credential(&credential).await?;

        tracing::info!(public_id = %user.public_id, "TOTP disabled");
        self.events.publish(AccountEventEnvelope {
            recipient: user.public_id,
            event: AccountEvent::TwoFactorDisabled,
        });
        Ok(())
    }
}
