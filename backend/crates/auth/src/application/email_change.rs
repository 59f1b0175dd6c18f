//! Email Change Use Cases
//!
//! request: re-authenticate, then mail one link to the current address and
//! one to the new address. confirm: each link marks its side; when both
//! sides are in, the address is swapped.

use std::sync::Arc;

use platform::crypto::token_hash;
use platform::mail::Mailer;

use crate::application::config::{AuthConfig, to_chrono};
use crate::application::notifications::email_change_mail;
use crate::application::reauth::verify_reauth;
use crate::application::session::load_user;
use crate::application::tokens::Principal;
use crate::domain::entity::{
    AccountEvent, AccountEventEnvelope, ConfirmedSide, EmailChangeVerification,
};
use crate::domain::gateway::EventPublisher;
use crate::domain::repository::{CredentialRepository, EmailChangeRepository, UserRepository};
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

pub struct RequestEmailChangeInput {
    pub new_email: String,
    pub password: Option<String>,
    pub totp_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailChangeProgress {
    pub side: ConfirmedSide,
    /// Both sides confirmed and the address swapped
    pub completed: bool,
}

pub struct EmailChangeUseCase<R, M>
where
    R: UserRepository + CredentialRepository + EmailChangeRepository,
    M: Mailer,
{
    repo: Arc<R>,
    mailer: Arc<M>,
    config: Arc<AuthConfig>,
    events: Arc<dyn EventPublisher>,
}

impl<R, M> EmailChangeUseCase<R, M>
where
    R: UserRepository + CredentialRepository + EmailChangeRepository,
    M: Mailer,
{
    pub fn new(
        repo: Arc<R>,
        mailer: Arc<M>,
        config: Arc<AuthConfig>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repo,
            mailer,
            config,
            events,
        }
    }

    pub async fn request(
        &self,
        principal: &Principal,
        input: RequestEmailChangeInput,
    ) -> AuthResult<()> {
        let user = load_user(self.repo.as_ref(), principal).await?;
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

        let new_email = Email::new(&input.new_email)?;
        if new_email == user.email {
            return Err(AuthError::Validation(
                "New email matches the current one".to_string(),
            ));
        }
        if self.repo.exists_by_email(&new_email).await? {
            return Err(AuthError::EmailTaken);
        }

        let (verification, tokens) = EmailChangeVerification::issue(
            user.user_id,
            new_email.clone(),
            to_chrono(self.config.email_change_ttl),
        );
        self.repo.replace_email_change(&verification).await?;

        let name = user.user_name.display();
        let old_link = self
            .config
            .frontend_link("confirm-email", &tokens.old_address_token);
        let new_link = self
            .config
            .frontend_link("confirm-email", &tokens.new_address_token);

        let sent = async {
            self.mailer
                .send(email_change_mail(&user.email, name, &new_email, &old_link, false))
                .await?;
            self.mailer
                .send(email_change_mail(&new_email, name, &new_email, &new_link, true))
                .await
        }
        .await;

        // a request nobody can confirm must not stay pending
        if let Err(e) = sent {
            if let Err(cleanup) = self.repo.delete_email_change(&user.user_id).await {
                tracing::error!(
                    public_id = %user.public_id,
                    error = %cleanup,
                    "Failed to drop undeliverable email change"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            public_id = %user.public_id,
            new_email = %new_email.masked(),
            "Email change requested"
        );
        Ok(())
    }

    pub async fn confirm(&self, token: &str) -> AuthResult<EmailChangeProgress> {
        let hash = token_hash(token);
        let mut verification = self
            .repo
            .find_email_change(&hash)
            .await?
            .filter(|v| !v.is_expired())
            .ok_or(AuthError::LinkExpired)?;
        let side = verification.side_of(&hash).ok_or(AuthError::LinkExpired)?;

        let mut user = self
            .repo
            .find_by_id(&verification.user_id)
            .await?
            .filter(|u| u.can_sign_in())
            .ok_or(AuthError::LinkExpired)?;

        verification.confirm(side);
        self.events.publish(AccountEventEnvelope {
            recipient: user.public_id,
            event: AccountEvent::EmailChangeConfirmed { side },
        });

        if !verification.is_complete() {
            self.repo.update_email_change(&verification).await?;
            tracing::info!(public_id = %user.public_id, ?side, "Email change side confirmed");
            return Ok(EmailChangeProgress {
                side,
                completed: false,
            });
        }

        let owner = self.repo.find_by_email(&verification.new_email).await?;
        if owner.is_some_and(|o| o.user_id != user.user_id) {
            self.repo.delete_email_change(&user.user_id).await?;
            return Err(AuthError::EmailTaken);
        }

        user.change_email(verification.new_email.clone());
        self.repo.update_user(&user).await?;
        self.repo.delete_email_change(&user.user_id).await?;

        tracing::info!(public_id = %user.public_id, "Email changed");
        self.events.publish(AccountEventEnvelope {
            recipient: user.public_id,
            event: AccountEvent::EmailChanged {
                email: user.email.to_string(),
            },
        });

        Ok(EmailChangeProgress {
            side,
            completed: true,
        })
    }
}
