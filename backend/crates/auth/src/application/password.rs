//! Password Use Cases
//!
//! Change (signed in, re-authenticated) and reset (by mailed link). Both
//! end every other session of the account.

use std::sync::Arc;

use platform::crypto::token_hash;
use platform::mail::Mailer;

use crate::application::config::AuthConfig;
use crate::application::notifications::password_reset_mail;
use crate::application::reauth::verify_reauth;
use crate::application::session::{current_session, load_user};
use crate::application::tokens::Principal;
use crate::domain::entity::{AccountEvent, AccountEventEnvelope, PasswordReset, User};
use crate::domain::gateway::EventPublisher;
use crate::domain::repository::{
    CredentialRepository, PasswordResetRepository, RefreshSessionRepository, UserRepository,
};
use crate::domain::value_object::{
    email::Email,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

pub struct ChangePasswordInput {
    pub current_password: Option<String>,
    pub new_password: String,
    pub totp_code: Option<String>,
}

pub struct ConfirmResetInput {
    pub token: String,
    pub new_password: String,
}

pub struct PasswordUseCase<R, M>
where
    R: UserRepository + CredentialRepository + RefreshSessionRepository + PasswordResetRepository,
    M: Mailer,
{
    repo: Arc<R>,
    mailer: Arc<M>,
    config: Arc<AuthConfig>,
    events: Arc<dyn EventPublisher>,
}

impl<R, M> PasswordUseCase<R, M>
where
    R: UserRepository + CredentialRepository + RefreshSessionRepository + PasswordResetRepository,
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

    async fn new_password_hash(&self, raw: String, user: &User) -> AuthResult<UserPassword> {
        let raw = RawPassword::new(raw)?;
        raw.ensure_not_containing(&[user.user_name.canonical(), user.email.local_part()])?;
        if self.config.check_breached_passwords {
            raw.ensure_not_breached().await?;
        }
        Ok(UserPassword::from_raw(&raw, self.config.pepper())?)
    }

    pub async fn change(
        &self,
        principal: &Principal,
        input: ChangePasswordInput,
        refresh_token: Option<String>,
    ) -> AuthResult<()> {
        let user = load_user(self.repo.as_ref(), principal).await?;
        let mut credential = self
            .repo
            .find_credential(&user.user_id)
            .await?
            .ok_or_else(|| AuthError::Internal("Credential missing".to_string()))?;

        verify_reauth(
            &self.config,
            &user,
            &credential,
            input.current_password,
            input.totp_code.as_deref(),
        )?;

        let hash = self.new_password_hash(input.new_password, &user).await?;
        credential.set_password(hash);
        credential.reset_failures();
        self.repo.update_credential(&credential).await?;

        let current = current_session(self.repo.as_ref(), principal, refresh_token.as_deref()).await?;
        let revoked = self
            .repo
            .revoke_all_sessions(&user.user_id, current.as_ref().map(|s| &s.session_id))
            .await?;

        tracing::info!(public_id = %user.public_id, revoked, "Password changed");
        self.events.publish(AccountEventEnvelope {
            recipient: user.public_id,
            event: AccountEvent::PasswordChanged,
        });
        Ok(())
    }

    /// Mail a reset link if the address belongs to a usable account
    ///
    /// The outcome is the same whether or not the account exists.
    pub async fn request_reset(&self, email: &str) -> AuthResult<()> {
        let email = Email::new(email)?;
        let Some(user) = self.repo.find_by_email(&email).await? else {
            tracing::debug!(email = %email.masked(), "Password reset for unknown email");
            return Ok(());
        };
        if !user.can_sign_in() {
            tracing::debug!(public_id = %user.public_id, "Password reset for disabled account");
            return Ok(());
        }

        let ttl = crate::application::config::to_chrono(self.config.password_reset_ttl);
        let (reset, token) = PasswordReset::issue(user.user_id, ttl);
        self.repo.replace_password_reset(&reset).await?;

        let link = self.config.frontend_link("reset-password", &token);
        let mail = password_reset_mail(
            &user.email,
            user.user_name.display(),
            &link,
            ttl.num_minutes().max(1) as u64,
        );
        if let Err(e) = self.mailer.send(mail).await {
            // same response either way; see above
            tracing::error!(public_id = %user.public_id, error = %e, "Password reset mail failed");
        } else {
            tracing::info!(public_id = %user.public_id, "Password reset mail sent");
        }
        Ok(())
    }

    pub async fn confirm_reset(&self, input: ConfirmResetInput) -> AuthResult<()> {
        let reset = self
            .repo
            .find_password_reset(&token_hash(&input.token))
            .await?
            .filter(|r| !r.is_expired())
            .ok_or(AuthError::LinkExpired)?;

        let user = self
            .repo
            .find_by_id(&reset.user_id)
            .await?
            .filter(|u| u.can_sign_in())
            .ok_or(AuthError::LinkExpired)?;
        let mut credential = self
            .repo
            .find_credential(&user.user_id)
            .await?
            .ok_or_else(|| AuthError::Internal("Credential missing".to_string()))?;

        let hash = self.new_password_hash(input.new_password, &user).await?;
        credential.set_password(hash);
        credential.reset_failures();
        self.repo.update_credential(&credential).await?;

        self.repo.delete_password_resets(&user.user_id).await?;
        let revoked = self.repo.revoke_all_sessions(&user.user_id, None).await?;

        tracing::info!(public_id = %user.public_id, revoked, "Password reset completed");
        self.events.publish(AccountEventEnvelope {
            recipient: user.public_id,
            event: AccountEvent::PasswordChanged,
        });
        Ok(())
    }
}
