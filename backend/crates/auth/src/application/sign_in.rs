//! Sign In Use Cases
//!
//! Password sign-in, and the second step that trades a two-factor ticket
//! plus a TOTP code for a session.

use std::sync::Arc;

use kernel::UserId;
use platform::client::ClientFingerprint;

use crate::application::config::AuthConfig;
use crate::application::session::{SessionTokens, SignInOutcome, complete_sign_in, open_session};
use crate::application::tokens::TokenService;
use crate::domain::entity::{Credential, User};
use crate::domain::repository::{CredentialRepository, RefreshSessionRepository, UserRepository};
use crate::domain::value_object::{
    email::Email,
    user_name::UserName,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

pub struct SignInInput {
    /// User name or email
    pub identifier: String,
    pub password: String,
    pub remember_me: bool,
}

pub struct SignInTotpInput {
    pub ticket: String,
    pub code: String,
}

pub struct SignInUseCase<R>
where
    R: UserRepository + CredentialRepository + RefreshSessionRepository,
{
    repo: Arc<R>,
    tokens: Arc<TokenService>,
    config: Arc<AuthConfig>,
}

impl<R> SignInUseCase<R>
where
    R: UserRepository + CredentialRepository + RefreshSessionRepository,
{
    pub fn new(repo: Arc<R>, tokens: Arc<TokenService>, config: Arc<AuthConfig>) -> Self {
        Self {
            repo,
            tokens,
            config,
        }
    }

    pub async fn execute(
        &self,
        input: SignInInput,
        fingerprint: ClientFingerprint,
    ) -> AuthResult<SignInOutcome> {
        let raw = RawPassword::for_verification(input.password);

        let Some(user) = self.find_user(&input.identifier).await? else {
            raw.dummy_verify();
            return Err(AuthError::InvalidCredentials);
        };

        let mut credential = self.load_credential(&user.user_id).await?;
        if credential.is_locked() {
            return Err(AuthError::AccountLocked);
        }

        let Some(hash) = credential.password_hash.clone() else {
            // provider-only account
            raw.dummy_verify();
            return Err(AuthError::InvalidCredentials);
        };

        if !hash.verify(&raw, self.config.pepper()) {
            credential.record_failure();
            self.repo.update_credential(&credential).await?;
            tracing::warn!(
                public_id = %user.public_id,
                failed_count = credential.login_failed_count,
                locked = credential.is_locked(),
                "Password mismatch"
            );
            return Err(AuthError::InvalidCredentials);
        }

        if !user.can_sign_in() {
            return Err(AuthError::AccountDisabled);
        }

        if hash.needs_rehash() {
            credential.set_password(UserPassword::from_raw(&raw, self.config.pepper())?);
            tracing::info!(public_id = %user.public_id, "Password hash upgraded");
        }
        credential.reset_failures();
        self.repo.update_credential(&credential).await?;

        complete_sign_in(
            self.repo.as_ref(),
            &self.tokens,
            &self.config,
            user,
            &credential,
            input.remember_me,
            &fingerprint,
        )
        .await
    }

    async fn find_user(&self, identifier: &str) -> AuthResult<Option<User>> {
        let identifier = identifier.trim();
        if identifier.contains('@') {
            match Email::new(identifier) {
                Ok(email) => self.repo.find_by_email(&email).await,
                Err(_) => Ok(None),
            }
        } else {
            self.repo
                .find_by_user_name(&UserName::canonicalize(identifier))
                .await
        }
    }

    async fn load_credential(&self, user_id: &UserId) -> AuthResult<Credential> {
        self.repo
            .find_credential(user_id)
            .await?
            .ok_or_else(|| AuthError::Internal(format!("Credential missing for user {user_id}")))
    }
}

pub struct SignInTotpUseCase<R>
where
    R: UserRepository + CredentialRepository + RefreshSessionRepository,
{
    repo: Arc<R>,
    tokens: Arc<TokenService>,
    config: Arc<AuthConfig>,
}

impl<R> SignInTotpUseCase<R>
where
    R: UserRepository + CredentialRepository + RefreshSessionRepository,
{
    pub fn new(repo: Arc<R>, tokens: Arc<TokenService>, config: Arc<AuthConfig>) -> Self {
        Self {
            repo,
            tokens,
            config,
        }
    }

    pub async fn execute(
        &self,
        input: SignInTotpInput,
        fingerprint: ClientFingerprint,
    ) -> AuthResult<SessionTokens> {
        let claims = self.tokens.verify_two_factor_ticket(&input.ticket)?;
        let user_id = UserId::from_uuid(claims.uid);

        let user = self
            .repo
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::InvalidTwoFactorTicket)?;
        if !user.can_sign_in() {
            return Err(AuthError::AccountDisabled);
        }

        let mut credential = self
            .repo
            .find_credential(&user_id)
            .await?
            .ok_or(AuthError::InvalidTwoFactorTicket)?;
        if credential.is_locked() {
            return Err(AuthError::AccountLocked);
        }

        let secret = credential
            .active_totp()
            .ok_or(AuthError::InvalidTwoFactorTicket)?;
        if !secret.verify(&input.code, &self.config.totp_issuer, user.account_label())? {
            credential.record_failure();
            self.repo.update_credential(&credential).await?;
            return Err(AuthError::InvalidTwoFactorCode);
        }

        credential.reset_failures();
        self.repo.update_credential(&credential).await?;

        open_session(
            self.repo.as_ref(),
            &self.tokens,
            &self.config,
            user,
            claims.remember_me,
            &fingerprint,
        )
        .await
    }
}
