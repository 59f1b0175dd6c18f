//! Sign Up Use Case
//!
//! Creates an account and signs it in. Two paths:
//! - direct: user name, email and password
//! - OAuth completion: user name plus the hold token from the callback; the
//!   email comes from the provider (verified) and a password is optional

use std::sync::Arc;

use platform::client::ClientFingerprint;
use platform::crypto::token_hash;

use crate::application::config::AuthConfig;
use crate::application::session::{SessionTokens, open_session};
use crate::application::tokens::TokenService;
use crate::domain::entity::{AuthHold, Credential, User};
use crate::domain::repository::{
    NewAccount, OAuthRepository, RefreshSessionRepository, UserRepository,
};
use crate::domain::value_object::{
    email::Email,
    user_name::UserName,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

pub struct SignUpInput {
    pub user_name: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub hold_token: Option<String>,
    pub remember_me: bool,
}

pub struct SignUpUseCase<R>
where
    R: UserRepository + RefreshSessionRepository + OAuthRepository,
{
    repo: Arc<R>,
    tokens: Arc<TokenService>,
    config: Arc<AuthConfig>,
}

impl<R> SignUpUseCase<R>
where
    R: UserRepository + RefreshSessionRepository + OAuthRepository,
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
        input: SignUpInput,
        fingerprint: ClientFingerprint,
    ) -> AuthResult<SessionTokens> {
        let user_name = UserName::new(&input.user_name)?;

        let hold = match input.hold_token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => Some(self.find_live_hold(token).await?),
            None => None,
        };

        let (email, email_verified) = match &hold {
            Some(hold) => (hold.email.clone(), true),
            None => {
                let raw = input
                    .email
                    .as_deref()
                    .filter(|e| !e.trim().is_empty())
                    .ok_or_else(|| AuthError::Validation("Email is required".to_string()))?;
                (Email::new(raw)?, false)
            }
        };

        let password = match (input.password.filter(|p| !p.is_empty()), &hold) {
            (Some(raw), _) => Some(self.hash_new_password(raw, &user_name, &email).await?),
            (None, Some(_)) => None,
            (None, None) => {
                return Err(AuthError::Validation("Password is required".to_string()));
            }
        };

        if self.repo.exists_by_user_name(user_name.canonical()).await? {
            return Err(AuthError::UserNameTaken);
        }
        if self.repo.exists_by_email(&email).await? {
            return Err(AuthError::EmailTaken);
        }

        let user = User::new(user_name, email, email_verified);
        let credential = Credential::new(user.user_id, password);
        let link = hold.as_ref().map(|h| h.to_link(user.user_id));

        self.repo
            .create_account(NewAccount {
                user: &user,
                credential: &credential,
                link: link.as_ref(),
                consumed_hold: hold.as_ref().map(|h| h.hold_id),
            })
            .await?;

        tracing::info!(
            public_id = %user.public_id,
            user_name = %user.user_name,
            provider = ?hold.as_ref().map(|h| h.provider),
            "User signed up"
        );

        open_session(
            self.repo.as_ref(),
            &self.tokens,
            &self.config,
            user,
            input.remember_me,
            &fingerprint,
        )
        .await
    }

    async fn find_live_hold(&self, token: &str) -> AuthResult<AuthHold> {
        self.repo
            .find_hold(&token_hash(token))
            .await?
            .filter(|hold| !hold.is_expired())
            .ok_or(AuthError::LinkExpired)
    }

    async fn hash_new_password(
        &self,
        raw: String,
        user_name: &UserName,
        email: &Email,
    ) -> AuthResult<UserPassword> {
        let raw = RawPassword::new(raw)?;
        raw.ensure_not_containing(&[user_name.canonical(), email.local_part()])?;
        if self.config.check_breached_passwords {
            raw.ensure_not_breached().await?;
        }
        Ok(UserPassword::from_raw(&raw, self.config.pepper())?)
    }
}
