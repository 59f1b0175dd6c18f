//! OAuth Use Cases
//!
//! start: issue a single-use state and point the browser at the provider.
//! callback: redeem the state, exchange the code, then either sign in the
//! linked account or park the identity in an [`AuthHold`] until the user
//! picks a user name (see `SignUpUseCase`).
//!
//! An identity that is not linked always produces a hold, even when its
//! email matches an existing account; sign-up then rejects the taken email.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform::client::ClientFingerprint;
use platform::crypto::token_hash;

use crate::application::config::{AuthConfig, to_chrono};
use crate::application::session::{SignInOutcome, complete_sign_in};
use crate::application::tokens::TokenService;
use crate::domain::entity::{AuthHold, OAuthIdentity, OAuthProvider, OAuthState};
use crate::domain::gateway::OAuthGateway;
use crate::domain::repository::{
    CredentialRepository, OAuthRepository, RefreshSessionRepository, UserRepository,
};
use crate::domain::value_object::{email::Email, user_name::UserName};
use crate::error::{AuthError, AuthResult};

pub struct OAuthCallbackInput {
    pub code: String,
    pub state: String,
    pub remember_me: bool,
}

#[derive(Debug, Clone)]
pub enum OAuthOutcome {
    SignedIn(SignInOutcome),
    HoldCreated(HoldInfo),
}

#[derive(Debug, Clone)]
pub struct HoldInfo {
    /// Raw token; only present right after the callback
    pub hold_token: Option<String>,
    pub provider: OAuthProvider,
    pub email: Email,
    pub suggested_user_name: Option<UserName>,
    pub expires_at: DateTime<Utc>,
}

impl HoldInfo {
    fn from_hold(hold: AuthHold, hold_token: Option<String>) -> Self {
        Self {
            hold_token,
            provider: hold.provider,
            email: hold.email,
            suggested_user_name: hold.suggested_user_name,
            expires_at: hold.expires_at,
        }
    }
}

pub struct OAuthUseCase<R, G>
where
    R: UserRepository + CredentialRepository + RefreshSessionRepository + OAuthRepository,
    G: OAuthGateway,
{
    repo: Arc<R>,
    gateway: Arc<G>,
    tokens: Arc<TokenService>,
    config: Arc<AuthConfig>,
}

impl<R, G> OAuthUseCase<R, G>
where
    R: UserRepository + CredentialRepository + RefreshSessionRepository + OAuthRepository,
    G: OAuthGateway,
{
    pub fn new(
        repo: Arc<R>,
        gateway: Arc<G>,
        tokens: Arc<TokenService>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            repo,
            gateway,
            tokens,
            config,
        }
    }

    fn ensure_configured(&self, provider: OAuthProvider) -> AuthResult<()> {
        if self.gateway.is_configured(provider) {
            Ok(())
        } else {
            Err(AuthError::OAuthProviderNotConfigured)
        }
    }

    /// Returns the provider authorization URL
    pub async fn start(&self, provider: OAuthProvider) -> AuthResult<String> {
        self.ensure_configured(provider)?;

        let (state, raw_state) = OAuthState::issue(provider, to_chrono(self.config.oauth_state_ttl));
        self.repo.save_state(&state).await?;

        tracing::debug!(%provider, "OAuth flow started");
        self.gateway.authorization_url(provider, &raw_state)
    }

    pub async fn callback(
        &self,
        provider: OAuthProvider,
        input: OAuthCallbackInput,
        fingerprint: ClientFingerprint,
    ) -> AuthResult<OAuthOutcome> {
        self.ensure_configured(provider)?;

        let state = self
            .repo
            .take_state(&token_hash(&input.state))
            .await?
            .ok_or(AuthError::OAuthStateInvalid)?;
        if !state.accepts(provider) {
            return Err(AuthError::OAuthStateInvalid);
        }

        let identity = self.gateway.fetch_identity(provider, &input.code).await?;

        if let Some(link) = self
            .repo
            .find_link(provider, &identity.provider_user_id)
            .await?
        {
            let user = self
                .repo
                .find_by_id(&link.user_id)
                .await?
                .ok_or_else(|| AuthError::Internal("Linked user missing".to_string()))?;
            let credential = self
                .repo
                .find_credential(&user.user_id)
                .await?
                .ok_or_else(|| AuthError::Internal("Credential missing".to_string()))?;
            if credential.is_locked() {
                return Err(AuthError::AccountLocked);
            }

            tracing::info!(%provider, public_id = %user.public_id, "OAuth sign-in");
            let outcome = complete_sign_in(
                self.repo.as_ref(),
                &self.tokens,
                &self.config,
                user,
                &credential,
                input.remember_me,
                &fingerprint,
            )
            .await?;
            return Ok(OAuthOutcome::SignedIn(outcome));
        }

        let hold = self.create_hold(provider, identity).await?;
        Ok(OAuthOutcome::HoldCreated(hold))
    }

    async fn create_hold(
        &self,
        provider: OAuthProvider,
        identity: OAuthIdentity,
    ) -> AuthResult<HoldInfo> {
        let email = match identity.email.as_deref() {
            Some(email) if identity.email_verified => Email::new(email)?,
            _ => return Err(AuthError::OAuthEmailUnverified),
        };

        let seed = identity
            .display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(email.local_part())
            .to_string();
        let suggested = self.available_user_name(&seed).await?;

        let (hold, hold_token) = AuthHold::issue(
            provider,
            identity.provider_user_id,
            email,
            suggested,
            to_chrono(self.config.hold_ttl),
        );
        self.repo.save_hold(&hold).await?;

        tracing::info!(%provider, email = %hold.email.masked(), "OAuth identity held for sign-up");
        Ok(HoldInfo::from_hold(hold, Some(hold_token)))
    }

    /// A free user name derived from `seed`, if a few tries find one
    async fn available_user_name(&self, seed: &str) -> AuthResult<Option<UserName>> {
        let base = UserName::suggest(seed);
        if !self.repo.exists_by_user_name(base.canonical()).await? {
            return Ok(Some(base));
        }
        for _ in 0..3 {
            let candidate = base.with_random_suffix();
            if !self.repo.exists_by_user_name(candidate.canonical()).await? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Details of a pending hold, for the completion form
    pub async fn hold_info(&self, hold_token: &str) -> AuthResult<HoldInfo> {
        let hold = self
            .repo
            .find_hold(&token_hash(hold_token))
            .await?
            .filter(|h| !h.is_expired())
            .ok_or(AuthError::LinkExpired)?;
        Ok(HoldInfo::from_hold(hold, None))
    }
}
