//! Refresh Use Case
//!
//! Trades the refresh cookie for a new access token and rotates the
//! refresh token. A fingerprint mismatch is treated as a stolen cookie and
//! the session is destroyed. Of two refreshes racing on one cookie, only
//! the first to rotate wins.

use std::sync::Arc;

use platform::client::ClientFingerprint;
use platform::crypto::token_hash;

use crate::application::config::AuthConfig;
use crate::application::session::SessionTokens;
use crate::application::tokens::TokenService;
use crate::domain::repository::{RefreshSessionRepository, UserRepository};
use crate::error::{AuthError, AuthResult};

pub struct RefreshUseCase<R>
where
    R: UserRepository + RefreshSessionRepository,
{
    repo: Arc<R>,
    tokens: Arc<TokenService>,
    config: Arc<AuthConfig>,
}

impl<R> RefreshUseCase<R>
where
    R: UserRepository + RefreshSessionRepository,
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
        refresh_token: Option<String>,
        fingerprint: ClientFingerprint,
    ) -> AuthResult<SessionTokens> {
        let token = refresh_token.ok_or(AuthError::SessionInvalid)?;
        let mut session = self
            .repo
            .find_session(&token_hash(&token))
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if session.is_expired() {
            self.repo.delete_session(&session.session_id).await?;
            return Err(AuthError::SessionInvalid);
        }

        if !fingerprint.matches(&session.client_fingerprint_hash) {
            self.repo.delete_session(&session.session_id).await?;
            tracing::warn!(
                session_id = %session.session_id,
                client_ip = ?fingerprint.ip_string(),
                "Refresh token presented by a different client; session revoked"
            );
            return Err(AuthError::SessionFingerprintMismatch);
        }

        let user = self
            .repo
            .find_by_id(&session.user_id)
            .await?
            .ok_or(AuthError::SessionInvalid)?;
        if !user.can_sign_in() {
            self.repo.revoke_all_sessions(&user.user_id, None).await?;
            return Err(AuthError::AccountDisabled);
        }

        let previous_hash = session.token_hash.clone();
        let refresh_token =
            session.rotate(&fingerprint, self.config.refresh_ttl(session.remember_me));
        if !self.repo.rotate_session(&session, &previous_hash).await? {
            tracing::debug!(session_id = %session.session_id, "Refresh token already rotated");
            return Err(AuthError::SessionInvalid);
        }

        let access = self.tokens.issue_access(&user)?;

        tracing::debug!(session_id = %session.session_id, "Refresh token rotated");

        Ok(SessionTokens {
            user,
            access_token: access.token,
            expires_in_secs: access.expires_in_secs,
            refresh_token,
            refresh_max_age_secs: session.max_age_secs(),
        })
    }
}
