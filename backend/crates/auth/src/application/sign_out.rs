//! Sign Out Use Cases

use std::sync::Arc;

use platform::crypto::token_hash;

use crate::application::session::current_session;
use crate::application::tokens::Principal;
use crate::domain::repository::RefreshSessionRepository;
use crate::error::AuthResult;

pub struct SignOutUseCase<R>
where
    R: RefreshSessionRepository,
{
    repo: Arc<R>,
}

impl<R> SignOutUseCase<R>
where
    R: RefreshSessionRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Drop the session behind the cookie; unknown tokens are ignored
    pub async fn execute(&self, refresh_token: Option<String>) -> AuthResult<()> {
        let Some(token) = refresh_token else {
            return Ok(());
        };

        if let Some(session) = self.repo.find_session(&token_hash(&token)).await? {
            self.repo.delete_session(&session.session_id).await?;
            tracing::info!(session_id = %session.session_id, "Signed out");
        }
        Ok(())
    }

    /// Drop every session of the caller except the one making the request
    pub async fn sign_out_others(
        &self,
        principal: &Principal,
        refresh_token: Option<String>,
    ) -> AuthResult<u64> {
        let current = current_session(self.repo.as_ref(), principal, refresh_token.as_deref()).await?;
        let revoked = self
            .repo
            .revoke_all_sessions(&principal.user_id, current.as_ref().map(|s| &s.session_id))
            .await?;

        tracing::info!(public_id = %principal.public_id, revoked, "Signed out other sessions");
        Ok(revoked)
    }
}
