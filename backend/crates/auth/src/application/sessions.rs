//! Session Management
//!
//! Lets a user see where they are signed in and revoke individual devices.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::RefreshSessionId;

use crate::application::session::current_session;
use crate::application::tokens::Principal;
use crate::domain::repository::RefreshSessionRepository;
use crate::error::AuthResult;
use kernel::AppError;

#[derive(Debug, Clone)]
pub struct SessionView {
    pub session_id: RefreshSessionId,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
    pub remember_me: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_current: bool,
}

pub struct SessionsUseCase<R>
where
    R: RefreshSessionRepository,
{
    repo: Arc<R>,
}

impl<R> SessionsUseCase<R>
where
    R: RefreshSessionRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        principal: &Principal,
        refresh_token: Option<String>,
    ) -> AuthResult<Vec<SessionView>> {
        let current = current_session(self.repo.as_ref(), principal, refresh_token.as_deref())
            .await?
            .map(|s| s.session_id);

        let sessions = self.repo.list_sessions(&principal.user_id).await?;
        Ok(sessions
            .into_iter()
            .filter(|s| !s.is_expired())
            .map(|s| SessionView {
                is_current: current == Some(s.session_id),
                session_id: s.session_id,
                user_agent: s.user_agent,
                client_ip: s.client_ip,
                remember_me: s.remember_me,
                created_at: s.created_at,
                last_used_at: s.last_used_at,
                expires_at: s.expires_at,
            })
            .collect())
    }

    pub async fn revoke(&self, principal: &Principal, session_id: RefreshSessionId) -> AuthResult<()> {
        if !self.repo.revoke_session(&principal.user_id, &session_id).await? {
            return Err(AppError::not_found("Session not found").into());
        }
        tracing::info!(public_id = %principal.public_id, %session_id, "Session revoked");
        Ok(())
    }
}
