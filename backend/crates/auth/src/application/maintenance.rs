//! Periodic cleanup, driven by the api binary

use std::sync::Arc;

use chrono::Utc;
use platform::rate_limit::now_ms;

use crate::application::config::AuthConfig;
use crate::domain::repository::{
    EmailChangeRepository, OAuthRepository, PasswordResetRepository, RateLimitRepository,
    RefreshSessionRepository, UserRepository,
};
use crate::error::AuthResult;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub purged_users: u64,
    pub expired_sessions: u64,
    pub expired_oauth: u64,
    pub expired_password_resets: u64,
    pub expired_email_changes: u64,
    pub stale_rate_limits: u64,
}

pub struct MaintenanceUseCase<R>
where
    R: UserRepository
        + RefreshSessionRepository
        + OAuthRepository
        + PasswordResetRepository
        + EmailChangeRepository
        + RateLimitRepository,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R> MaintenanceUseCase<R>
where
    R: UserRepository
        + RefreshSessionRepository
        + OAuthRepository
        + PasswordResetRepository
        + EmailChangeRepository
        + RateLimitRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self) -> AuthResult<MaintenanceReport> {
        let window_ms = self.config.rate_limits.longest_window().as_millis() as i64;

        let report = MaintenanceReport {
            purged_users: self.repo.purge_due_deletions(Utc::now()).await?,
            expired_sessions: self.repo.cleanup_expired_sessions().await?,
            expired_oauth: self.repo.cleanup_expired_oauth().await?,
            expired_password_resets: self.repo.cleanup_expired_password_resets().await?,
            expired_email_changes: self.repo.cleanup_expired_email_changes().await?,
            stale_rate_limits: self.repo.cleanup_stale_rate_limits(now_ms() - window_ms).await?,
        };

        if report.purged_users > 0 {
            tracing::info!(count = report.purged_users, "Purged accounts past their deletion date");
        }
        tracing::debug!(?report, "Auth maintenance finished");
        Ok(report)
    }
}
