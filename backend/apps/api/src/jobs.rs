//! Background Maintenance
//!
//! One loop on a fixed interval: auth cleanup (purging accounts past their
//! deletion date included), then the media sweep. Failures are logged and
//! retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use auth::AuthConfig;
use auth::application::maintenance::MaintenanceUseCase;
use auth::PgAuthRepository;
use profile::{FsMediaStore, MediaUseCase, PgProfileRepository, ProfileConfig};
use tokio::time::{MissedTickBehavior, interval};

pub struct Maintenance {
    pub auth_repo: Arc<PgAuthRepository>,
    pub auth_config: Arc<AuthConfig>,
    pub profile_repo: Arc<PgProfileRepository>,
    pub media: Arc<FsMediaStore>,
    pub profile_config: Arc<ProfileConfig>,
}

impl Maintenance {
    pub async fn run_once(&self) {
        let auth = MaintenanceUseCase::new(self.auth_repo.clone(), self.auth_config.clone());
        match auth.execute().await {
            Ok(report) => tracing::info!(
                purged_users = report.purged_users,
                expired_sessions = report.expired_sessions,
                expired_oauth = report.expired_oauth,
                expired_password_resets = report.expired_password_resets,
                expired_email_changes = report.expired_email_changes,
                stale_rate_limits = report.stale_rate_limits,
                "Auth maintenance completed"
            ),
            Err(e) => tracing::warn!(error = %e, "Auth maintenance failed"),
        }

        let media = MediaUseCase::new(
            self.profile_repo.clone(),
            self.media.clone(),
            self.profile_config.clone(),
        );
        if let Err(e) = media.sweep_orphans().await {
            tracing::warn!(error = %e, "Media sweep failed");
        }
    }

    /// Run forever; the first pass happens immediately
    pub fn spawn(self, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(every.max(Duration::from_secs(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }
}
