//! Credential Entity
//!
//! Password hash, TOTP state and the failed sign-in counter of one user.
//! Accounts created through OAuth may have no password.

use chrono::{DateTime, Duration, Utc};
use kernel::UserId;

use crate::domain::value_object::{totp_secret::TotpSecret, user_password::UserPassword};

#[derive(Debug, Clone)]
pub struct Credential {
    pub user_id: UserId,
    pub password_hash: Option<UserPassword>,
    /// Present from setup on; authoritative only when `totp_enabled`
    pub totp_secret: Option<TotpSecret>,
    pub totp_enabled: bool,
    pub login_failed_count: u16,
    pub last_failed_at: Option<DateTime<Utc>>,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub const MAX_LOGIN_FAILURES: u16 = 5;
    pub const LOCKOUT_MINUTES: i64 = 15;

    pub fn new(user_id: UserId, password_hash: Option<UserPassword>) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            password_hash,
            totp_secret: None,
            totp_enabled: false,
            login_failed_count: 0,
            last_failed_at: None,
            locked_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked_until.is_some_and(|until| Utc::now() < until)
    }

    #[inline]
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Active TOTP secret, if two-factor is on
    pub fn active_totp(&self) -> Option<&TotpSecret> {
        self.totp_secret.as_ref().filter(|_| self.totp_enabled)
    }

    /// Count a failed attempt; the fifth in a row locks the account
    pub fn record_failure(&mut self) {
        let now = Utc::now();
        // a lock that ran out starts a fresh series
        if self.locked_until.is_some_and(|until| until <= now) {
            self.login_failed_count = 0;
            self.locked_until = None;
        }

        self.login_failed_count = self.login_failed_count.saturating_add(1);
        self.last_failed_at = Some(now);
        self.updated_at = now;

        if self.login_failed_count >= Self::MAX_LOGIN_FAILURES {
            self.locked_until = Some(now + Duration::minutes(Self::LOCKOUT_MINUTES));
        }
    }

    pub fn reset_failures(&mut self) {
        self.login_failed_count = 0;
        self.last_failed_at = None;
        self.locked_until = None;
        self.updated_at = Utc::now();
    }

    /// Generate a fresh secret; two-factor stays off until verified
    pub fn begin_totp_setup(&mut self) -> TotpSecret {
        let secret = TotpSecret::generate();
        self.totp_secret = Some(secret.clone());
        self.totp_enabled = false;
        self.updated_at = Utc::now();
        secret
    }

    pub fn enable_totp(&mut self) {
        if self.totp_secret.is_some() {
            self.totp_enabled = true;
            self.updated_at = Utc::now();
        }
    }

    pub fn disable_totp(&mut self) {
        self.totp_secret = None;
        self.totp_enabled = false;
        self.updated_at = Utc::now();
    }

    pub fn set_password(&mut self, password: UserPassword) {
        self.password_hash = Some(password);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lockout_after_max_failures() {
        let mut credential = Credential::new(UserId::new(), None);
        for _ in 0..Credential::MAX_LOGIN_FAILURES - 1 {
            credential.record_failure();
            assert!(!credential.is_locked());
        }
        credential.record_failure();
        assert!(credential.is_locked());

        credential.reset_failures();
        assert!(!credential.is_locked());
        assert_eq!(credential.login_failed_count, 0);
    }

    #[test]
    fn test_expired_lock_restarts_count() {
        let mut credential = Credential::new(UserId::new(), None);
        credential.login_failed_count = Credential::MAX_LOGIN_FAILURES;
        credential.locked_until = Some(Utc::now() - Duration::seconds(1));
        assert!(!credential.is_locked());

        credential.record_failure();
        assert_eq!(credential.login_failed_count, 1);
        assert!(!credential.is_locked());
    }

    #[test]
    fn test_totp_lifecycle() {
        let mut credential = Credential::new(UserId::new(), None);
        assert!(credential.active_totp().is_none());

        credential.begin_totp_setup();
        assert!(credential.totp_secret.is_some());
        assert!(credential.active_totp().is_none());

        credential.enable_totp();
        assert!(credential.active_totp().is_some());

        credential.disable_totp();
        assert!(credential.totp_secret.is_none());
        assert!(!credential.totp_enabled);
    }
}
