use chrono::{DateTime, Duration, Utc};
use kernel::UserId;
use platform::crypto::{random_token, token_hash};

/// Outstanding password reset; the raw token is only in the mailed link
#[derive(Debug, Clone)]
pub struct PasswordReset {
    pub token_hash: Vec<u8>,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PasswordReset {
    pub fn issue(user_id: UserId, ttl: Duration) -> (Self, String) {
        let now = Utc::now();
        let raw = random_token();
        let reset = Self {
            token_hash: token_hash(&raw),
            user_id,
            expires_at: now + ttl,
            created_at: now,
        };
        (reset, raw)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
