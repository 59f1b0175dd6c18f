//! Refresh Session Entity
//!
//! One row per signed-in client. The raw refresh token only exists in the
//! client's cookie; the row keeps its SHA-256. Every refresh rotates it.

use chrono::{DateTime, Duration, Utc};
use kernel::UserId;
use kernel::id::RefreshSessionId;
use platform::client::ClientFingerprint;
use platform::crypto::{random_token, token_hash};

#[derive(Debug, Clone)]
pub struct RefreshSession {
    pub session_id: RefreshSessionId,
    pub user_id: UserId,
    pub token_hash: Vec<u8>,
    pub remember_me: bool,
    /// SHA-256 of the User-Agent that created the session
    pub client_fingerprint_hash: Vec<u8>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl RefreshSession {
    /// New session plus the raw token to hand to the client
    pub fn issue(
        user_id: UserId,
        remember_me: bool,
        fingerprint: &ClientFingerprint,
        ttl: Duration,
    ) -> (Self, String) {
        let now = Utc::now();
        let token = random_token();
        let session = Self {
            session_id: RefreshSessionId::new(),
            user_id,
            token_hash: token_hash(&token),
            remember_me,
            client_fingerprint_hash: fingerprint.hash_vec(),
            client_ip: fingerprint.ip_string(),
            user_agent: fingerprint.user_agent.clone(),
            expires_at: now + ttl,
            created_at: now,
            last_used_at: now,
        };
        (session, token)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Replace the token and slide the expiry; returns the new raw token
    pub fn rotate(&mut self, fingerprint: &ClientFingerprint, ttl: Duration) -> String {
        let now = Utc::now();
        let token = random_token();
        self.token_hash = token_hash(&token);
        self.client_ip = fingerprint.ip_string();
        self.expires_at = now + ttl;
        self.last_used_at = now;
        token
    }

    /// Seconds until expiry, for the cookie Max-Age
    pub fn max_age_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::crypto::sha256;

    fn fingerprint(ua: &str) -> ClientFingerprint {
        ClientFingerprint::new(
            sha256(ua.as_bytes()),
            Some("10.0.0.1".parse().unwrap()),
            Some(ua.to_string()),
        )
    }

    #[test]
    fn test_issue_stores_hash_only() {
        let fp = fingerprint("Mozilla/5.0");
        let (session, token) = RefreshSession::issue(UserId::new(), false, &fp, Duration::hours(12));

        assert_eq!(session.token_hash, token_hash(&token));
        assert_ne!(session.token_hash, token.as_bytes());
        assert!(fp.matches(&session.client_fingerprint_hash));
        assert_eq!(session.client_ip.as_deref(), Some("10.0.0.1"));
        assert!(!session.is_expired());
        assert!(session.max_age_secs() > 11 * 3600);
    }

    #[test]
    fn test_rotate_replaces_token() {
        let fp = fingerprint("Mozilla/5.0");
        let (mut session, first) = RefreshSession::issue(UserId::new(), true, &fp, Duration::days(30));
        let old_hash = session.token_hash.clone();

        let second = session.rotate(&fp, Duration::days(30));
        assert_ne!(first, second);
        assert_ne!(session.token_hash, old_hash);
        assert_eq!(session.token_hash, token_hash(&second));
    }

    #[test]
    fn test_expired() {
        let fp = fingerprint("Mozilla/5.0");
        let (mut session, _) = RefreshSession::issue(UserId::new(), false, &fp, Duration::hours(1));
        session.expires_at = Utc::now() - Duration::seconds(1);
        assert!(session.is_expired());
        assert_eq!(session.max_age_secs(), 0);
    }
}
