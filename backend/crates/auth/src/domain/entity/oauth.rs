//! OAuth Entities
//!
//! - [`OAuthState`]: single-use CSRF state for an authorization redirect
//! - [`AuthProviderLink`]: a provider identity attached to a user
//! - [`AuthHold`]: a verified provider identity waiting for the user to
//!   pick a user name and finish sign-up

use chrono::{DateTime, Duration, Utc};
use derive_more::Display;
use kernel::UserId;
use platform::crypto::{random_token, token_hash};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_object::{email::Email, user_name::UserName};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    #[display("google")]
    Google,
    #[display("discord")]
    Discord,
}

impl OAuthProvider {
    pub const ALL: [OAuthProvider; 2] = [OAuthProvider::Google, OAuthProvider::Discord];

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Discord => "discord",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }
}

#[derive(Debug, Clone)]
pub struct OAuthState {
    pub state_hash: Vec<u8>,
    pub provider: OAuthProvider,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OAuthState {
    /// New state plus the raw value for the authorization URL
    pub fn issue(provider: OAuthProvider, ttl: Duration) -> (Self, String) {
        let now = Utc::now();
        let raw = random_token();
        let state = Self {
            state_hash: token_hash(&raw),
            provider,
            expires_at: now + ttl,
            created_at: now,
        };
        (state, raw)
    }

    /// Usable for a callback from `provider`
    pub fn accepts(&self, provider: OAuthProvider) -> bool {
        self.provider == provider && Utc::now() < self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthProviderLink {
    pub user_id: UserId,
    pub provider: OAuthProvider,
    pub provider_user_id: String,
    pub created_at: DateTime<Utc>,
}

impl AuthProviderLink {
    pub fn new(user_id: UserId, provider: OAuthProvider, provider_user_id: impl Into<String>) -> Self {
        Self {
            user_id,
            provider,
            provider_user_id: provider_user_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Identity returned by a provider after the code exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthIdentity {
    pub provider_user_id: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthHold {
    pub hold_id: Uuid,
    pub token_hash: Vec<u8>,
    pub provider: OAuthProvider,
    pub provider_user_id: String,
    pub email: Email,
    pub suggested_user_name: Option<UserName>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AuthHold {
    /// New hold plus the raw token the client presents at sign-up
    pub fn issue(
        provider: OAuthProvider,
        provider_user_id: impl Into<String>,
        email: Email,
        suggested_user_name: Option<UserName>,
        ttl: Duration,
    ) -> (Self, String) {
        let now = Utc::now();
        let raw = random_token();
        let hold = Self {
            hold_id: Uuid::new_v4(),
            token_hash: token_hash(&raw),
            provider,
            provider_user_id: provider_user_id.into(),
            email,
            suggested_user_name,
            expires_at: now + ttl,
            created_at: now,
        };
        (hold, raw)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// The link created when the hold is turned into an account
    pub fn to_link(&self, user_id: UserId) -> AuthProviderLink {
        AuthProviderLink::new(user_id, self.provider, self.provider_user_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_codes() {
        for provider in OAuthProvider::ALL {
            assert_eq!(OAuthProvider::from_code(provider.code()), Some(provider));
            assert_eq!(provider.to_string(), provider.code());
        }
        assert_eq!(OAuthProvider::from_code("github"), None);
    }

    #[test]
    fn test_state_accepts_matching_provider_only() {
        let (state, raw) = OAuthState::issue(OAuthProvider::Google, Duration::minutes(10));
        assert_eq!(state.state_hash, token_hash(&raw));
        assert!(state.accepts(OAuthProvider::Google));
        assert!(!state.accepts(OAuthProvider::Discord));

        let (mut stale, _) = OAuthState::issue(OAuthProvider::Google, Duration::minutes(10));
        stale.expires_at = Utc::now() - Duration::seconds(1);
        assert!(!stale.accepts(OAuthProvider::Google));
    }

    #[test]
    fn test_hold_to_link() {
        let (hold, raw) = AuthHold::issue(
            OAuthProvider::Discord,
            "123456",
            Email::new("d@example.com").unwrap(),
            None,
            Duration::minutes(30),
        );
        assert_eq!(hold.token_hash, token_hash(&raw));
        assert!(!hold.is_expired());

        let user_id = UserId::new();
        let link = hold.to_link(user_id);
        assert_eq!(link.user_id, user_id);
        assert_eq!(link.provider, OAuthProvider::Discord);
        assert_eq!(link.provider_user_id, "123456");
    }
}
