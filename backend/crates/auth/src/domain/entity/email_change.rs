//! Email Change Verification
//!
//! Changing the address needs a confirmation from both mailboxes: a token
//! goes to the current address and another to the new one. The swap
//! happens once both are confirmed. One pending request per user.

use chrono::{DateTime, Duration, Utc};
use kernel::UserId;
use platform::crypto::{constant_time_eq, random_token, token_hash};

use super::account_event::ConfirmedSide;
use crate::domain::value_object::email::Email;

#[derive(Debug, Clone)]
pub struct EmailChangeVerification {
    pub user_id: UserId,
    pub new_email: Email,
    pub old_token_hash: Vec<u8>,
    pub new_token_hash: Vec<u8>,
    pub old_confirmed_at: Option<DateTime<Utc>>,
    pub new_confirmed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Raw tokens to mail out
#[derive(Debug)]
pub struct EmailChangeTokens {
    pub old_address_token: String,
    pub new_address_token: String,
}

impl EmailChangeVerification {
    pub fn issue(user_id: UserId, new_email: Email, ttl: Duration) -> (Self, EmailChangeTokens) {
        let now = Utc::now();
        let tokens = EmailChangeTokens {
            old_address_token: random_token(),
            new_address_token: random_token(),
        };
        let verification = Self {
            user_id,
            new_email,
            old_token_hash: token_hash(&tokens.old_address_token),
            new_token_hash: token_hash(&tokens.new_address_token),
            old_confirmed_at: None,
            new_confirmed_at: None,
            expires_at: now + ttl,
            created_at: now,
        };
        (verification, tokens)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Which mailbox the token hash belongs to
    pub fn side_of(&self, hash: &[u8]) -> Option<ConfirmedSide> {
        if constant_time_eq(&self.old_token_hash, hash) {
            Some(ConfirmedSide::Old)
        } else if constant_time_eq(&self.new_token_hash, hash) {
            Some(ConfirmedSide::New)
        } else {
            None
        }
    }

    /// Record a confirmation; repeating one is a no-op
    pub fn confirm(&mut self, side: ConfirmedSide) {
        let now = Utc::now();
        let slot = match side {
            ConfirmedSide::Old => &mut self.old_confirmed_at,
            ConfirmedSide::New => &mut self.new_confirmed_at,
        };
        if slot.is_none() {
            *slot = Some(now);
        }
    }

    pub fn is_complete(&self) -> bool {
        self.old_confirmed_at.is_some() && self.new_confirmed_at.is_some()
    }
}
