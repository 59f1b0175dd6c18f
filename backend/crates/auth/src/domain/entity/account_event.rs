//! Account Events
//!
//! Pushed to the owner's open event streams so other tabs and devices can
//! react (for example, the settings page refreshing once an email change
//! completes).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_object::public_id::PublicId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmedSide {
    /// The address currently on the account
    Old,
    /// The address being switched to
    New,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AccountEvent {
    EmailChangeConfirmed { side: ConfirmedSide },
    EmailChanged { email: String },
    TwoFactorEnabled,
    TwoFactorDisabled,
    PasswordChanged,
    DeletionScheduled { at: DateTime<Utc> },
    DeletionCancelled,
}

impl AccountEvent {
    /// SSE `event:` name
    pub fn name(&self) -> &'static str {
        match self {
            Self::EmailChangeConfirmed { .. } => "email_change_confirmed",
            Self::EmailChanged { .. } => "email_changed",
            Self::TwoFactorEnabled => "two_factor_enabled",
            Self::TwoFactorDisabled => "two_factor_disabled",
            Self::PasswordChanged => "password_changed",
            Self::DeletionScheduled { .. } => "deletion_scheduled",
            Self::DeletionCancelled => "deletion_cancelled",
        }
    }
}

/// An event addressed to one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEventEnvelope {
    pub recipient: PublicId,
    pub event: AccountEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(AccountEvent::EmailChangeConfirmed {
            side: ConfirmedSide::Old,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "email_change_confirmed", "side": "old" })
        );

        let json = serde_json::to_value(AccountEvent::TwoFactorEnabled).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "two_factor_enabled" }));
    }

    #[test]
    fn test_name_matches_tag() {
        let event = AccountEvent::EmailChanged {
            email: "a@example.com".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.name());
    }
}
