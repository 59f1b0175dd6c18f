//! User Status
//!
//! - **Active**: normal account
//! - **Disabled**: blocked by an operator; cannot sign in
//! - **PendingDeletion**: the owner scheduled deletion; the account still
//!   signs in (so the owner can cancel) but is hidden from other users and
//!   is purged once `deletion_scheduled_at` passes

use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum UserStatus {
    #[default]
    #[display("active")]
    Active = 0,
    #[display("disabled")]
    Disabled = 1,
    #[display("pending_deletion")]
    PendingDeletion = 2,
}

impl UserStatus {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn can_sign_in(&self) -> bool {
        matches!(self, Self::Active | Self::PendingDeletion)
    }

    /// Visible to other users (profiles, follow targets)
    #[inline]
    pub const fn is_public(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(Self::Active),
            1 => Some(Self::Disabled),
            2 => Some(Self::PendingDeletion),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            UserStatus::Active,
            UserStatus::Disabled,
            UserStatus::PendingDeletion,
        ] {
            assert_eq!(UserStatus::from_id(status.id()), Some(status));
        }
        assert_eq!(UserStatus::from_id(9), None);
    }

    #[test]
    fn test_status_capabilities() {
        assert!(UserStatus::Active.can_sign_in());
        assert!(UserStatus::PendingDeletion.can_sign_in());
        assert!(!UserStatus::Disabled.can_sign_in());

        assert!(UserStatus::Active.is_public());
        assert!(!UserStatus::PendingDeletion.is_public());
        assert!(!UserStatus::Disabled.is_public());
    }

    #[test]
    fn test_display() {
        assert_eq!(UserStatus::PendingDeletion.to_string(), "pending_deletion");
    }
}
