use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Account role, stored as `users.user_role` (smallint)
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum UserRole {
    #[default]
    #[display("user")]
    User = 0,
    #[display("moderator")]
    Moderator = 1,
    #[display("admin")]
    Admin = 2,
}

impl UserRole {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn is_moderator_or_higher(&self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }

    /// Privileged roles may not sign in or stay signed in without TOTP
    #[inline]
    pub const fn requires_two_factor(&self) -> bool {
        self.is_moderator_or_higher()
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(Self::User),
            1 => Some(Self::Moderator),
            2 => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "user" => Some(Self::User),
            "moderator" => Some(Self::Moderator),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_ids() {
        for role in [UserRole::User, UserRole::Moderator, UserRole::Admin] {
            assert_eq!(UserRole::from_id(role.id()), Some(role));
            assert_eq!(UserRole::from_code(&role.to_string()), Some(role));
        }
        assert_eq!(UserRole::from_id(3), None);
        assert_eq!(UserRole::from_code("root"), None);
    }

    #[test]
    fn test_two_factor_requirement() {
        assert!(!UserRole::User.requires_two_factor());
        assert!(UserRole::Moderator.requires_two_factor());
        assert!(UserRole::Admin.requires_two_factor());
    }

    #[test]
    fn test_serde_code() {
        assert_eq!(
            serde_json::to_string(&UserRole::Moderator).unwrap(),
            "\"moderator\""
        );
    }
}
