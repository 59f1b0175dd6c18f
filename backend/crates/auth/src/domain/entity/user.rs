//! User Entity
//!
//! Identity and lifecycle state of an account. Secrets live in
//! [`Credential`](super::credential::Credential).

use chrono::{DateTime, Duration, Utc};
use kernel::UserId;

use crate::domain::value_object::{
    email::Email, public_id::PublicId, user_name::UserName, user_role::UserRole,
    user_status::UserStatus,
};

#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    pub public_id: PublicId,
    pub user_name: UserName,
    pub email: Email,
    /// Set when the address came from a provider or passed the change flow
    pub email_verified: bool,
    pub user_role: UserRole,
    pub user_status: UserStatus,
    /// Purge time while `PendingDeletion`
    pub deletion_scheduled_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(user_name: UserName, email: Email, email_verified: bool) -> Self {
        let now = Utc::now();
        Self {
            user_id: UserId::new(),
            public_id: PublicId::new(),
            user_name,
            email,
            email_verified,
            user_role: UserRole::default(),
            user_status: UserStatus::default(),
            deletion_scheduled_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    #[inline]
    pub fn can_sign_in(&self) -> bool {
        self.user_status.can_sign_in()
    }

    #[inline]
    pub fn is_pending_deletion(&self) -> bool {
        self.user_status == UserStatus::PendingDeletion
    }

    /// Move to `PendingDeletion`; returns the purge time
    pub fn schedule_deletion(&mut self, grace: Duration) -> DateTime<Utc> {
        let now = Utc::now();
        let at = now + grace;
        self.user_status = UserStatus::PendingDeletion;
        self.deletion_scheduled_at = Some(at);
        self.updated_at = now;
        at
    }

    pub fn cancel_deletion(&mut self) {
        self.user_status = UserStatus::Active;
        self.deletion_scheduled_at = None;
        self.updated_at = Utc::now();
    }

    pub fn change_email(&mut self, email: Email) {
        self.email = email;
        self.email_verified = true;
        self.updated_at = Utc::now();
    }

    /// Name used in TOTP enrollment and mail greetings
    pub fn account_label(&self) -> &str {
        self.user_name.display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new(
            UserName::new("alice").unwrap(),
            Email::new("alice@example.com").unwrap(),
            false,
        )
    }

    #[test]
    fn test_new_user_defaults() {
        let user = user();
        assert_eq!(user.user_role, UserRole::User);
        assert_eq!(user.user_status, UserStatus::Active);
        assert!(user.can_sign_in());
        assert!(user.deletion_scheduled_at.is_none());
    }

    #[test]
    fn test_schedule_and_cancel_deletion() {
        let mut user = user();
        let at = user.schedule_deletion(Duration::days(30));
        assert!(user.is_pending_deletion());
        assert_eq!(user.deletion_scheduled_at, Some(at));
        assert!(at > Utc::now() + Duration::days(29));
        assert!(user.can_sign_in());

        user.cancel_deletion();
        assert_eq!(user.user_status, UserStatus::Active);
        assert!(user.deletion_scheduled_at.is_none());
    }

    #[test]
    fn test_change_email_marks_verified() {
        let mut user = user();
        user.change_email(Email::new("new@example.com").unwrap());
        assert_eq!(user.email.as_str(), "new@example.com");
        assert!(user.email_verified);
    }
}
