//! User Password Value Objects
//!
//! [`RawPassword`] is user input (zeroised on drop); [`UserPassword`] is the
//! Argon2id PHC string stored in `auth_credentials.password_hash`. The
//! cryptography lives in `platform::password`.

use kernel::error::app_error::{AppError, AppResult};
use platform::password::{
    ClearTextPassword, HashedPassword, PasswordHashError, PasswordPolicyError,
};
use std::fmt;

fn policy_error(e: PasswordPolicyError) -> AppError {
    let action = match e {
        PasswordPolicyError::TooShort { .. } => "Choose a longer password",
        PasswordPolicyError::TooLong { .. } => "Choose a shorter password",
        PasswordPolicyError::Compromised => "Choose a password you have not used elsewhere",
        PasswordPolicyError::EmptyOrWhitespace => "Enter a password",
        PasswordPolicyError::InvalidCharacter => "Remove control characters",
        PasswordPolicyError::CommonPattern => "Choose a less predictable password",
        PasswordPolicyError::ContainsIdentity => "Do not reuse your user name or email",
    };
    AppError::bad_request(e.to_string()).with_action(action)
}

/// Password as typed by the user
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// A new password: runs the length, character and pattern policy
    pub fn new(raw: String) -> AppResult<Self> {
        ClearTextPassword::new(raw).map(Self).map_err(policy_error)
    }

    /// A password being checked against a stored hash: no policy
    pub fn for_verification(raw: String) -> Self {
        Self(ClearTextPassword::for_verification(raw))
    }

    pub fn ensure_not_containing(&self, identifiers: &[&str]) -> AppResult<()> {
        self.0.ensure_not_containing(identifiers).map_err(policy_error)
    }

    /// Reject passwords known to HIBP
    ///
    /// The lookup failing is logged and treated as "not breached".
    pub async fn ensure_not_breached(&self) -> AppResult<()> {
        match self.0.check_breach().await {
            Ok(true) => Err(policy_error(PasswordPolicyError::Compromised)),
            Ok(false) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, "Password breach check unavailable");
                Ok(())
            }
        }
    }

    /// Equalize timing when there is no stored hash to check against
    pub fn dummy_verify(&self) {
        HashedPassword::dummy_verify(&self.0);
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

/// Stored password hash
#[derive(Clone, PartialEq, Eq)]
pub struct UserPassword(HashedPassword);

impl UserPassword {
    pub fn from_raw(raw: &RawPassword, pepper: Option<&[u8]>) -> AppResult<Self> {
        raw.0.hash(pepper).map(Self).map_err(|e| {
            AppError::internal("Password hashing failed").with_source(e)
        })
    }

    pub fn from_phc_string(phc_string: impl Into<String>) -> AppResult<Self> {
        HashedPassword::from_phc_string(phc_string)
            .map(Self)
            .map_err(|e: PasswordHashError| {
                AppError::internal("Invalid password hash in database").with_source(e)
            })
    }

    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    pub fn verify(&self, raw: &RawPassword, pepper: Option<&[u8]>) -> bool {
        self.0.verify(&raw.0, pepper)
    }

    pub fn needs_rehash(&self) -> bool {
        self.0.needs_rehash()
    }
}

impl fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserPassword([HASH])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::ErrorKind;
    use platform::password::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};

    #[test]
    fn test_policy_maps_to_bad_request() {
        let short = "a1".repeat(MIN_PASSWORD_LENGTH / 2 - 1);
        let err = RawPassword::new(short).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert!(err.action().is_some());

        assert!(RawPassword::new("x".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
        assert!(RawPassword::new("password123".to_string()).is_err());
        assert!(RawPassword::new(String::new()).is_err());
    }

    #[test]
    fn test_verification_skips_policy() {
        let raw = RawPassword::for_verification("short".to_string());
        assert!(format!("{raw:?}").contains("REDACTED"));
    }

    #[test]
    fn test_identity_containment() {
        let raw = RawPassword::new("my-alicewonder-pass".to_string()).unwrap();
        assert!(raw.ensure_not_containing(&["AliceWonder"]).is_err());
        assert!(raw.ensure_not_containing(&["bob", "carol@example.com"]).is_ok());
    }

    #[test]
    fn test_hash_verify_with_pepper() {
        let raw = RawPassword::new("Correct-Horse-7".to_string()).unwrap();
        let pepper = b"pepper-value";
        let hashed = UserPassword::from_raw(&raw, Some(pepper)).unwrap();

        assert!(hashed.verify(&raw, Some(pepper)));
        assert!(!hashed.verify(&raw, None));

        let restored = UserPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(restored.verify(&raw, Some(pepper)));
        assert!(!restored.needs_rehash());

        let wrong = RawPassword::for_verification("Wrong-Horse-7".to_string());
        assert!(!hashed.verify(&wrong, Some(pepper)));
    }

    #[test]
    fn test_bad_phc_string() {
        let err = UserPassword::from_phc_string("not-a-hash").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalServerError);
    }
}
