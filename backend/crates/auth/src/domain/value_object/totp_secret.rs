//! TOTP Secret Value Object
//!
//! RFC 6238 with authenticator-app defaults: SHA-1, 6 digits, 30 s step,
//! one step of skew in each direction.

use kernel::error::app_error::{AppError, AppResult};
use totp_rs::{Algorithm, Secret, TOTP};

const TOTP_DIGITS: usize = 6;
const TOTP_SKEW: u8 = 1;
const TOTP_STEP: u64 = 30;

/// Base32-encoded shared secret
#[derive(Clone, PartialEq, Eq)]
pub struct TotpSecret(String);

/// Everything an authenticator app needs to enroll
#[derive(Debug, Clone)]
pub struct TotpEnrollment {
    pub secret: String,
    pub otpauth_url: String,
    /// PNG, base64-encoded
    pub qr_code_base64: String,
}

impl TotpSecret {
    pub fn generate() -> Self {
        Self(Secret::generate_secret().to_encoded().to_string())
    }

    pub fn from_base32(secret: impl Into<String>) -> AppResult<Self> {
        let secret = secret.into();
        Secret::Encoded(secret.clone())
            .to_bytes()
            .map_err(|e| AppError::internal(format!("Invalid TOTP secret: {e:?}")))?;
        Ok(Self(secret))
    }

    pub fn as_base32(&self) -> &str {
        &self.0
    }

    fn totp(&self, issuer: &str, account_name: &str) -> AppResult<TOTP> {
        let bytes = Secret::Encoded(self.0.clone())
            .to_bytes()
            .map_err(|e| AppError::internal(format!("Invalid TOTP secret: {e:?}")))?;

        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            bytes,
            Some(issuer.to_string()),
            account_name.to_string(),
        )
        .map_err(|e| AppError::internal(format!("Failed to create TOTP: {e}")))
    }

    /// Check a user-supplied code against the current time window
    pub fn verify(&self, code: &str, issuer: &str, account_name: &str) -> AppResult<bool> {
        let code = code.trim();
        if code.len() != TOTP_DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(false);
        }
        let totp = self.totp(issuer, account_name)?;
        Ok(totp.check_current(code).unwrap_or(false))
    }

    pub fn enrollment(&self, issuer: &str, account_name: &str) -> AppResult<TotpEnrollment> {
        let totp = self.totp(issuer, account_name)?;
        let qr_code_base64 = totp
            .get_qr_base64()
            .map_err(|e| AppError::internal(format!("Failed to render QR code: {e}")))?;

        Ok(TotpEnrollment {
            secret: self.0.clone(),
            otpauth_url: totp.get_url(),
            qr_code_base64,
        })
    }

    #[cfg(test)]
    pub fn current_code(&self, issuer: &str, account_name: &str) -> String {
        self.totp(issuer, account_name)
            .and_then(|t| {
                t.generate_current()
                    .map_err(|e| AppError::internal(e.to_string()))
            })
            .unwrap()
    }
}

impl std::fmt::Debug for TotpSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TotpSecret([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "Test";

    #[test]
    fn test_verify_current_code() {
        let secret = TotpSecret::generate();
        let code = secret.current_code(ISSUER, "alice");
        assert!(secret.verify(&code, ISSUER, "alice").unwrap());
        assert!(secret.verify(&format!(" {code} "), ISSUER, "alice").unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed() {
        let secret = TotpSecret::generate();
        assert!(!secret.verify("12345", ISSUER, "alice").unwrap());
        assert!(!secret.verify("abcdef", ISSUER, "alice").unwrap());
    }

    #[test]
    fn test_from_base32_roundtrip() {
        let secret = TotpSecret::generate();
        let restored = TotpSecret::from_base32(secret.as_base32()).unwrap();
        assert_eq!(secret, restored);
        assert!(TotpSecret::from_base32("not base32 !!").is_err());
    }

    #[test]
    fn test_enrollment() {
        let secret = TotpSecret::generate();
        let enrollment = secret.enrollment(ISSUER, "alice").unwrap();
        assert!(enrollment.otpauth_url.starts_with("otpauth://totp/"));
        assert!(!enrollment.qr_code_base64.is_empty());
        assert_eq!(enrollment.secret, secret.as_base32());
    }

    #[test]
    fn test_debug_redacted() {
        let secret = TotpSecret::generate();
        assert!(!format!("{secret:?}").contains(secret.as_base32()));
    }
}
