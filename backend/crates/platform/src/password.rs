//! Password Hashing and Verification
//!
//! NIST SP 800-63B password handling:
//! - NFKC normalisation, 8..=128 code points, no control characters
//! - rejection of trivially guessable passwords and passwords containing the
//!   account's own user name or email local part
//! - Argon2id PHC hashes, optionally peppered with an application secret
//! - optional HIBP k-anonymity breach check (only a SHA-1 prefix leaves the host)

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use sha1::{Digest, Sha1};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::hmac_sha256;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

const HIBP_API_URL: &str = "https://api.pwnedpasswords.com/range/";

/// Identifiers shorter than this are not checked for containment
const MIN_IDENTITY_FRAGMENT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("This password has been compromised in a data breach")]
    Compromised,

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    #[error("Password is too common or follows a predictable pattern")]
    CommonPattern,

    #[error("Password must not contain your user name or email")]
    ContainsIdentity,
}

#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,

    /// Non-fatal; callers log and continue
    #[error("Breach check failed: {0}")]
    BreachCheckFailed(String),
}

// ============================================================================
// Clear Text Password
// ============================================================================

/// Clear text password, zeroised on drop
///
/// Not `Clone`, and `Debug` is redacted.
///
/// ```rust
/// use platform::password::ClearTextPassword;
///
/// let password = ClearTextPassword::new("correct horse battery".to_string())?;
/// let hashed = password.hash(None)?;
/// assert!(hashed.verify(&password, None));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let raw = Zeroizing::new(raw);
        let normalized: String = raw.nfkc().collect();
        let candidate = Self(normalized);

        if candidate.0.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        let char_count = candidate.0.chars().count();
        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }
        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if candidate
            .0
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        if is_common_pattern(&candidate.0) {
            return Err(PasswordPolicyError::CommonPattern);
        }

        Ok(candidate)
    }

    /// Accept any input without policy checks
    ///
    /// For verifying a login attempt: a stored password may predate the
    /// current policy, so sign-in must not reject it on policy grounds.
    pub fn for_verification(raw: String) -> Self {
        let raw = Zeroizing::new(raw);
        Self(raw.nfkc().collect())
    }

    /// Reject passwords containing the given identifiers (case-insensitive)
    pub fn ensure_not_containing(&self, identifiers: &[&str]) -> Result<(), PasswordPolicyError> {
        let lower = Zeroizing::new(self.0.to_lowercase());
        let hit = identifiers
            .iter()
            .map(|id| id.trim().to_lowercase())
            .filter(|id| id.chars().count() >= MIN_IDENTITY_FRAGMENT)
            .any(|id| lower.contains(&id));

        if hit {
            Err(PasswordPolicyError::ContainsIdentity)
        } else {
            Ok(())
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Bytes fed into Argon2: the password itself, or HMAC(pepper, password)
    fn keyed_bytes(&self, pepper: Option<&[u8]>) -> Zeroizing<Vec<u8>> {
        match pepper {
            Some(p) if !p.is_empty() => Zeroizing::new(hmac_sha256(p, self.as_bytes()).to_vec()),
            _ => Zeroizing::new(self.as_bytes().to_vec()),
        }
    }

    /// Hash with Argon2id (OWASP parameters: m=19 MiB, t=2, p=1)
    pub fn hash(&self, pepper: Option<&[u8]>) -> Result<HashedPassword, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(&self.keyed_bytes(pepper), &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }

    /// `Ok(true)` when the password appears in the HIBP corpus
    pub async fn check_breach(&self) -> Result<bool, PasswordHashError> {
        let mut hasher = Sha1::new();
        hasher.update(self.as_bytes());
        let hash_hex = hex_encode_upper(&hasher.finalize());
        let (prefix, suffix) = hash_hex.split_at(5);

        let response = hibp_client()
            .get(format!("{}{}", HIBP_API_URL, prefix))
            .header("Add-Padding", "true")
            .send()
            .await
            .map_err(|e| PasswordHashError::BreachCheckFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PasswordHashError::BreachCheckFailed(format!(
                "API returned status: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PasswordHashError::BreachCheckFailed(e.to_string()))?;

        Ok(breach_listed(&body, suffix))
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

fn hibp_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .user_agent("password-breach-check")
            .build()
            .unwrap_or_default()
    })
}

/// Range response lines are `SUFFIX:COUNT`; padded entries carry count 0
fn breach_listed(body: &str, suffix: &str) -> bool {
    body.lines().any(|line| {
        line.split_once(':').is_some_and(|(candidate, count)| {
            candidate.eq_ignore_ascii_case(suffix) && count.trim() != "0"
        })
    })
}

// ============================================================================
// Hashed Password
// ============================================================================

/// Argon2id hash in PHC string format (safe to store)
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// `pepper` must match the one used when hashing
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(&password.keyed_bytes(pepper), &parsed_hash)
            .is_ok()
    }

    /// Burn the same time as a real verification
    ///
    /// Called when the account does not exist so response timing does not
    /// reveal which identifiers are registered.
    pub fn dummy_verify(password: &ClearTextPassword) {
        static DUMMY: OnceLock<Option<HashedPassword>> = OnceLock::new();
        let dummy = DUMMY.get_or_init(|| {
            ClearTextPassword::for_verification("dummy-password-for-timing".to_string())
                .hash(None)
                .ok()
        });
        if let Some(hash) = dummy {
            let _ = hash.verify(password, None);
        }
    }

    /// True when the stored hash is not Argon2id with current parameters
    pub fn needs_rehash(&self) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.hash) else {
            return true;
        };
        if parsed_hash.algorithm != argon2::Algorithm::Argon2id.ident() {
            return true;
        }

        let defaults = argon2::Params::default();
        match argon2::Params::try_from(&parsed_hash) {
            Ok(params) => {
                params.m_cost() < defaults.m_cost() || params.t_cost() < defaults.t_cost()
            }
            Err(_) => true,
        }
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn is_common_pattern(password: &str) -> bool {
    let lower = Zeroizing::new(password.to_lowercase());
    let chars: Vec<char> = lower.chars().collect();

    // single repeated character ("aaaaaaaa")
    if chars.iter().all(|&c| c == chars[0]) {
        return true;
    }

    if is_sequential_numbers(&lower) {
        return true;
    }

    const KEYBOARD_PATTERNS: &[&str] = &["qwerty", "asdfgh", "zxcvbn", "qazwsx", "1qaz2wsx"];
    if KEYBOARD_PATTERNS.iter().any(|p| lower.contains(p)) {
        return true;
    }

    const COMMON_PASSWORDS: &[&str] = &[
        "password",
        "password1",
        "password123",
        "passw0rd",
        "abcdefgh",
        "letmein1",
        "welcome1",
        "admin123",
        "iloveyou",
        "sunshine",
        "princess",
        "football",
        "baseball",
        "trustno1",
        "superman",
        "changeme",
    ];
    COMMON_PASSWORDS.contains(&lower.as_str())
}

/// Whole-password digit runs like "12345678" or "98765432"
fn is_sequential_numbers(s: &str) -> bool {
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 4 {
        return false;
    }

    let ascending = digits.windows(2).all(|w| (w[0] + 1) % 10 == w[1]);
    let descending = digits.windows(2).all(|w| (w[1] + 1) % 10 == w[0]);
    ascending || descending
}

fn hex_encode_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}
