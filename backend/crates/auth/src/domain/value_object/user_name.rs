//! User Name Value Object
//!
//! The user name is the public handle: it appears in profile URLs, is
//! accepted as a sign-in identifier and is unique case-insensitively.
//!
//! Processing order is NFKC, trim, validate, lowercase. The typed form is
//! kept for display; the lowercase canonical form is the uniqueness key.
//!
//! Rules (after normalization):
//! - 3 to 30 characters from `a-z 0-9 _ . - +`
//! - starts and ends with a letter, digit or `_`
//! - no `..`
//! - at least one letter or digit
//! - not a reserved word

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

pub const USER_NAME_MIN_LENGTH: usize = 3;
pub const USER_NAME_MAX_LENGTH: usize = 30;

const ALLOWED_SPECIAL_CHARS: &[char] = &['_', '.', '-', '+'];

/// Names that collide with routes, roles or well-known system accounts
const RESERVED_WORDS: &[&str] = &[
    // roles and system accounts
    "admin", "administrator", "root", "system", "superuser", "moderator", "mod", "staff",
    "support", "help", "official", "verified", "bot", "service",
    // routes
    "api", "auth", "oauth", "callback", "login", "logout", "signin", "signout", "signup",
    "register", "password", "reset", "verify", "confirm", "events", "sessions", "media",
    "users", "user", "account", "accounts", "profile", "profiles", "settings", "follow",
    "followers", "following", "avatar", "banner",
    // ambiguous
    "me", "self", "null", "undefined", "anonymous", "guest", "new", "edit", "delete", "all",
    "none", "true", "false",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserNameError {
    #[error("User name cannot be empty")]
    Empty,

    #[error("User name is too short ({length} chars, minimum {USER_NAME_MIN_LENGTH})")]
    TooShort { length: usize },

    #[error("User name is too long ({length} chars, maximum {USER_NAME_MAX_LENGTH})")]
    TooLong { length: usize },

    #[error("Invalid character '{ch}' at position {position}. Only a-z, 0-9, _, ., -, + are allowed")]
    InvalidCharacter { ch: char, position: usize },

    #[error("User name must start and end with a-z, 0-9 or _")]
    InvalidEdge,

    #[error("User name cannot contain consecutive dots (..)")]
    ConsecutiveDots,

    #[error("User name must contain at least one letter or digit")]
    NoAlphanumeric,

    #[error("'{0}' is a reserved user name")]
    Reserved(String),
}

/// Validated user name
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserName {
    /// As typed (NFKC, trimmed)
    display: String,
    /// Lowercase uniqueness key
    canonical: String,
}

impl UserName {
    pub fn new(input: impl AsRef<str>) -> Result<Self, UserNameError> {
        let display: String = input.as_ref().nfkc().collect::<String>().trim().to_string();
        let canonical = display.to_lowercase();
        validate(&canonical)?;
        Ok(Self { display, canonical })
    }

    /// Rebuild from a stored value without re-running validation
    ///
    /// Rules may tighten over time; existing handles stay usable.
    pub fn from_db(display: impl Into<String>) -> Self {
        let display = display.into();
        let canonical = display.to_lowercase();
        Self { display, canonical }
    }

    /// Canonical form of arbitrary input, for lookups
    pub fn canonicalize(input: &str) -> String {
        input.nfkc().collect::<String>().trim().to_lowercase()
    }

    #[inline]
    pub fn display(&self) -> &str {
        &self.display
    }

    #[inline]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn is_reserved(name: &str) -> bool {
        let canonical = Self::canonicalize(name);
        RESERVED_WORDS.contains(&canonical.as_str())
    }

    /// Derive a valid user name from free text (an OAuth display name or an
    /// email local part)
    ///
    /// Disallowed characters become `_`; a short or reserved result gets a
    /// random numeric suffix. Availability is not checked.
    pub fn suggest(seed: &str) -> Self {
        let mut candidate: String = Self::canonicalize(seed)
            .chars()
            .map(|c| if is_valid_char(c) { c } else { '_' })
            .collect();

        while candidate.contains("..") {
            candidate = candidate.replace("..", ".");
        }
        let mut candidate: String = candidate
            .trim_matches(|c: char| !is_valid_edge_char(c))
            .chars()
            .take(USER_NAME_MAX_LENGTH - 5)
            .collect();
        candidate = candidate
            .trim_end_matches(|c: char| !is_valid_edge_char(c))
            .to_string();

        if !candidate.chars().any(|c| c.is_ascii_alphanumeric()) {
            candidate = "user".to_string();
        }
        if candidate.chars().count() < USER_NAME_MIN_LENGTH
            || RESERVED_WORDS.contains(&candidate.as_str())
        {
            candidate = format!("{candidate}{}", random_suffix());
        }

        Self::new(&candidate).unwrap_or_else(|_| Self::from_db(candidate))
    }

    /// This name with a random four-digit suffix, shortened to fit
    pub fn with_random_suffix(&self) -> Self {
        let base: String = self
            .canonical
            .chars()
            .take(USER_NAME_MAX_LENGTH - 4)
            .collect();
        let candidate = format!("{base}{}", random_suffix());
        Self::new(&candidate).unwrap_or_else(|_| Self::from_db(candidate))
    }
}

fn validate(canonical: &str) -> Result<(), UserNameError> {
    if canonical.is_empty() {
        return Err(UserNameError::Empty);
    }

    let length = canonical.chars().count();
    if length < USER_NAME_MIN_LENGTH {
        return Err(UserNameError::TooShort { length });
    }
    if length > USER_NAME_MAX_LENGTH {
        return Err(UserNameError::TooLong { length });
    }

    if let Some((position, ch)) = canonical.chars().enumerate().find(|(_, c)| !is_valid_char(*c)) {
        return Err(UserNameError::InvalidCharacter { ch, position });
    }

    let first = canonical.chars().next();
    let last = canonical.chars().next_back();
    if !first.is_some_and(is_valid_edge_char) || !last.is_some_and(is_valid_edge_char) {
        return Err(UserNameError::InvalidEdge);
    }

    if canonical.contains("..") {
        return Err(UserNameError::ConsecutiveDots);
    }

    if !canonical.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(UserNameError::NoAlphanumeric);
    }

    if RESERVED_WORDS.contains(&canonical) {
        return Err(UserNameError::Reserved(canonical.to_string()));
    }

    Ok(())
}

fn random_suffix() -> u16 {
    rand::rng().random_range(1000..10000)
}

#[inline]
fn is_valid_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || ALLOWED_SPECIAL_CHARS.contains(&c)
}

#[inline]
fn is_valid_edge_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

impl fmt::Debug for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserName({})", self.display)
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl TryFrom<String> for UserName {
    type Error = UserNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserName> for String {
    fn from(value: UserName) -> Self {
        value.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["alice", "bob_99", "a.b-c+d", "_under_", "abc"] {
            assert!(UserName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_case_preserved_canonical_lowercase() {
        let name = UserName::new("  AliceW ").unwrap();
        assert_eq!(name.display(), "AliceW");
        assert_eq!(name.canonical(), "alicew");
    }

    #[test]
    fn test_nfkc_fullwidth_input() {
        let name = UserName::new("ａｌｉｃｅ").unwrap();
        assert_eq!(name.canonical(), "alice");
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(UserName::new("   "), Err(UserNameError::Empty));
        assert_eq!(UserName::new("ab"), Err(UserNameError::TooShort { length: 2 }));
        assert!(matches!(
            UserName::new("a".repeat(31)),
            Err(UserNameError::TooLong { length: 31 })
        ));
        assert!(matches!(
            UserName::new("al ice"),
            Err(UserNameError::InvalidCharacter { ch: ' ', position: 2 })
        ));
        assert_eq!(UserName::new(".alice"), Err(UserNameError::InvalidEdge));
        assert_eq!(UserName::new("alice-"), Err(UserNameError::InvalidEdge));
        assert_eq!(UserName::new("al..ice"), Err(UserNameError::ConsecutiveDots));
        assert_eq!(UserName::new("___"), Err(UserNameError::NoAlphanumeric));
        assert_eq!(
            UserName::new("Admin"),
            Err(UserNameError::Reserved("admin".to_string()))
        );
    }

    #[test]
    fn test_suggest_from_display_name() {
        let name = UserName::suggest("Jane Doe");
        assert_eq!(name.canonical(), "jane_doe");
    }

    #[test]
    fn test_suggest_pads_short_and_reserved() {
        let short = UserName::suggest("Jo");
        assert!(short.canonical().starts_with("jo"));
        assert_eq!(short.canonical().len(), 6);

        let reserved = UserName::suggest("admin");
        assert!(reserved.canonical().starts_with("admin"));
        assert!(UserName::new(reserved.canonical()).is_ok());
    }

    #[test]
    fn test_suggest_from_symbols_only() {
        let name = UserName::suggest("!!!");
        assert!(name.canonical().starts_with("user"));
        assert!(UserName::new(name.canonical()).is_ok());
    }

    #[test]
    fn test_with_random_suffix_fits() {
        let long = UserName::new("a".repeat(30)).unwrap();
        let suffixed = long.with_random_suffix();
        assert_eq!(suffixed.canonical().len(), 30);
        assert!(suffixed.canonical().starts_with(&"a".repeat(26)));
        assert!(UserName::new(suffixed.canonical()).is_ok());
    }

    #[test]
    fn test_serde_validates() {
        let ok: UserName = serde_json::from_str("\"Carol\"").unwrap();
        assert_eq!(ok.canonical(), "carol");
        assert!(serde_json::from_str::<UserName>("\"x\"").is_err());
    }
}
