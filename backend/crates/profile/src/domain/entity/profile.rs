//! Profile Entity
//!
//! Free-form presentation of an account. A user without a stored row has
//! the empty profile; the row is created on first write.

use chrono::{DateTime, Utc};
use kernel::UserId;

use crate::domain::media::MediaKind;
use crate::error::{ProfileError, ProfileResult};

pub const DISPLAY_NAME_MAX_LENGTH: usize = 50;
pub const BIO_MAX_LENGTH: usize = 300;
pub const LOCATION_MAX_LENGTH: usize = 60;
pub const WEBSITE_MAX_LENGTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    /// Relative to the media root, e.g. `avatars/<uuid>.png`
    pub avatar_key: Option<String>,
    pub banner_key: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: None,
            bio: None,
            location: None,
            website: None,
            avatar_key: None,
            banner_key: None,
            updated_at: Utc::now(),
        }
    }

    pub fn media_key(&self, kind: MediaKind) -> Option<&str> {
        match kind {
            MediaKind::Avatar => self.avatar_key.as_deref(),
            MediaKind::Banner => self.banner_key.as_deref(),
        }
    }

    /// Point `kind` at `key`; returns the key it replaces
    pub fn set_media_key(&mut self, kind: MediaKind, key: Option<String>) -> Option<String> {
        let slot = match kind {
            MediaKind::Avatar => &mut self.avatar_key,
            MediaKind::Banner => &mut self.banner_key,
        };
        self.updated_at = Utc::now();
        std::mem::replace(slot, key)
    }

    /// Apply a validated patch
    pub fn apply(&mut self, patch: ProfilePatch) {
        fn merge(slot: &mut Option<String>, change: Option<Option<String>>) {
            if let Some(value) = change {
                *slot = value;
            }
        }

        merge(&mut self.display_name, patch.display_name);
        merge(&mut self.bio, patch.bio);
        merge(&mut self.location, patch.location);
        merge(&mut self.website, patch.website);
        self.updated_at = Utc::now();
    }
}

/// Partial update of the text fields
///
/// Outer `None` leaves a field alone; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub display_name: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub website: Option<Option<String>>,
}

impl ProfilePatch {
    /// Build from raw input: trims, turns empty strings into "clear", and
    /// enforces the length and URL rules
    pub fn parse(
        display_name: Option<String>,
        bio: Option<String>,
        location: Option<String>,
        website: Option<String>,
    ) -> ProfileResult<Self> {
        let website = normalize("website", website, WEBSITE_MAX_LENGTH)?;
        if let Some(Some(url)) = &website {
            ensure_http_url(url)?;
        }

        Ok(Self {
            display_name: normalize("displayName", display_name, DISPLAY_NAME_MAX_LENGTH)?,
            bio: normalize("bio", bio, BIO_MAX_LENGTH)?,
            location: normalize("location", location, LOCATION_MAX_LENGTH)?,
            website,
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn normalize(
    field: &str,
    value: Option<String>,
    max_chars: usize,
) -> ProfileResult<Option<Option<String>>> {
    let Some(value) = value else {
        return Ok(None);
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(Some(None));
    }
    if trimmed.chars().count() > max_chars {
        return Err(ProfileError::Validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    // newlines are only meaningful in the bio
    if field != "bio" && trimmed.chars().any(char::is_control) {
        return Err(ProfileError::Validation(format!(
            "{field} must be a single line"
        )));
    }

    Ok(Some(Some(trimmed.to_string())))
}

fn ensure_http_url(url: &str) -> ProfileResult<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') && !url.contains(' ') => Ok(()),
        _ => Err(ProfileError::Validation(
            "website must be an http(s) URL".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_trims_and_clears() {
        let patch = ProfilePatch::parse(
            Some("  Alice  ".to_string()),
            Some("".to_string()),
            None,
            Some("   ".to_string()),
        )
        .unwrap();

        assert_eq!(patch.display_name, Some(Some("Alice".to_string())));
        assert_eq!(patch.bio, Some(None));
        assert_eq!(patch.location, None);
        assert_eq!(patch.website, Some(None));
    }

    #[test]
    fn test_length_limits_count_chars() {
        let ok = "é".repeat(DISPLAY_NAME_MAX_LENGTH);
        assert!(ProfilePatch::parse(Some(ok), None, None, None).is_ok());

        let long = "a".repeat(DISPLAY_NAME_MAX_LENGTH + 1);
        assert!(matches!(
            ProfilePatch::parse(Some(long), None, None, None),
            Err(ProfileError::Validation(_))
        ));

        let bio = "b".repeat(BIO_MAX_LENGTH + 1);
        assert!(ProfilePatch::parse(None, Some(bio), None, None).is_err());
    }

    #[test]
    fn test_bio_may_span_lines() {
        assert!(ProfilePatch::parse(None, Some("line one\nline two".to_string()), None, None).is_ok());
        assert!(ProfilePatch::parse(Some("two\nlines".to_string()), None, None, None).is_err());
    }

    #[test]
    fn test_website_must_be_http() {
        for ok in ["https://example.com", "http://example.com/me"] {
            assert!(ProfilePatch::parse(None, None, None, Some(ok.to_string())).is_ok());
        }
        for bad in ["ftp://example.com", "javascript:alert(1)", "https://", "example.com"] {
            assert!(
                ProfilePatch::parse(None, None, None, Some(bad.to_string())).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_apply_leaves_untouched_fields() {
        let mut profile = Profile::empty(UserId::new());
        profile.bio = Some("hello".to_string());

        profile.apply(ProfilePatch {
            display_name: Some(Some("Alice".to_string())),
            ..Default::default()
        });

        assert_eq!(profile.display_name.as_deref(), Some("Alice"));
        assert_eq!(profile.bio.as_deref(), Some("hello"));
    }

    #[test]
    fn test_set_media_key_returns_previous() {
        let mut profile = Profile::empty(UserId::new());
        assert_eq!(
            profile.set_media_key(MediaKind::Avatar, Some("avatars/a.png".to_string())),
            None
        );
        assert_eq!(
            profile.set_media_key(MediaKind::Avatar, Some("avatars/b.png".to_string())),
            Some("avatars/a.png".to_string())
        );
        assert_eq!(profile.media_key(MediaKind::Avatar), Some("avatars/b.png"));
        assert_eq!(profile.media_key(MediaKind::Banner), None);
    }
}
