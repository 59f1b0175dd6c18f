//! Application Configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::media::MediaKind;

#[derive(Debug, Clone)]
pub struct ProfileConfig {
    /// Root directory for uploaded images
    pub media_dir: PathBuf,
    /// Public URL prefix the media root is served under
    pub media_base_url: String,
    pub avatar_max_bytes: usize,
    pub banner_max_bytes: usize,
    /// Unreferenced files younger than this are left alone by the sweep
    pub orphan_grace: Duration,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("media"),
            media_base_url: "/media".to_string(),
            avatar_max_bytes: 2 * 1024 * 1024,
            banner_max_bytes: 5 * 1024 * 1024,
            orphan_grace: Duration::from_secs(3600),
        }
    }
}

impl ProfileConfig {
    /// Media under the system temp dir, served from the local API
    pub fn development() -> Self {
        Self {
            media_dir: std::env::temp_dir().join("circle-media"),
            media_base_url: "http://localhost:31113/media".to_string(),
            ..Default::default()
        }
    }

    pub fn max_bytes(&self, kind: MediaKind) -> usize {
        match kind {
            MediaKind::Avatar => self.avatar_max_bytes,
            MediaKind::Banner => self.banner_max_bytes,
        }
    }

    /// Largest request body an upload route has to accept
    pub fn upload_body_limit(&self) -> usize {
        // multipart framing on top of the file itself
        self.avatar_max_bytes.max(self.banner_max_bytes) + 64 * 1024
    }

    pub fn media_url(&self, key: &str) -> String {
        format!("{}/{}", self.media_base_url.trim_end_matches('/'), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        let config = ProfileConfig::default();
        assert_eq!(config.max_bytes(MediaKind::Avatar), 2 * 1024 * 1024);
        assert_eq!(config.max_bytes(MediaKind::Banner), 5 * 1024 * 1024);
        assert!(config.upload_body_limit() > config.banner_max_bytes);
    }

    #[test]
    fn test_media_url() {
        let config = ProfileConfig {
            media_base_url: "https://api.example.com/media/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.media_url("avatars/a.png"),
            "https://api.example.com/media/avatars/a.png"
        );
    }
}
