//! Media Types
//!
//! Uploaded images are identified by their leading bytes; the client's
//! `Content-Type` and file name are ignored.

use derive_more::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    #[display("avatar")]
    Avatar,
    #[display("banner")]
    Banner,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Avatar, MediaKind::Banner];

    /// Directory under the media root
    pub const fn dir(&self) -> &'static str {
        match self {
            Self::Avatar => "avatars",
            Self::Banner => "banners",
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    #[display("png")]
    Png,
    #[display("jpeg")]
    Jpeg,
    #[display("gif")]
    Gif,
    #[display("webp")]
    WebP,
}

impl ImageFormat {
    /// Sniff the format from the file signature
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
        const JPEG: &[u8] = b"\xff\xd8\xff";

        if bytes.starts_with(PNG) {
            Some(Self::Png)
        } else if bytes.starts_with(JPEG) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::WebP)
        } else {
            None
        }
    }

    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }

    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_signatures() {
        assert_eq!(
            ImageFormat::detect(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::detect(b"\xff\xd8\xff\xe0\0\x10JFIF"),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::detect(b"GIF89a\x01\0"), Some(ImageFormat::Gif));
        assert_eq!(
            ImageFormat::detect(b"RIFF\x24\0\0\0WEBPVP8 "),
            Some(ImageFormat::WebP)
        );
    }

    #[test]
    fn test_rejects_other_content() {
        assert_eq!(ImageFormat::detect(b""), None);
        assert_eq!(ImageFormat::detect(b"<svg xmlns="), None);
        assert_eq!(ImageFormat::detect(b"RIFF\0\0\0\0WAVE"), None);
        assert_eq!(ImageFormat::detect(b"%PDF-1.7"), None);
    }

    #[test]
    fn test_kind_dirs() {
        assert_eq!(MediaKind::Avatar.dir(), "avatars");
        assert_eq!(MediaKind::Banner.dir(), "banners");
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
    }
}
