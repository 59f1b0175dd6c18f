//! Profile Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

pub type ProfileResult<T> = Result<T, ProfileError>;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("User not found")]
    UserNotFound,

    #[error("You cannot follow yourself")]
    CannotFollowSelf,

    #[error("{0}")]
    Validation(String),

    #[error("No file was uploaded")]
    MissingFile,

    #[error("Only PNG, JPEG, GIF and WebP images are accepted")]
    UnsupportedMediaType,

    #[error("The image must be at most {max_bytes} bytes")]
    MediaTooLarge { max_bytes: usize },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Media storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    App(#[from] AppError),
}

impl ProfileError {
    pub fn kind(&self) -> ErrorKind {
        use ProfileError::*;
        match self {
            UserNotFound => ErrorKind::NotFound,
            CannotFollowSelf | Validation(_) | MissingFile => ErrorKind::BadRequest,
            UnsupportedMediaType => ErrorKind::UnsupportedMediaType,
            MediaTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Unauthenticated => ErrorKind::Unauthorized,
            Storage(_) | Database(_) | Internal(_) => ErrorKind::InternalServerError,
            App(e) => e.kind(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn into_app_error(self) -> AppError {
        use ProfileError::*;
        let kind = self.kind();
        match self {
            App(e) => e,
            Database(e) => AppError::from(e),
            Storage(_) | Internal(_) => AppError::new(kind, "Internal server error"),
            MediaTooLarge { max_bytes } => AppError::new(kind, self.to_string())
                .with_action(format!("Upload an image of at most {} KiB", max_bytes / 1024)),
            UnsupportedMediaType => AppError::new(kind, self.to_string())
                .with_action("Convert the image to PNG, JPEG, GIF or WebP"),
            other => AppError::new(kind, other.to_string()),
        }
    }

    fn log(&self) {
        match self {
            ProfileError::Database(e) => tracing::error!(error = %e, "Profile database error"),
            ProfileError::Storage(e) => tracing::error!(error = %e, "Media storage error"),
            ProfileError::Internal(msg) => tracing::error!(message = %msg, "Profile internal error"),
            ProfileError::App(e) if e.is_server_error() => {
                tracing::error!(error = %e, "Profile error")
            }
            _ => tracing::debug!(error = %self, "Profile error"),
        }
    }
}

impl IntoResponse for ProfileError {
    fn into_response(self) -> Response {
        self.log();
        self.into_app_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ProfileError::UserNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ProfileError::CannotFollowSelf.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ProfileError::UnsupportedMediaType.status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ProfileError::MediaTooLarge { max_bytes: 1024 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = ProfileError::Internal("disk layout broken at /srv/media".to_string());
        let app = err.into_app_error();
        assert_eq!(app.kind(), ErrorKind::InternalServerError);
        assert!(!app.message().contains("/srv/media"));
    }
}
