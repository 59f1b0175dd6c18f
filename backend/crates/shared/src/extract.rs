//! Request Extractors
//!
//! [`ApiJson`] is `axum::Json` with its rejection rendered as an
//! [`AppError`] problem body instead of axum's plain-text one.

use axum::Json;
use axum::extract::{FromRequest, Request};

use crate::error::app_error::AppError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = axum::extract::rejection::JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::header;
    use serde::Deserialize;

    use super::*;
    use crate::error::kind::ErrorKind;

    #[derive(Debug, Deserialize)]
    struct Greeting {
        name: String,
    }

    fn request(content_type: &str, body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_accepts_json() {
        let ApiJson(greeting) =
            ApiJson::<Greeting>::from_request(request("application/json", r#"{"name":"ada"}"#), &())
                .await
                .unwrap();
        assert_eq!(greeting.name, "ada");
    }

    #[tokio::test]
    async fn test_rejections_become_app_errors() {
        let err = ApiJson::<Greeting>::from_request(request("text/plain", "name=ada"), &())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedMediaType);

        let err = ApiJson::<Greeting>::from_request(request("application/json", "{\"name\":"), &())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);

        let err = ApiJson::<Greeting>::from_request(request("application/json", "{\"age\":3}"), &())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }
}
