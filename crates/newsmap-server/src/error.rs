use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use newsmap_core::error::NewsmapError;

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<NewsmapError>() {
            match e {
                NewsmapError::NotFound => StatusCode::NOT_FOUND,
                NewsmapError::Config(_) => StatusCode::BAD_REQUEST,
                NewsmapError::Fetch(_) => StatusCode::BAD_GATEWAY,
                NewsmapError::Build(_)
                | NewsmapError::Write { .. }
                | NewsmapError::ScheduleDb(_)
                | NewsmapError::Io(_)
                | NewsmapError::Yaml(_)
                | NewsmapError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn not_found_maps_to_404() {
        let response = AppError(NewsmapError::NotFound.into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn fetch_error_maps_to_502() {
        let response = AppError(NewsmapError::Fetch("refused".into()).into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn write_error_maps_to_500() {
        let err = NewsmapError::Write {
            path: "/nope/sitemap.xml".into(),
            source: std::io::Error::other("read-only file system"),
        };
        let response = AppError(err.into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn config_error_maps_to_400() {
        let response = AppError(NewsmapError::Config("bad".into()).into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn foreign_error_maps_to_500() {
        let response = AppError(anyhow::anyhow!("something unexpected")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_body_is_json() {
        let response = AppError(NewsmapError::NotFound.into()).into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
