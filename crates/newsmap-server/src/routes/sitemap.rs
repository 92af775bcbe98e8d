use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use newsmap_core::error::NewsmapError;

use crate::state::AppState;

pub const EMPTY_SITEMAP_MESSAGE: &str = "Sitemap contains no articles.";

/// GET <sitemap path> — the cached sitemap, verbatim.
///
/// Only reads the cache; never triggers a build. Read faults are logged and
/// answered with an empty 500.
pub async fn serve_sitemap(State(app): State<AppState>) -> Response {
    let cache = app.cache.clone();
    let read = match tokio::task::spawn_blocking(move || cache.read()).await {
        Ok(read) => read,
        Err(e) => {
            tracing::error!(error = %e, "sitemap read task failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match read {
        Ok(cached) => {
            let last_modified = cached
                .last_modified
                .format("%a, %d %b %Y %H:%M:%S GMT")
                .to_string();
            (
                StatusCode::OK,
                [
                    (header::PRAGMA, "public".to_string()),
                    (header::EXPIRES, "0".to_string()),
                    (header::CACHE_CONTROL, "must-revalidate".to_string()),
                    (header::CONTENT_TYPE, "text/xml".to_string()),
                    (header::LAST_MODIFIED, last_modified),
                ],
                cached.bytes,
            )
                .into_response()
        }
        Err(NewsmapError::NotFound) => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            EMPTY_SITEMAP_MESSAGE,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to read cached sitemap");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
