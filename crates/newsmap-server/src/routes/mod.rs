pub mod admin;
pub mod sitemap;

use axum::http::StatusCode;

/// Plain 404 for every unrouted path, including near-misses of the sitemap
/// path such as a trailing slash.
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
