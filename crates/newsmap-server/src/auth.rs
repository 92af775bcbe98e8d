use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

const COOKIE_NAME: &str = "newsmap_admin";

/// Controls access to the admin routes.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    pub token: Option<String>,
}

impl AdminAuth {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

/// Axum middleware guarding the admin routes.
///
/// Auth flow (evaluated in order):
/// 1. `token` is `None` → only connections from a loopback peer address pass
/// 2. `Authorization: Bearer TOKEN` matches → passthrough
/// 3. Cookie `newsmap_admin` matches token → passthrough
/// 4. Query param `?auth=TOKEN` matches → set session cookie, 302 to same path without param
/// 5. None matched → 401
pub async fn admin_auth(State(auth): State<AdminAuth>, req: Request, next: Next) -> Response {
    let Some(token) = auth.token else {
        if is_loopback(&req) {
            return next.run(req).await;
        }
        return unauthorized("Admin access is limited to localhost until an admin token is configured.");
    };

    if let Some(bearer) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        if bearer.trim() == token {
            return next.run(req).await;
        }
    }

    if let Some(cookies) = req.headers().get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        let prefix = format!("{COOKIE_NAME}=");
        for part in cookies.split(';') {
            if let Some(val) = part.trim().strip_prefix(prefix.as_str()) {
                if val == token {
                    return next.run(req).await;
                }
            }
        }
    }

    // One-time bootstrap via `?auth=TOKEN` — set cookie and redirect.
    let uri = req.uri().clone();
    if let Some(query) = uri.query() {
        if let Some(val) = extract_auth_param(query) {
            if val == token {
                let destination = strip_auth_param(uri.path(), query);
                let cookie = format!("{COOKIE_NAME}={token}; HttpOnly; SameSite=Lax; Path=/admin");
                return Response::builder()
                    .status(302)
                    .header(header::LOCATION, destination)
                    .header(header::SET_COOKIE, cookie)
                    .body(Body::empty())
                    .expect("infallible: all header values are valid ASCII");
            }
        }
    }

    unauthorized("Admin token required.")
}

fn unauthorized(message: &'static str) -> Response {
    Response::builder()
        .status(401)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::WWW_AUTHENTICATE, "Bearer")
        .body(Body::from(message))
        .expect("infallible: all header values are valid ASCII")
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Judged by the TCP peer, never by the client-supplied `Host` header.
/// Requests served without [`ConnectInfo`] are treated as remote.
fn is_loopback(req: &Request) -> bool {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .is_some_and(|ConnectInfo(addr)| addr.ip().to_canonical().is_loopback())
}

fn extract_auth_param(query: &str) -> Option<&str> {
    query.split('&').find_map(|kv| kv.strip_prefix("auth="))
}

fn strip_auth_param(path: &str, query: &str) -> String {
    let remaining: Vec<&str> = query
        .split('&')
        .filter(|kv| !kv.starts_with("auth="))
        .collect();
    if remaining.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, remaining.join("&"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{body::Body, http::Request, middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    fn test_app(auth: AdminAuth) -> Router {
        Router::new()
            .route("/admin/sitemap", get(ok_handler))
            .layer(middleware::from_fn_with_state(auth, admin_auth))
    }

    fn request(host: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("host", host)
            .body(Body::empty())
            .unwrap()
    }

    fn from_peer(mut req: Request<Body>, peer: &str) -> Request<Body> {
        let addr: SocketAddr = peer.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[tokio::test]
    async fn no_token_allows_loopback_peer() {
        let req = from_peer(request("localhost:8080", "/admin/sitemap"), "127.0.0.1:50000");
        let resp = test_app(AdminAuth::new(None)).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn no_token_allows_ipv6_loopback_peer() {
        let req = from_peer(request("news.example.com", "/admin/sitemap"), "[::1]:50000");
        let resp = test_app(AdminAuth::new(None)).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn no_token_allows_ipv4_mapped_loopback_peer() {
        let req = from_peer(
            request("localhost", "/admin/sitemap"),
            "[::ffff:127.0.0.1]:50000",
        );
        let resp = test_app(AdminAuth::new(None)).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn no_token_rejects_remote_peer_claiming_localhost() {
        let req = from_peer(request("localhost", "/admin/sitemap"), "192.0.2.2:50000");
        let resp = test_app(AdminAuth::new(None)).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn no_token_rejects_unknown_peer() {
        let resp = test_app(AdminAuth::new(None))
            .oneshot(request("localhost", "/admin/sitemap"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn empty_token_counts_as_unset() {
        let auth = AdminAuth::new(Some(String::new()));
        assert!(auth.token.is_none());
    }

    #[tokio::test]
    async fn token_required_even_from_loopback_peer() {
        let req = from_peer(request("localhost", "/admin/sitemap"), "127.0.0.1:50000");
        let resp = test_app(AdminAuth::new(Some("secret".into())))
            .oneshot(req)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bearer_token_passes() {
        let req = Request::builder()
            .uri("/admin/sitemap")
            .header("host", "news.example.com")
            .header("authorization", "Bearer secret")
            .body(Body::empty())
            .unwrap();
        let resp = test_app(AdminAuth::new(Some("secret".into())))
            .oneshot(req)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_bearer_token_rejected() {
        let req = Request::builder()
            .uri("/admin/sitemap")
            .header("host", "news.example.com")
            .header("authorization", "Bearer guess")
            .body(Body::empty())
            .unwrap();
        let resp = test_app(AdminAuth::new(Some("secret".into())))
            .oneshot(req)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn cookie_passes() {
        let req = Request::builder()
            .uri("/admin/sitemap")
            .header("host", "news.example.com")
            .header("cookie", "theme=dark; newsmap_admin=secret")
            .body(Body::empty())
            .unwrap();
        let resp = test_app(AdminAuth::new(Some("secret".into())))
            .oneshot(req)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn query_token_sets_cookie_and_redirects() {
        let resp = test_app(AdminAuth::new(Some("secret".into())))
            .oneshot(request(
                "news.example.com",
                "/admin/sitemap?auth=secret&rebuild=1",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get("location").unwrap(),
            "/admin/sitemap?rebuild=1"
        );
        let cookie = resp.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie.starts_with("newsmap_admin=secret"));
    }

    #[test]
    fn strip_auth_param_only_param() {
        assert_eq!(strip_auth_param("/admin/sitemap", "auth=x"), "/admin/sitemap");
    }
}
