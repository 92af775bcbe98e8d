pub mod auth;
pub mod error;
pub mod routes;
pub mod scheduler;
pub mod state;

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use axum::routing::{get, post};
use axum::{middleware, Router};
use newsmap_core::config::{check_sitemap_route, Config};
use newsmap_core::error::NewsmapError;
use tower_http::trace::TraceLayer;

use crate::routes::admin::ADMIN_PATH;
use crate::state::AppState;

/// Build the axum Router: the sitemap at its configured path plus the
/// token-guarded admin routes. Used by `serve_on()` and integration tests.
///
/// Fails with `NewsmapError::Config` when the configured sitemap path cannot
/// be mounted as a literal route.
pub fn build_router(state: AppState) -> newsmap_core::Result<Router> {
    let sitemap_path = state.config.server.sitemap_path.clone();
    check_sitemap_route(&sitemap_path).map_err(NewsmapError::Config)?;

    let admin = Router::new()
        .route(ADMIN_PATH, get(routes::admin::status_page))
        .route(
            &format!("{ADMIN_PATH}/rebuild"),
            post(routes::admin::rebuild),
        )
        .route(
            &format!("{ADMIN_PATH}/status"),
            get(routes::admin::status_json),
        )
        .route_layer(middleware::from_fn_with_state(
            state.admin_auth(),
            auth::admin_auth,
        ));

    Ok(Router::new()
        // Exact match only; `/logic-google-news.xml/` falls through to 404.
        .route(&sitemap_path, get(routes::sitemap::serve_sitemap))
        .merge(admin)
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Serve on a pre-bound listener until the server stops.
///
/// The hourly schedule is registered separately (see
/// [`scheduler::Scheduler::register_hourly`]) so tests can drive the router
/// without a background task.
pub async fn serve_on(state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let sitemap_path = state.config.server.sitemap_path.clone();
    let app = build_router(state)?;

    tracing::info!("newsmap listening on http://{addr}{sitemap_path}");

    // Peer addresses feed the admin loopback check.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Bind `server.bind:server.port`, start the hourly rebuild task and serve
/// until Ctrl-C.
pub async fn serve(config: Config, root: &Path) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let state = AppState::from_config(config, root)
        .with_context(|| format!("failed to open newsmap state under {}", root.display()))?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let schedule = state.scheduler.register_hourly();
    let result = tokio::select! {
        res = serve_on(state, listener) => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    };
    schedule.abort();
    result
}
