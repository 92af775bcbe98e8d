use std::borrow::Cow;

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AppError;
use crate::scheduler::{Phase, SchedulerStatus, TriggerOutcome};
use crate::state::AppState;

pub const ADMIN_PATH: &str = "/admin/sitemap";

#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    #[serde(default)]
    rebuild: Option<String>,
}

/// GET /admin/sitemap — status page. `?rebuild=1` rebuilds first, then
/// redirects back with the outcome.
pub async fn status_page(
    State(app): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Result<Response, AppError> {
    if query.rebuild.as_deref() == Some("1") {
        return Ok(rebuild_and_redirect(&app).await);
    }

    let cache = app.cache.clone();
    let scheduler = app.scheduler.clone();
    let (status, last_modified) = tokio::task::spawn_blocking(move || {
        let status = scheduler.status()?;
        let last_modified = cache.last_modified()?;
        Ok::<_, newsmap_core::NewsmapError>((status, last_modified))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let sitemap_url = app.config.sitemap_url();
    let page = PageContext {
        publisher: &app.config.publisher.name,
        sitemap_url: &sitemap_url,
        status: &status,
        last_modified,
        notice: query.rebuild.as_deref(),
        now: Utc::now(),
    };
    Ok(Html(render_page(&page)).into_response())
}

/// POST /admin/sitemap/rebuild — rebuild synchronously, then redirect.
pub async fn rebuild(State(app): State<AppState>) -> Response {
    rebuild_and_redirect(&app).await
}

/// GET /admin/sitemap/status — scheduler and cache state as JSON.
pub async fn status_json(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let cache = app.cache.clone();
    let scheduler = app.scheduler.clone();
    let result = tokio::task::spawn_blocking(move || {
        let status = scheduler.status()?;
        let last_modified = cache.last_modified()?;
        Ok::<_, newsmap_core::NewsmapError>(serde_json::json!({
            "phase": status.phase,
            "queued": status.queued,
            "next_run": status.schedule.next_run,
            "last_success": status.schedule.last_success,
            "last_articles": status.schedule.last_articles,
            "last_error": status.schedule.last_error,
            "cache_last_modified": last_modified,
        }))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

async fn rebuild_and_redirect(app: &AppState) -> Response {
    let outcome = app.scheduler.trigger_now().await;
    match &outcome {
        TriggerOutcome::Ran(Ok(report)) => {
            tracing::info!(articles = report.articles, "manual sitemap rebuild complete")
        }
        TriggerOutcome::Ran(Err(e)) => tracing::warn!(error = %e, "manual sitemap rebuild failed"),
        _ => tracing::info!("manual sitemap rebuild queued behind a running build"),
    }
    Redirect::to(&format!("{ADMIN_PATH}?rebuild={}", outcome.label())).into_response()
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

struct PageContext<'a> {
    publisher: &'a str,
    sitemap_url: &'a str,
    status: &'a SchedulerStatus,
    last_modified: Option<DateTime<Utc>>,
    notice: Option<&'a str>,
    now: DateTime<Utc>,
}

fn render_page(page: &PageContext<'_>) -> String {
    let next_run = match page.status.schedule.next_run {
        Some(at) => format!("Next run in {}", human_duration(at - page.now)),
        None => "No run scheduled yet".to_string(),
    };
    let last_updated = match page.last_modified {
        Some(at) => at.format("%A %-d %B %Y %H:%M:%S UTC").to_string(),
        None => "never".to_string(),
    };
    let building = if page.status.phase == Phase::Building {
        "<p><strong>A rebuild is in progress.</strong></p>"
    } else {
        ""
    };
    let notice = match page.notice {
        Some("complete") => "<div class=\"notice ok\">Sitemap rebuilt.</div>".to_string(),
        Some("queued") => {
            "<div class=\"notice\">A rebuild was already running; another has been queued.</div>"
                .to_string()
        }
        Some("failed") => format!(
            "<div class=\"notice error\">Rebuild failed: {}</div>",
            escape_html(page.status.schedule.last_error.as_deref().unwrap_or("unknown error"))
        ),
        _ => String::new(),
    };

    format!(
        concat!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\">",
            "<title>Google News Sitemap</title></head>",
            "<body style=\"font-family:sans-serif;padding:2rem;max-width:630px\">",
            "<h1>Google News Sitemap</h1>",
            "<p>{publisher}</p>",
            "{notice}",
            "<h2>Sync Sitemap</h2>",
            "<p>The sitemap is rebuilt on a schedule. Use the button below to rebuild it now.</p>",
            "{building}",
            "<p>{next_run}</p>",
            "<hr>",
            "<form method=\"post\" action=\"{admin}/rebuild\">",
            "<button type=\"submit\">Rebuild News Sitemap</button></form>",
            "<p><a target=\"_blank\" href=\"{sitemap_url}\">View Sitemap</a> ",
            "<span style=\"opacity:.75\">Last Updated: {last_updated}</span></p>",
            "</body></html>"
        ),
        publisher = escape_html(page.publisher),
        notice = notice,
        building = building,
        next_run = next_run,
        admin = ADMIN_PATH,
        sitemap_url = escape_html(page.sitemap_url),
        last_updated = last_updated,
    )
}

/// "42 minutes", "1 hour, 5 minutes", "less than a minute".
fn human_duration(d: chrono::Duration) -> String {
    let secs = d.num_seconds();
    if secs <= 0 {
        return "less than a minute (overdue)".to_string();
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let unit = |n: i64, word: &str| {
        if n == 1 {
            format!("1 {word}")
        } else {
            format!("{n} {word}s")
        }
    };
    match (hours, minutes) {
        (0, 0) => "less than a minute".to_string(),
        (0, m) => unit(m, "minute"),
        (h, 0) => unit(h, "hour"),
        (h, m) => format!("{}, {}", unit(h, "hour"), unit(m, "minute")),
    }
}

fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use newsmap_core::schedule::ScheduleState;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    fn status(next_run: Option<DateTime<Utc>>) -> SchedulerStatus {
        SchedulerStatus {
            phase: Phase::Idle,
            queued: false,
            schedule: ScheduleState {
                next_run,
                last_error: Some("content query failed: <locked>".into()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn human_duration_formats() {
        assert_eq!(human_duration(Duration::seconds(30)), "less than a minute");
        assert_eq!(human_duration(Duration::minutes(1)), "1 minute");
        assert_eq!(human_duration(Duration::minutes(42)), "42 minutes");
        assert_eq!(human_duration(Duration::hours(1)), "1 hour");
        assert_eq!(human_duration(Duration::minutes(125)), "2 hours, 5 minutes");
        assert!(human_duration(Duration::minutes(-3)).contains("overdue"));
    }

    #[test]
    fn page_shows_schedule_and_last_update() {
        let status = status(Some(now() + Duration::minutes(42)));
        let page = PageContext {
            publisher: "Smith & Sons",
            sitemap_url: "https://ex.com/logic-google-news.xml",
            status: &status,
            last_modified: Some(now()),
            notice: None,
            now: now(),
        };
        let html = render_page(&page);
        assert!(html.contains("Next run in 42 minutes"));
        assert!(html.contains("Last Updated: Friday 10 May 2024 12:00:00 UTC"));
        assert!(html.contains("Smith &amp; Sons"));
        assert!(html.contains("href=\"https://ex.com/logic-google-news.xml\""));
        assert!(html.contains("action=\"/admin/sitemap/rebuild\""));
    }

    #[test]
    fn page_without_cache_or_schedule() {
        let status = status(None);
        let page = PageContext {
            publisher: "Daily Planet",
            sitemap_url: "/logic-google-news.xml",
            status: &status,
            last_modified: None,
            notice: None,
            now: now(),
        };
        let html = render_page(&page);
        assert!(html.contains("No run scheduled yet"));
        assert!(html.contains("Last Updated: never"));
    }

    #[test]
    fn failed_notice_escapes_error() {
        let status = status(None);
        let page = PageContext {
            publisher: "Daily Planet",
            sitemap_url: "/logic-google-news.xml",
            status: &status,
            last_modified: None,
            notice: Some("failed"),
            now: now(),
        };
        let html = render_page(&page);
        assert!(html.contains("Rebuild failed: content query failed: &lt;locked&gt;"));
    }
}
