use chrono::{DateTime, Utc};
use newsmap_core::{
    cache::SitemapCache,
    config::Config,
    error::NewsmapError,
    schedule::{ScheduleState, ScheduleStore},
    source::SqliteContentSource,
};
use std::path::Path;

use crate::output::{print_fields, print_json};

const SCHEDULE_IN_USE: &str = "schedule database is in use (is `newsmap serve` running?)";

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let cache = SitemapCache::new(config.cache_path(root));
    let last_modified = cache.last_modified()?;
    // A running server holds redb's exclusive lock; report the cache alone then.
    let schedule = match ScheduleStore::open(&config.schedule_db_path(root)) {
        Ok(store) => Some(store.load()?),
        Err(NewsmapError::ScheduleDb(e)) => {
            tracing::debug!(error = %e, "schedule database unavailable");
            None
        }
        Err(e) => return Err(e.into()),
    };
    let newest_article = match SqliteContentSource::open(&config.database_path(root)) {
        Ok(source) => source.latest_published()?,
        Err(_) => None,
    };

    if json {
        let state = schedule.clone().unwrap_or_default();
        return print_json(&serde_json::json!({
            "publisher": config.publisher,
            "cache_path": cache.path(),
            "cache_last_modified": last_modified,
            "schedule_available": schedule.is_some(),
            "next_run": state.next_run,
            "last_success": state.last_success,
            "last_articles": state.last_articles,
            "last_error": state.last_error,
            "newest_article": newest_article,
        }));
    }

    let fmt = |at: Option<DateTime<Utc>>| {
        at.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string())
    };
    let mut fields = vec![
        ("Publisher", config.publisher.name.clone()),
        ("Sitemap", cache.path().display().to_string()),
        ("Last updated", fmt(last_modified)),
        ("Newest article", fmt(newest_article)),
    ];
    match &schedule {
        Some(state) => push_schedule(&mut fields, state, fmt),
        None => fields.push(("Schedule", SCHEDULE_IN_USE.to_string())),
    }
    print_fields(&fields);
    Ok(())
}

fn push_schedule(
    fields: &mut Vec<(&str, String)>,
    state: &ScheduleState,
    fmt: impl Fn(Option<DateTime<Utc>>) -> String,
) {
    fields.push((
        "Next run",
        state
            .next_run
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "not scheduled".to_string()),
    ));
    fields.push(("Last success", fmt(state.last_success)));
    if let Some(n) = state.last_articles {
        fields.push(("Articles", n.to_string()));
    }
    if let Some(err) = &state.last_error {
        fields.push(("Last error", err.clone()));
    }
}
