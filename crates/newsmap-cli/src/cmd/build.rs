use anyhow::Context;
use chrono::Utc;
use newsmap_core::{pipeline::SitemapPipeline, schedule::ScheduleStore};
use std::path::Path;

use crate::output::print_json;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = super::load_checked_config(root)?;
    let pipeline = SitemapPipeline::from_config(&config, root)
        .context("failed to open the content database (run `newsmap init` first)")?;
    let store = ScheduleStore::open(&config.schedule_db_path(root))
        .context("failed to open the schedule database (is `newsmap serve` running?)")?;

    let report = match pipeline.rebuild(Utc::now()) {
        Ok(report) => {
            store.record_success(report.built_at, report.articles)?;
            report
        }
        Err(e) => {
            store.record_failure(&e.to_string())?;
            return Err(e).context("sitemap rebuild failed");
        }
    };

    if json {
        print_json(&serde_json::json!({
            "articles": report.articles,
            "bytes": report.bytes,
            "built_at": report.built_at,
            "path": pipeline.cache().path(),
        }))?;
    } else {
        println!(
            "Wrote {} ({} article{}, {} bytes)",
            pipeline.cache().path().display(),
            report.articles,
            if report.articles == 1 { "" } else { "s" },
            report.bytes
        );
    }
    Ok(())
}
