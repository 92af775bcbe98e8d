use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use newsmap_core::{
    article::{ContentRecord, ContentStatus},
    config::Config,
    source::SqliteContentSource,
};
use std::path::Path;

use crate::output::{print_json, print_table};

#[derive(Subcommand)]
pub enum ArticleSubcommand {
    /// Add an article to the content database
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        permalink: String,
        /// Publication time as RFC 3339 (default: now)
        #[arg(long)]
        published_at: Option<String>,
        /// draft, published or trashed
        #[arg(long, default_value = "published")]
        status: String,
    },
    /// List every article, newest first
    List,
}

pub fn run(root: &Path, subcmd: ArticleSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root)?;
    let db_path = config.database_path(root);
    let source = SqliteContentSource::open(&db_path)
        .with_context(|| format!("cannot open {} (run `newsmap init` first)", db_path.display()))?;

    match subcmd {
        ArticleSubcommand::Add {
            title,
            permalink,
            published_at,
            status,
        } => add(&source, title, permalink, published_at.as_deref(), &status, json),
        ArticleSubcommand::List => list(&source, json),
    }
}

fn add(
    source: &SqliteContentSource,
    title: String,
    permalink: String,
    published_at: Option<&str>,
    status: &str,
    json: bool,
) -> anyhow::Result<()> {
    let published_at = match published_at {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("invalid --published-at '{s}' (expected RFC 3339)"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let status = ContentStatus::parse(status).with_context(|| {
        format!("unknown status '{status}' (expected draft, published or trashed)")
    })?;

    let record = ContentRecord::article(title, permalink, published_at).with_status(status);
    let id = source.insert(&record)?;

    if json {
        let mut value = serde_json::to_value(&record)?;
        value["id"] = serde_json::json!(id);
        print_json(&value)?;
    } else {
        println!("Added article [{id}]: {} ({})", record.title, record.status);
    }
    Ok(())
}

fn list(source: &SqliteContentSource, json: bool) -> anyhow::Result<()> {
    let records = source.list()?;
    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No articles.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.published_at.format("%Y-%m-%d %H:%M").to_string(),
                r.status.to_string(),
                r.title.clone(),
                r.permalink.clone(),
            ]
        })
        .collect();
    print_table(&["PUBLISHED", "STATUS", "TITLE", "PERMALINK"], &rows);
    Ok(())
}
