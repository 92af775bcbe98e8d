//! Content repository access.
//!
//! A [`ContentSource`] answers one question: which published articles fall
//! inside the recent window. The window's lower bound is inclusive, so an
//! article published exactly `window.days` ago is still listed.

use crate::article::{Article, ContentRecord, ContentStatus};
use crate::config::WindowConfig;
use crate::error::{NewsmapError, Result};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

pub const ARTICLE_KIND: &str = "article";

// ---------------------------------------------------------------------------
// ArticleQuery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    pub kind: String,
    pub status: ContentStatus,
    /// Inclusive lower bound on the publication timestamp.
    pub since: DateTime<Utc>,
    /// `None` means unbounded.
    pub limit: Option<usize>,
}

impl ArticleQuery {
    /// Published articles from the last `window.days` days, relative to `now`.
    pub fn recent(now: DateTime<Utc>, window: WindowConfig) -> Self {
        Self {
            kind: ARTICLE_KIND.to_string(),
            status: ContentStatus::Published,
            since: now - window.duration(),
            limit: None,
        }
    }

    pub fn matches(&self, record: &ContentRecord) -> bool {
        record.kind == self.kind && record.status == self.status && record.published_at >= self.since
    }
}

// ---------------------------------------------------------------------------
// ContentSource
// ---------------------------------------------------------------------------

pub trait ContentSource: Send + Sync {
    /// Articles matching `query`, newest first.
    fn fetch(&self, query: &ArticleQuery) -> Result<Vec<Article>>;
}

// ---------------------------------------------------------------------------
// StaticContentSource
// ---------------------------------------------------------------------------

/// In-memory content, filtered with the same semantics as the SQLite source.
#[derive(Debug, Default)]
pub struct StaticContentSource {
    records: Vec<ContentRecord>,
}

impl StaticContentSource {
    pub fn new(records: Vec<ContentRecord>) -> Self {
        Self { records }
    }
}

impl ContentSource for StaticContentSource {
    fn fetch(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        let mut matching: Vec<&ContentRecord> =
            self.records.iter().filter(|r| query.matches(r)).collect();
        // Stable sort keeps insertion order for equal timestamps, newest
        // insertion first to mirror `id DESC` in the SQLite source.
        matching.reverse();
        matching.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .take(limit)
            .map(ContentRecord::to_article)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// SqliteContentSource
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS articles (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    kind         TEXT    NOT NULL DEFAULT 'article',
    status       TEXT    NOT NULL DEFAULT 'published',
    title        TEXT    NOT NULL,
    permalink    TEXT    NOT NULL,
    published_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS articles_recent
    ON articles (kind, status, published_at);
";

/// Content repository stored in SQLite. `published_at` holds unix seconds.
pub struct SqliteContentSource {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteContentSource").finish_non_exhaustive()
    }
}

fn fetch_err(e: rusqlite::Error) -> NewsmapError {
    NewsmapError::Fetch(e.to_string())
}

impl SqliteContentSource {
    /// Open the database at `path`. The file must already exist.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NewsmapError::Fetch(format!(
                "content database not found: {}",
                path.display()
            )));
        }
        let conn = Connection::open(path).map_err(fetch_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open or create the database at `path` and make sure the schema exists.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                crate::io::ensure_dir(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(fetch_err)?;
        let source = Self {
            conn: Mutex::new(conn),
        };
        source.ensure_schema()?;
        Ok(source)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(fetch_err)?;
        let source = Self {
            conn: Mutex::new(conn),
        };
        source.ensure_schema()?;
        Ok(source)
    }

    pub fn ensure_schema(&self) -> Result<()> {
        self.with_conn(|conn| conn.execute_batch(SCHEMA))
    }

    /// Insert a record and return its row id.
    pub fn insert(&self, record: &ContentRecord) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO articles (kind, status, title, permalink, published_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.kind,
                    record.status.as_str(),
                    record.title,
                    record.permalink,
                    record.published_at.timestamp(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Every stored record, newest first.
    pub fn list(&self) -> Result<Vec<ContentRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT kind, status, title, permalink, published_at
                 FROM articles ORDER BY published_at DESC, id DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                let status: String = row.get(1)?;
                let ts: i64 = row.get(4)?;
                Ok(ContentRecord {
                    kind: row.get(0)?,
                    status: ContentStatus::parse(&status).unwrap_or(ContentStatus::Draft),
                    title: row.get(2)?,
                    permalink: row.get(3)?,
                    published_at: from_unix(ts),
                })
            })?;
            rows.collect()
        })
    }

    /// Publication time of the newest published article, if any.
    pub fn latest_published(&self) -> Result<Option<DateTime<Utc>>> {
        self.with_conn(|conn| {
            let ts: Option<i64> = conn
                .query_row(
                    "SELECT MAX(published_at) FROM articles WHERE status = 'published'",
                    [],
                    |row| row.get(0),
                )
                .optional()?
                .flatten();
            Ok(ts.map(from_unix))
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| NewsmapError::Fetch("content database lock poisoned".into()))?;
        f(&conn).map_err(fetch_err)
    }
}

fn from_unix(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_default()
}

impl ContentSource for SqliteContentSource {
    fn fetch(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        // SQLite LIMIT -1 means no limit.
        let limit = query
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT title, permalink, published_at FROM articles
                 WHERE kind = ?1 AND status = ?2 AND published_at >= ?3
                 ORDER BY published_at DESC, id DESC
                 LIMIT ?4",
            )?;
            let rows = stmt.query_map(
                params![
                    query.kind,
                    query.status.as_str(),
                    query.since.timestamp(),
                    limit
                ],
                |row| {
                    let ts: i64 = row.get(2)?;
                    Ok(Article {
                        title: row.get(0)?,
                        permalink: row.get(1)?,
                        publish_date: from_unix(ts).date_naive(),
                    })
                },
            )?;
            rows.collect()
        })
    }
}
