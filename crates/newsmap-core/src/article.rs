use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// Snapshot of a published article taken at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Absolute URL of the article page.
    pub permalink: String,
    pub title: String,
    pub publish_date: NaiveDate,
}

impl Article {
    pub fn new(
        permalink: impl Into<String>,
        title: impl Into<String>,
        publish_date: NaiveDate,
    ) -> Self {
        Self {
            permalink: permalink.into(),
            title: title.into(),
            publish_date,
        }
    }
}

// ---------------------------------------------------------------------------
// PublisherMetadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherMetadata {
    #[serde(default = "default_publisher_name")]
    pub name: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_publisher_name() -> String {
    "My News Site".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

impl PublisherMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: default_language(),
        }
    }
}

impl Default for PublisherMetadata {
    fn default() -> Self {
        Self::new(default_publisher_name())
    }
}

// ---------------------------------------------------------------------------
// ContentRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Published,
    Trashed,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Trashed => "trashed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ContentStatus::Draft),
            "published" => Some(ContentStatus::Published),
            "trashed" => Some(ContentStatus::Trashed),
            _ => None,
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row in the host content repository, before it is narrowed to an [`Article`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub kind: String,
    pub status: ContentStatus,
    pub title: String,
    pub permalink: String,
    pub published_at: DateTime<Utc>,
}

impl ContentRecord {
    pub fn article(
        title: impl Into<String>,
        permalink: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: crate::source::ARTICLE_KIND.to_string(),
            status: ContentStatus::Published,
            title: title.into(),
            permalink: permalink.into(),
            published_at,
        }
    }

    pub fn with_status(mut self, status: ContentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn to_article(&self) -> Article {
        Article {
            permalink: self.permalink.clone(),
            title: self.title.clone(),
            publish_date: self.published_at.date_naive(),
        }
    }
}
