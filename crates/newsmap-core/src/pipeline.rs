use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::article::PublisherMetadata;
use crate::cache::SitemapCache;
use crate::config::{Config, WindowConfig};
use crate::error::Result;
use crate::sitemap;
use crate::source::{ArticleQuery, ContentSource, SqliteContentSource};

/// Outcome of one successful rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub articles: usize,
    pub bytes: usize,
    pub built_at: DateTime<Utc>,
}

/// fetch → build → write. The cache is only touched once the document is
/// complete, so any failure leaves the previous sitemap in place.
pub struct SitemapPipeline {
    source: Arc<dyn ContentSource>,
    cache: SitemapCache,
    publisher: PublisherMetadata,
    window: WindowConfig,
}

impl std::fmt::Debug for SitemapPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SitemapPipeline")
            .field("cache", &self.cache)
            .field("publisher", &self.publisher)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl SitemapPipeline {
    pub fn new(
        source: Arc<dyn ContentSource>,
        cache: SitemapCache,
        publisher: PublisherMetadata,
        window: WindowConfig,
    ) -> Self {
        Self {
            source,
            cache,
            publisher,
            window,
        }
    }

    /// Wire the pipeline from `config`, using the SQLite content repository.
    pub fn from_config(config: &Config, root: &Path) -> Result<Self> {
        let source = SqliteContentSource::open(&config.database_path(root))?;
        Ok(Self::new(
            Arc::new(source),
            SitemapCache::new(config.cache_path(root)),
            config.publisher.clone(),
            config.window,
        ))
    }

    pub fn cache(&self) -> &SitemapCache {
        &self.cache
    }

    pub fn rebuild(&self, now: DateTime<Utc>) -> Result<BuildReport> {
        let query = ArticleQuery::recent(now, self.window);
        let articles = self.source.fetch(&query)?;
        let doc = sitemap::build(&articles, &self.publisher)?;
        self.cache.write(&doc)?;

        let report = BuildReport {
            articles: articles.len(),
            bytes: doc.len(),
            built_at: now,
        };
        tracing::info!(
            articles = report.articles,
            bytes = report.bytes,
            path = %self.cache.path().display(),
            "sitemap rebuilt"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::ContentRecord;
    use crate::error::NewsmapError;
    use crate::source::StaticContentSource;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    struct FailingSource;

    impl ContentSource for FailingSource {
        fn fetch(&self, _query: &ArticleQuery) -> Result<Vec<crate::article::Article>> {
            Err(NewsmapError::Fetch("database is locked".into()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    fn pipeline(dir: &TempDir, source: Arc<dyn ContentSource>) -> SitemapPipeline {
        SitemapPipeline::new(
            source,
            SitemapCache::new(dir.path().join("sitemap.xml")),
            PublisherMetadata::new("Daily Planet"),
            WindowConfig::default(),
        )
    }

    #[test]
    fn rebuild_writes_filtered_articles() {
        let dir = TempDir::new().unwrap();
        let source = StaticContentSource::new(vec![
            ContentRecord::article("Fresh", "https://ex.com/fresh", now() - Duration::hours(2)),
            ContentRecord::article("Stale", "https://ex.com/stale", now() - Duration::days(3)),
        ]);
        let p = pipeline(&dir, Arc::new(source));

        let report = p.rebuild(now()).unwrap();
        assert_eq!(report.articles, 1);
        assert_eq!(report.built_at, now());

        let cached = p.cache().read().unwrap();
        assert_eq!(cached.bytes.len(), report.bytes);
        let xml = String::from_utf8(cached.bytes).unwrap();
        assert!(xml.contains("https://ex.com/fresh"));
        assert!(!xml.contains("https://ex.com/stale"));
    }

    #[test]
    fn empty_content_still_writes_document() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir, Arc::new(StaticContentSource::default()));
        let report = p.rebuild(now()).unwrap();
        assert_eq!(report.articles, 0);

        let xml = String::from_utf8(p.cache().read().unwrap().bytes).unwrap();
        assert!(xml.contains("<urlset"));
        assert!(!xml.contains("<url>"));
    }

    #[test]
    fn fetch_failure_leaves_cache_untouched() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir, Arc::new(FailingSource));
        p.cache().write("<urlset/>").unwrap();

        let err = p.rebuild(now()).unwrap_err();
        assert!(matches!(err, NewsmapError::Fetch(_)));
        assert_eq!(p.cache().read().unwrap().bytes, b"<urlset/>");
    }

    #[test]
    fn fetch_failure_with_no_cache_stays_not_found() {
        let dir = TempDir::new().unwrap();
        let p = pipeline(&dir, Arc::new(FailingSource));
        assert!(p.rebuild(now()).is_err());
        assert!(matches!(p.cache().read(), Err(NewsmapError::NotFound)));
    }

    #[test]
    fn from_config_requires_content_database() {
        let dir = TempDir::new().unwrap();
        let err = SitemapPipeline::from_config(&Config::default(), dir.path()).unwrap_err();
        assert!(matches!(err, NewsmapError::Fetch(_)));
    }
}
