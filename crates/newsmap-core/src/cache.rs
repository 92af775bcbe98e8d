use crate::error::{NewsmapError, Result};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The last successfully written sitemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSitemap {
    pub bytes: Vec<u8>,
    pub last_modified: DateTime<Utc>,
}

/// File-backed store for the rendered sitemap.
///
/// Writes go through a sibling tempfile and a rename, so a concurrent
/// [`read`](SitemapCache::read) sees the old document or the new one, never a
/// mix. There is no versioning: each write replaces the previous document.
#[derive(Debug, Clone)]
pub struct SitemapCache {
    path: PathBuf,
}

impl SitemapCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, doc: &str) -> Result<()> {
        crate::io::atomic_write(&self.path, doc.as_bytes()).map_err(|source| {
            NewsmapError::Write {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Returns `NewsmapError::NotFound` until the first successful write.
    pub fn read(&self) -> Result<CachedSitemap> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(NewsmapError::NotFound),
            Err(e) => return Err(e.into()),
        };
        let last_modified = self.modified_at()?.unwrap_or_else(Utc::now);
        Ok(CachedSitemap {
            bytes,
            last_modified,
        })
    }

    /// Modification time of the cached file, or `None` if nothing is cached.
    pub fn last_modified(&self) -> Result<Option<DateTime<Utc>>> {
        self.modified_at()
    }

    fn modified_at(&self) -> Result<Option<DateTime<Utc>>> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(DateTime::<Utc>::from(meta.modified()?))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{Article, PublisherMetadata};
    use crate::sitemap;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn read_before_write_is_not_found() {
        let dir = TempDir::new().unwrap();
        let cache = SitemapCache::new(dir.path().join("sitemap.xml"));
        assert!(matches!(cache.read(), Err(NewsmapError::NotFound)));
        assert!(cache.last_modified().unwrap().is_none());
    }

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let cache = SitemapCache::new(dir.path().join("uploads/sitemap.xml"));
        cache.write("<urlset/>").unwrap();

        let cached = cache.read().unwrap();
        assert_eq!(cached.bytes, b"<urlset/>");
        assert!(cached.last_modified <= Utc::now());
        assert!(cache.last_modified().unwrap().is_some());
    }

    #[test]
    fn write_overwrites_previous_document() {
        let dir = TempDir::new().unwrap();
        let cache = SitemapCache::new(dir.path().join("sitemap.xml"));
        cache.write("<urlset><url/><url/></urlset>").unwrap();
        cache.write("<urlset/>").unwrap();
        assert_eq!(cache.read().unwrap().bytes, b"<urlset/>");
    }

    #[test]
    fn write_into_unwritable_location_is_write_error() {
        let dir = TempDir::new().unwrap();
        // A regular file where a directory is expected.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let cache = SitemapCache::new(blocker.join("sitemap.xml"));
        let err = cache.write("<urlset/>").unwrap_err();
        assert!(matches!(err, NewsmapError::Write { .. }));
    }

    #[test]
    fn failed_write_keeps_previous_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sitemap.xml");
        let cache = SitemapCache::new(&path);
        cache.write("<urlset/>").unwrap();

        // Turn the target into a directory-shaped obstacle for the next write.
        let broken = SitemapCache::new(path.join("child.xml"));
        assert!(broken.write("<urlset><url/></urlset>").is_err());
        assert_eq!(cache.read().unwrap().bytes, b"<urlset/>");
    }

    #[test]
    fn concurrent_reads_never_see_partial_document() {
        let dir = TempDir::new().unwrap();
        let cache = SitemapCache::new(dir.path().join("sitemap.xml"));
        let publisher = PublisherMetadata::new("Daily Planet");
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();

        let small = sitemap::build(&[], &publisher).unwrap();
        let large_articles: Vec<Article> = (0..500)
            .map(|i| Article::new(format!("https://ex.com/{i}"), format!("Story {i}"), date))
            .collect();
        let large = sitemap::build(&large_articles, &publisher).unwrap();
        cache.write(&small).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let writer = {
            let cache = cache.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                for i in 0..50 {
                    let doc = if i % 2 == 0 { &large } else { &small };
                    cache.write(doc).unwrap();
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        let mut reads = 0;
        while !done.load(Ordering::SeqCst) || reads == 0 {
            let cached = cache.read().unwrap();
            let text = String::from_utf8(cached.bytes).unwrap();
            let entries = sitemap::read_entries(&text).unwrap();
            assert!(entries.is_empty() || entries.len() == 500);
            reads += 1;
        }
        writer.join().unwrap();
    }
}
