use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const NEWSMAP_DIR: &str = ".newsmap";
pub const CONFIG_FILE: &str = ".newsmap/config.yaml";

pub const DEFAULT_CACHE_FILE: &str = ".newsmap/logic-google-news-sitemap.xml";
pub const DEFAULT_CONTENT_DB: &str = ".newsmap/content.db";
pub const DEFAULT_SCHEDULE_DB: &str = ".newsmap/schedule.redb";

pub const DEFAULT_SITEMAP_ROUTE: &str = "/logic-google-news.xml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn newsmap_dir(root: &Path) -> PathBuf {
    root.join(NEWSMAP_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Join `rel` onto `root` unless it is already absolute.
pub fn resolve(root: &Path, rel: &Path) -> PathBuf {
    if rel.is_absolute() {
        rel.to_path_buf()
    } else {
        root.join(rel)
    }
}
