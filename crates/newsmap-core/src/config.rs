use crate::article::PublisherMetadata;
use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(paths::DEFAULT_CACHE_FILE)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// SourceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_database() -> PathBuf {
    PathBuf::from(paths::DEFAULT_CONTENT_DB)
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

// ---------------------------------------------------------------------------
// WindowConfig
// ---------------------------------------------------------------------------

/// How far back the content query reaches. The lower bound is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_days")]
    pub days: u32,
}

fn default_window_days() -> u32 {
    2
}

impl WindowConfig {
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.days))
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            days: default_window_days(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScheduleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    #[serde(default = "default_state_db")]
    pub state_db: PathBuf,
}

fn default_interval_minutes() -> u64 {
    60
}

fn default_state_db() -> PathBuf {
    PathBuf::from(paths::DEFAULT_SCHEDULE_DB)
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            state_db: default_state_db(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_sitemap_path")]
    pub sitemap_path: String,
    /// Shared secret for the admin routes. Without one, only loopback requests
    /// may reach them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<String>,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_sitemap_path() -> String {
    paths::DEFAULT_SITEMAP_ROUTE.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            sitemap_path: default_sitemap_path(),
            admin_token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub publisher: PublisherMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    pub fn new(publisher_name: impl Into<String>) -> Self {
        Self {
            publisher: PublisherMetadata::new(publisher_name),
            ..Self::default()
        }
    }

    /// Load `.newsmap/config.yaml`, falling back to defaults when it is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())?;
        Ok(())
    }

    pub fn cache_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.cache.path)
    }

    pub fn database_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.source.database)
    }

    pub fn schedule_db_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.schedule.state_db)
    }

    /// Public URL of the sitemap, when `site_url` is known.
    pub fn sitemap_url(&self) -> String {
        match &self.site_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), self.server.sitemap_path),
            None => self.server.sitemap_path.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.publisher.name.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "publisher.name is empty; Google News rejects unnamed publications"
                    .to_string(),
            });
        }

        if self.publisher.language.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "publisher.language is empty".to_string(),
            });
        }

        if self.window.days == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "window.days is 0; only articles published this instant will match"
                    .to_string(),
            });
        }

        if self.schedule.interval_minutes == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "schedule.interval_minutes is 0; using 1 minute".to_string(),
            });
        }

        if let Err(message) = check_sitemap_route(&self.server.sitemap_path) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            });
        }

        if let Some(url) = &self.site_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("site_url '{url}' is not an absolute http(s) URL"),
                });
            }
        }

        if matches!(&self.server.admin_token, Some(t) if t.len() < 16) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "server.admin_token is shorter than 16 characters".to_string(),
            });
        }

        warnings
    }
}

/// Check that `route` can be mounted as the sitemap's exact path.
pub fn check_sitemap_route(route: &str) -> std::result::Result<(), String> {
    if !route.starts_with('/') {
        return Err(format!("server.sitemap_path '{route}' must start with '/'"));
    }
    if route.len() > 1 && route.ends_with('/') {
        return Err(format!("server.sitemap_path '{route}' must not end with '/'"));
    }
    if route.starts_with("/admin") {
        return Err(format!(
            "server.sitemap_path '{route}' collides with the admin routes"
        ));
    }
    // Literal segments only: no captures, wildcards or empty segments.
    let literal = route
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '~'));
    if !literal || route.contains("//") {
        return Err(format!(
            "server.sitemap_path '{route}' may only contain letters, digits, '-', '_', '.', '~' and single '/'"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::new("Daily Planet");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.publisher.name, "Daily Planet");
        assert_eq!(parsed.window.days, 2);
        assert_eq!(parsed.schedule.interval_minutes, 60);
        assert_eq!(parsed.server.sitemap_path, "/logic-google-news.xml");
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let cfg: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.publisher.language, "en");
        assert_eq!(cfg.cache.path, PathBuf::from(paths::DEFAULT_CACHE_FILE));
        assert!(cfg.server.admin_token.is_none());
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("Gazette");
        cfg.window.days = 3;
        cfg.server.admin_token = Some("s3cret-s3cret-s3cret".into());
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.publisher.name, "Gazette");
        assert_eq!(loaded.window.days, 3);
        assert_eq!(loaded.server.admin_token.as_deref(), Some("s3cret-s3cret-s3cret"));
    }

    #[test]
    fn paths_resolve_against_root() {
        let cfg = Config::default();
        let root = Path::new("/srv/site");
        assert_eq!(
            cfg.cache_path(root),
            PathBuf::from("/srv/site/.newsmap/logic-google-news-sitemap.xml")
        );
        assert_eq!(cfg.database_path(root), PathBuf::from("/srv/site/.newsmap/content.db"));
    }

    #[test]
    fn sitemap_url_joins_site_url() {
        let mut cfg = Config::default();
        assert_eq!(cfg.sitemap_url(), "/logic-google-news.xml");
        cfg.site_url = Some("https://news.example.com/".into());
        assert_eq!(cfg.sitemap_url(), "https://news.example.com/logic-google-news.xml");
    }

    #[test]
    fn zero_interval_clamps_to_one_minute() {
        let mut cfg = Config::default();
        cfg.schedule.interval_minutes = 0;
        assert_eq!(cfg.schedule.interval(), Duration::from_secs(60));
    }

    #[test]
    fn validate_valid_config_no_warnings() {
        let cfg = Config::new("Daily Planet");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_empty_publisher_is_error() {
        let cfg = Config::new("  ");
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("publisher.name")));
    }

    #[test]
    fn validate_trailing_slash_route() {
        let mut cfg = Config::new("Daily Planet");
        cfg.server.sitemap_path = "/logic-google-news.xml/".into();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("must not end with '/'")));
    }

    #[test]
    fn validate_relative_route() {
        let mut cfg = Config::new("Daily Planet");
        cfg.server.sitemap_path = "news.xml".into();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("must start with '/'")));
    }

    #[test]
    fn route_rejects_capture_syntax() {
        assert!(check_sitemap_route("/{slug}.xml").is_err());
        assert!(check_sitemap_route("/*rest").is_err());
        assert!(check_sitemap_route("/news//sitemap.xml").is_err());
        assert!(check_sitemap_route("/news/google-sitemap_v2.xml").is_ok());
        assert!(check_sitemap_route("/").is_ok());
    }

    #[test]
    fn validate_short_token_warns() {
        let mut cfg = Config::new("Daily Planet");
        cfg.server.admin_token = Some("abc".into());
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("admin_token")));
    }
}
