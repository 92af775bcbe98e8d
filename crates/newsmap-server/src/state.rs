use std::path::Path;
use std::sync::Arc;

use newsmap_core::cache::SitemapCache;
use newsmap_core::config::Config;
use newsmap_core::pipeline::SitemapPipeline;
use newsmap_core::schedule::ScheduleStore;

use crate::auth::AdminAuth;
use crate::scheduler::Scheduler;

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: SitemapCache,
    pub scheduler: Scheduler,
}

impl AppState {
    pub fn new(config: Config, cache: SitemapCache, scheduler: Scheduler) -> Self {
        Self {
            config: Arc::new(config),
            cache,
            scheduler,
        }
    }

    /// Compose the production wiring: SQLite content, file cache, redb schedule.
    pub fn from_config(config: Config, root: &Path) -> newsmap_core::Result<Self> {
        let pipeline = SitemapPipeline::from_config(&config, root)?;
        let cache = pipeline.cache().clone();
        let store = ScheduleStore::open(&config.schedule_db_path(root))?;
        let scheduler = Scheduler::new(
            Arc::new(pipeline),
            Arc::new(store),
            config.schedule.interval(),
        );
        Ok(Self::new(config, cache, scheduler))
    }

    pub fn admin_auth(&self) -> AdminAuth {
        AdminAuth::new(self.config.server.admin_token.clone())
    }
}
