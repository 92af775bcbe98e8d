//! Persistent schedule marker using redb.
//!
//! A single `SCHEDULE` table holds one JSON-encoded [`ScheduleState`] under the
//! key `"state"`. The marker survives restarts: a process that starts and finds
//! no `next_run`, or one already in the past, knows a run was missed.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::error::{NewsmapError, Result};

// ---------------------------------------------------------------------------
// Table definition
// ---------------------------------------------------------------------------

const SCHEDULE: TableDefinition<&str, &[u8]> = TableDefinition::new("schedule");
const STATE_KEY: &str = "state";

fn db_err(e: impl std::fmt::Display) -> NewsmapError {
    NewsmapError::ScheduleDb(e.to_string())
}

// ---------------------------------------------------------------------------
// ScheduleState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    #[serde(default)]
    pub next_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_articles: Option<usize>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl ScheduleState {
    /// True when no run is pending in the future, i.e. a run is owed now.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.next_run {
            Some(next) => next <= now,
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// ScheduleStore
// ---------------------------------------------------------------------------

pub struct ScheduleStore {
    db: Database,
}

impl std::fmt::Debug for ScheduleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleStore").finish_non_exhaustive()
    }
}

impl ScheduleStore {
    /// Open or create the redb database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                crate::io::ensure_dir(parent)?;
            }
        }
        let db = Database::create(path).map_err(db_err)?;
        // Ensure the table exists before any reads
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(SCHEDULE).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }

    pub fn load(&self) -> Result<ScheduleState> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(SCHEDULE).map_err(db_err)?;
        match table.get(STATE_KEY).map_err(db_err)? {
            Some(guard) => Ok(serde_json::from_slice(guard.value())?),
            None => Ok(ScheduleState::default()),
        }
    }

    pub fn set_next_run(&self, next_run: DateTime<Utc>) -> Result<ScheduleState> {
        self.update(|state| state.next_run = Some(next_run))
    }

    pub fn record_success(&self, at: DateTime<Utc>, articles: usize) -> Result<ScheduleState> {
        self.update(|state| {
            state.last_success = Some(at);
            state.last_articles = Some(articles);
            state.last_error = None;
        })
    }

    pub fn record_failure(&self, error: &str) -> Result<ScheduleState> {
        self.update(|state| state.last_error = Some(error.to_string()))
    }

    /// Read-modify-write inside a single write transaction.
    fn update(&self, f: impl FnOnce(&mut ScheduleState)) -> Result<ScheduleState> {
        let wt = self.db.begin_write().map_err(db_err)?;
        let state = {
            let mut table = wt.open_table(SCHEDULE).map_err(db_err)?;
            let mut state: ScheduleState = match table.get(STATE_KEY).map_err(db_err)? {
                Some(guard) => serde_json::from_slice(guard.value())?,
                None => ScheduleState::default(),
            };
            f(&mut state);
            let value = serde_json::to_vec(&state)?;
            table
                .insert(STATE_KEY, value.as_slice())
                .map_err(db_err)?;
            state
        };
        wt.commit().map_err(db_err)?;
        Ok(state)
    }
}
