//! Single-flight rebuild scheduling.
//!
//! States: `Idle -> Building -> Idle`. A trigger that arrives while a build is
//! running is queued; every further trigger is coalesced into that queued
//! run. The task that started the flight drains the queue before going idle,
//! so builds never overlap and at most one extra run is owed at any time.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use newsmap_core::error::NewsmapError;
use newsmap_core::pipeline::{BuildReport, SitemapPipeline};
use newsmap_core::schedule::{ScheduleState, ScheduleStore};
use serde::Serialize;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Building,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// This trigger drove the build; carries the result of the last run.
    Ran(Result<BuildReport, String>),
    /// A build was in flight; one follow-up run is now scheduled.
    Queued,
    /// A follow-up run was already queued; this trigger folded into it.
    Coalesced,
}

impl TriggerOutcome {
    /// Short label used in admin redirects.
    pub fn label(&self) -> &'static str {
        match self {
            TriggerOutcome::Ran(Ok(_)) => "complete",
            TriggerOutcome::Ran(Err(_)) => "failed",
            TriggerOutcome::Queued | TriggerOutcome::Coalesced => "queued",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub phase: Phase,
    pub queued: bool,
    pub schedule: ScheduleState,
}

#[derive(Debug, Default)]
struct Flight {
    building: bool,
    queued: bool,
}

#[derive(Debug)]
struct Inner {
    pipeline: Arc<SitemapPipeline>,
    store: Arc<ScheduleStore>,
    interval: Duration,
    flight: Mutex<Flight>,
}

impl Inner {
    fn flight(&self) -> MutexGuard<'_, Flight> {
        // Flight holds two flags; a poisoned guard is still consistent.
        self.flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run builds until no follow-up is queued, then return to Idle.
    async fn drain(self: Arc<Self>) -> Result<BuildReport, String> {
        loop {
            let result = self.clone().run_once().await;
            let mut flight = self.flight();
            if flight.queued {
                flight.queued = false;
                continue;
            }
            flight.building = false;
            return result;
        }
    }

    async fn run_once(self: Arc<Self>) -> Result<BuildReport, String> {
        let inner = self.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let result = inner.pipeline.rebuild(Utc::now());
            inner.record(&result);
            result.map_err(|e| e.to_string())
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "sitemap build task aborted");
                let msg = format!("build task aborted: {e}");
                if let Err(err) = self.store.record_failure(&msg) {
                    tracing::warn!(error = %err, "failed to record build failure");
                }
                Err(msg)
            }
        }
    }

    fn record(&self, result: &newsmap_core::Result<BuildReport>) {
        let recorded = match result {
            Ok(report) => self.store.record_success(report.built_at, report.articles),
            Err(e) => {
                if matches!(e, NewsmapError::Write { .. }) {
                    tracing::error!(
                        error = %e,
                        "sitemap cache could not be written; the previous sitemap \
                         (or a 404 if there is none) keeps being served"
                    );
                } else if e.is_build_failure() {
                    tracing::error!(error = %e, "sitemap rebuild failed");
                } else {
                    tracing::error!(error = %e, "sitemap rebuild hit an unexpected error");
                }
                self.store.record_failure(&e.to_string())
            }
        };
        if let Err(e) = recorded {
            tracing::warn!(error = %e, "failed to record build outcome");
        }
    }
}

/// Owns the rebuild pipeline and guarantees builds never overlap.
#[derive(Debug, Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(pipeline: Arc<SitemapPipeline>, store: Arc<ScheduleStore>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                pipeline,
                store,
                interval,
                flight: Mutex::new(Flight::default()),
            }),
        }
    }

    /// Request a rebuild now.
    ///
    /// When idle, the build runs on a detached task and this call waits for
    /// it, so a caller that goes away does not leave the scheduler stuck in
    /// `Building`.
    pub async fn trigger_now(&self) -> TriggerOutcome {
        {
            let mut flight = self.inner.flight();
            if flight.building {
                if flight.queued {
                    return TriggerOutcome::Coalesced;
                }
                flight.queued = true;
                return TriggerOutcome::Queued;
            }
            flight.building = true;
        }

        let handle = tokio::spawn(self.inner.clone().drain());
        match handle.await {
            Ok(result) => TriggerOutcome::Ran(result),
            Err(e) => {
                let mut flight = self.inner.flight();
                flight.building = false;
                flight.queued = false;
                TriggerOutcome::Ran(Err(format!("build task aborted: {e}")))
            }
        }
    }

    /// Spawn the periodic rebuild task.
    ///
    /// On start the persisted marker decides the first run: a missing marker,
    /// or one already in the past, means a run was missed and it happens
    /// immediately. After every run the next one is stored as
    /// `now + interval`.
    pub fn register_hourly(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            let mut next = this.first_run(Utc::now());
            loop {
                let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }

                match this.trigger_now().await {
                    TriggerOutcome::Ran(Ok(report)) => {
                        tracing::debug!(articles = report.articles, "scheduled rebuild finished")
                    }
                    TriggerOutcome::Ran(Err(_)) => {
                        tracing::warn!("scheduled rebuild failed; retrying at the next interval")
                    }
                    other => tracing::debug!(outcome = other.label(), "scheduled rebuild deferred"),
                }

                next = Utc::now() + chrono::Duration::from_std(this.inner.interval)
                    .unwrap_or_else(|_| chrono::Duration::hours(1));
                if let Err(e) = this.inner.store.set_next_run(next) {
                    tracing::warn!(error = %e, "failed to persist next run time");
                }
            }
        })
    }

    fn first_run(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.inner.store.load() {
            Ok(state) if !state.is_due(now) => {
                let next = state.next_run.unwrap_or(now);
                tracing::info!(next_run = %next, "resuming sitemap schedule");
                next
            }
            Ok(state) => {
                if state.next_run.is_some() {
                    tracing::info!("missed scheduled sitemap rebuild; running now");
                } else {
                    tracing::info!("no sitemap rebuild scheduled; running now");
                }
                now
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not read schedule state; running now");
                now
            }
        }
    }

    pub fn phase(&self) -> Phase {
        if self.inner.flight().building {
            Phase::Building
        } else {
            Phase::Idle
        }
    }

    pub fn status(&self) -> newsmap_core::Result<SchedulerStatus> {
        let schedule = self.inner.store.load()?;
        let flight = self.inner.flight();
        Ok(SchedulerStatus {
            phase: if flight.building {
                Phase::Building
            } else {
                Phase::Idle
            },
            queued: flight.queued,
            schedule,
        })
    }
}
