//! Vendor-agnostic metrics collection via a pluggable sink.
//!
//! The sync runner reports one [`EntryStats`] per reconciled entry and one
//! [`CycleStats`] per finished cycle. Consumers route them to whatever
//! backend they use by implementing [`MetricsSink`]:
//!
//! ```ignore
//! use consul_acl_sync::metrics::{CycleStats, EntryStats, MetricsSink};
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! struct Counter {
//!     mutations: AtomicU64,
//! }
//!
//! impl MetricsSink for Counter {
//!     fn on_entry(&self, stats: &EntryStats) {
//!         if stats.mutated {
//!             self.mutations.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn on_cycle(&self, _stats: &CycleStats) {}
//! }
//! ```
//!
//! The sink is handed to [`crate::SyncRunner::with_sink`]; without one,
//! [`NoOpSink`] drops everything.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::timers::{Phase, PhaseClock};
use crate::types::{EntryReport, OutcomeKind, SyncReport};

/// Snapshot of one reconciled entry, passed to [`MetricsSink::on_entry`].
#[derive(Debug, Clone, Serialize)]
pub struct EntryStats {
    pub slug: String,
    pub outcome: OutcomeKind,
    /// Whether the cluster was changed.
    pub mutated: bool,
    /// Time spent reconciling this entry, lookup included.
    pub duration: Duration,
}

impl EntryStats {
    pub fn new(report: &EntryReport, duration: Duration) -> Self {
        Self {
            slug: report.slug.clone(),
            outcome: report.outcome.kind(),
            mutated: report.outcome.is_mutation(),
            duration,
        }
    }
}

/// Summary of one completed cycle, passed to [`MetricsSink::on_cycle`].
///
/// Cycles aborted by a fatal error are not reported.
#[derive(Debug, Clone, Serialize)]
pub struct CycleStats {
    pub duration: Duration,
    pub skipped_not_leader: bool,
    pub pages: usize,
    pub entries: usize,
    pub mutations: usize,
    pub outcomes: BTreeMap<OutcomeKind, usize>,
}

impl CycleStats {
    pub fn new(report: &SyncReport, duration: Duration) -> Self {
        Self {
            duration,
            skipped_not_leader: report.skipped_not_leader,
            pages: report.pages,
            entries: report.entries.len(),
            mutations: report.mutations(),
            outcomes: report.summary(),
        }
    }
}

/// Cycle time broken down by phase, in milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct CyclePhases {
    pub list_ms: f64,
    pub parse_ms: f64,
    pub reconcile_ms: f64,
    pub total_ms: f64,
}

impl CyclePhases {
    pub fn from_clock(clock: &PhaseClock, total: Duration) -> Self {
        let ms = |d: Duration| d.as_secs_f64() * 1_000.0;
        Self {
            list_ms: ms(clock.elapsed(Phase::List)),
            parse_ms: ms(clock.elapsed(Phase::Parse)),
            reconcile_ms: ms(clock.elapsed(Phase::Reconcile)),
            total_ms: ms(total),
        }
    }

    /// Time not accounted for in measured phases.
    pub fn overhead_ms(&self) -> f64 {
        self.total_ms - (self.list_ms + self.parse_ms + self.reconcile_ms)
    }
}

/// Consumer of sync metrics.
///
/// Called synchronously from the cycle; implementations should return
/// quickly.
pub trait MetricsSink: Send + Sync {
    fn on_entry(&self, stats: &EntryStats);

    fn on_cycle(&self, stats: &CycleStats);

    /// Called after [`MetricsSink::on_cycle`] with per-phase timings. Default: nothing.
    fn on_cycle_phases(&self, _stats: &CycleStats, _phases: &CyclePhases) {}
}

/// Drops all metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSink;

impl MetricsSink for NoOpSink {
    fn on_entry(&self, _stats: &EntryStats) {}
    fn on_cycle(&self, _stats: &CycleStats) {}
}

/// Logs one summary line per cycle at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn on_entry(&self, _stats: &EntryStats) {}

    fn on_cycle(&self, stats: &CycleStats) {
        let outcomes = serde_json::to_string(&stats.outcomes).unwrap_or_default();
        info!(
            event = "Metrics",
            phase = "Cycle",
            duration_ms = stats.duration.as_millis() as u64,
            skipped_not_leader = stats.skipped_not_leader,
            pages = stats.pages,
            entries = stats.entries,
            mutations = stats.mutations,
            outcomes = outcomes.as_str(),
            "Sync cycle finished"
        );
    }

    fn on_cycle_phases(&self, _stats: &CycleStats, phases: &CyclePhases) {
        info!(
            event = "Metrics",
            phase = "Phases",
            list_ms = phases.list_ms,
            parse_ms = phases.parse_ms,
            reconcile_ms = phases.reconcile_ms,
            overhead_ms = phases.overhead_ms(),
        );
    }
}
