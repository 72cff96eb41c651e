//! One full pass over the definition prefix, and the recurring loop around it.

use std::convert::Infallible;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::engine::Reconciler;
use crate::error::SyncError;
use crate::metrics::{CyclePhases, CycleStats, EntryStats, MetricsSink, NoOpSink};
use crate::parser::{EntryParser, ensure_trailing_slash};
use crate::reader::DefinitionPages;
use crate::timers::{Phase, PhaseClock};
use crate::traits::{AclBackend, ParameterStore};
use crate::types::{EntryReport, PutOptions, SyncReport};

/// Where definitions live and how a cycle reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub definition_prefix: String,
    /// Empty puts index entries directly under the store root.
    pub id_prefix: String,
    pub page_size: Option<usize>,
    /// Skip the cycle unless the connected agent is the cluster leader.
    pub require_leader: bool,
}

impl SyncOptions {
    pub fn new(definition_prefix: impl Into<String>, id_prefix: impl Into<String>) -> Self {
        Self {
            definition_prefix: definition_prefix.into(),
            id_prefix: id_prefix.into(),
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_leader_check(mut self, require_leader: bool) -> Self {
        self.require_leader = require_leader;
        self
    }
}

/// Drives parse and reconcile over every definition in the store.
pub struct SyncRunner<'a, B: ?Sized, S: ?Sized> {
    backend: &'a B,
    store: &'a S,
    put_options: PutOptions,
    sink: Arc<dyn MetricsSink>,
}

impl<'a, B, S> SyncRunner<'a, B, S>
where
    B: AclBackend + ?Sized,
    S: ParameterStore + ?Sized,
{
    /// `put_options` apply to id-index writes.
    pub fn new(backend: &'a B, store: &'a S, put_options: PutOptions) -> Self {
        Self {
            backend,
            store,
            put_options,
            sink: Arc::new(NoOpSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run one cycle.
    ///
    /// Stops at the first fatal error; entries already reconciled stay
    /// reconciled.
    pub fn run_cycle(&self, options: &SyncOptions) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let definition_prefix = ensure_trailing_slash(&options.definition_prefix);
        if definition_prefix.is_empty() {
            return Err(SyncError::MissingDefinitionPrefix);
        }
        let id_prefix = ensure_trailing_slash(&options.id_prefix);

        if options.require_leader {
            let leader = self.backend.is_leader().map_err(SyncError::LeaderCheck)?;
            if !leader {
                info!(
                    event = "Sync",
                    phase = "LeaderCheck",
                    "Skipping ACL sync, this agent is not the cluster leader"
                );
                let report = SyncReport::not_leader();
                self.sink
                    .on_cycle(&CycleStats::new(&report, started.elapsed()));
                return Ok(report);
            }
        }

        info!(
            event = "Sync",
            phase = "Start",
            prefix = definition_prefix.as_str(),
            id_prefix = id_prefix.as_str(),
            "Synchronizing ACLs from {definition_prefix}"
        );

        let clock = PhaseClock::new();
        let parser = EntryParser::new(self.store, &definition_prefix, &id_prefix);
        let engine = Reconciler::new(
            self.backend,
            self.store,
            &id_prefix,
            self.put_options.clone(),
        );
        let mut pages = DefinitionPages::new(self.store, definition_prefix.as_str(), options.page_size);
        let mut report = SyncReport::default();

        loop {
            let next = {
                let _timer = clock.start(Phase::List);
                pages.next()
            };
            let Some(record) = next else { break };
            let record = record.map_err(|source| SyncError::List {
                prefix: definition_prefix.clone(),
                source,
            })?;

            let entry = {
                let _timer = clock.start(Phase::Parse);
                parser.parse(&record)?
            };

            let entry_started = Instant::now();
            let outcome = {
                let _timer = clock.start(Phase::Reconcile);
                engine.reconcile(&entry)?
            };
            debug!(
                event = "Sync",
                phase = "Entry",
                slug = entry.slug.as_str(),
                outcome = %outcome
            );

            let entry_report = EntryReport::new(&entry, outcome);
            self.sink
                .on_entry(&EntryStats::new(&entry_report, entry_started.elapsed()));
            report.push(entry_report);
        }
        report.pages = pages.pages();

        let total = started.elapsed();
        let stats = CycleStats::new(&report, total);
        info!(
            event = "Sync",
            phase = "Done",
            pages = report.pages,
            entries = report.entries.len(),
            mutations = stats.mutations,
            "Finished ACL sync"
        );
        self.sink.on_cycle(&stats);
        self.sink
            .on_cycle_phases(&stats, &CyclePhases::from_clock(&clock, total));

        Ok(report)
    }

    /// Run cycles forever, sleeping `interval` between them.
    ///
    /// Returns only with the first fatal cycle error.
    pub fn run_recurring(
        &self,
        options: &SyncOptions,
        interval: Duration,
    ) -> Result<Infallible, SyncError> {
        loop {
            self.run_cycle(options)?;
            debug!(
                event = "Sync",
                phase = "Sleep",
                interval_secs = interval.as_secs(),
                "Waiting for next cycle"
            );
            thread::sleep(interval);
        }
    }
}

/// Process exit status for a finished run.
pub fn sync_exit_code<T>(result: &Result<T, SyncError>) -> u8 {
    result.as_ref().map_or_else(SyncError::exit_code, |_| 0)
}
