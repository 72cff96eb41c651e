//! Per-phase timing of a sync cycle.
//!
//! A [`PhaseTimer`] adds the time between its creation and its drop to one
//! slot of a [`PhaseClock`], so every early return is still accounted for.

use std::cell::Cell;
use std::time::{Duration, Instant};

use serde::Serialize;
use strum_macros::{Display, EnumIter};

/// The stages a cycle spends its time in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
pub enum Phase {
    List,
    Parse,
    Reconcile,
}

/// Accumulated durations, one slot per [`Phase`].
#[derive(Debug, Default)]
pub struct PhaseClock {
    list: Cell<Duration>,
    parse: Cell<Duration>,
    reconcile: Cell<Duration>,
}

impl PhaseClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing `phase`; the elapsed time is recorded when the timer drops.
    pub fn start(&self, phase: Phase) -> PhaseTimer<'_> {
        PhaseTimer {
            start: Instant::now(),
            slot: self.slot(phase),
        }
    }

    pub fn elapsed(&self, phase: Phase) -> Duration {
        self.slot(phase).get()
    }

    fn slot(&self, phase: Phase) -> &Cell<Duration> {
        match phase {
            Phase::List => &self.list,
            Phase::Parse => &self.parse,
            Phase::Reconcile => &self.reconcile,
        }
    }
}

/// RAII timer returned by [`PhaseClock::start`].
pub struct PhaseTimer<'a> {
    start: Instant,
    slot: &'a Cell<Duration>,
}

impl Drop for PhaseTimer<'_> {
    fn drop(&mut self) {
        self.slot.set(self.slot.get() + self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use strum::IntoEnumIterator;

    #[test]
    fn test_phase_timer_records_elapsed() {
        let clock = PhaseClock::new();
        {
            let _timer = clock.start(Phase::List);
            thread::sleep(Duration::from_millis(10));
        }
        assert!(clock.elapsed(Phase::List).as_millis() >= 10);
        assert_eq!(clock.elapsed(Phase::Parse), Duration::ZERO);
    }

    #[test]
    fn test_phase_timer_accumulates() {
        let clock = PhaseClock::new();
        for _ in 0..3 {
            let _timer = clock.start(Phase::Reconcile);
            thread::sleep(Duration::from_millis(5));
        }
        assert!(clock.elapsed(Phase::Reconcile).as_millis() >= 15);
    }

    #[test]
    fn test_phases_are_independent() {
        let clock = PhaseClock::new();
        {
            let _list = clock.start(Phase::List);
            let _parse = clock.start(Phase::Parse);
            thread::sleep(Duration::from_millis(2));
        }
        for phase in Phase::iter() {
            let elapsed = clock.elapsed(phase);
            match phase {
                Phase::Reconcile => assert_eq!(elapsed, Duration::ZERO),
                _ => assert!(elapsed >= Duration::from_millis(2), "{phase}"),
            }
        }
    }
}
