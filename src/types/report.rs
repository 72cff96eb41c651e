//! Aggregated results of one sync cycle.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::Serialize;

use super::declared::DeclaredEntry;
use super::outcome::{Outcome, OutcomeKind};

/// Outcome for one declared entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub slug: String,
    pub name: String,
    pub outcome: Outcome,
}

impl EntryReport {
    pub fn new(entry: &DeclaredEntry, outcome: Outcome) -> Self {
        Self {
            slug: entry.slug.clone(),
            name: entry.name.clone(),
            outcome,
        }
    }
}

/// Everything one cycle did, in the order the store returned the definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// The cycle did nothing because this agent is not the leader.
    pub skipped_not_leader: bool,
    /// Listing pages read from the store.
    pub pages: usize,
    pub entries: Vec<EntryReport>,
}

impl SyncReport {
    pub fn not_leader() -> Self {
        Self {
            skipped_not_leader: true,
            ..Self::default()
        }
    }

    pub fn push(&mut self, entry: EntryReport) {
        self.entries.push(entry);
    }

    pub fn outcome_for(&self, slug: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|e| e.slug == slug)
            .map(|e| &e.outcome)
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.kind() == kind)
            .count()
    }

    pub fn mutations(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.is_mutation())
            .count()
    }

    /// Number of entries per outcome kind, only kinds that occurred.
    pub fn summary(&self) -> BTreeMap<OutcomeKind, usize> {
        self.entries
            .iter()
            .map(|e| e.outcome.kind())
            .counts()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SkipReason;

    fn report() -> SyncReport {
        let mut report = SyncReport {
            pages: 2,
            ..SyncReport::default()
        };
        report.push(EntryReport::new(
            &DeclaredEntry::new("a", "a"),
            Outcome::Created { id: "1".into() },
        ));
        report.push(EntryReport::new(
            &DeclaredEntry::new("b", "b"),
            Outcome::SkippedMatch,
        ));
        report.push(EntryReport::new(
            &DeclaredEntry::new("c", "c"),
            Outcome::SkippedMatch,
        ));
        report.push(EntryReport::new(
            &DeclaredEntry::new("d", "d"),
            Outcome::SkippedNoId {
                reason: SkipReason::NotFound,
            },
        ));
        report
    }

    #[test]
    fn test_counts_and_summary() {
        let report = report();
        assert_eq!(report.count(OutcomeKind::SkippedMatch), 2);
        assert_eq!(report.count(OutcomeKind::Updated), 0);
        assert_eq!(report.mutations(), 1);

        let summary = report.summary();
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[&OutcomeKind::Created], 1);
        assert_eq!(summary[&OutcomeKind::SkippedNoId], 1);
    }

    #[test]
    fn test_outcome_for() {
        let report = report();
        assert_eq!(report.outcome_for("b"), Some(&Outcome::SkippedMatch));
        assert_eq!(report.outcome_for("zzz"), None);
    }

    #[test]
    fn test_report_serialization() {
        let mut report = SyncReport {
            pages: 1,
            ..SyncReport::default()
        };
        report.push(EntryReport::new(
            &DeclaredEntry::new("svc-a", "svc-a"),
            Outcome::Created { id: "id-1".into() },
        ));
        report.push(EntryReport::new(
            &DeclaredEntry::new("svc-b", "svc-b"),
            Outcome::SkippedNoId {
                reason: SkipReason::Unidentified,
            },
        ));
        insta::assert_json_snapshot!(report, @r#"
        {
          "skipped_not_leader": false,
          "pages": 1,
          "entries": [
            {
              "slug": "svc-a",
              "name": "svc-a",
              "outcome": {
                "Created": {
                  "id": "id-1"
                }
              }
            },
            {
              "slug": "svc-b",
              "name": "svc-b",
              "outcome": {
                "SkippedNoId": {
                  "reason": "Unidentified"
                }
              }
            }
          ]
        }
        "#);
    }

    #[test]
    fn test_not_leader_report_is_empty() {
        let report = SyncReport::not_leader();
        assert!(report.skipped_not_leader);
        assert!(report.entries.is_empty());
        assert_eq!(report.pages, 0);
    }
}
