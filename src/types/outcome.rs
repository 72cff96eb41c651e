//! Per-entry results of a reconciliation.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumDiscriminants, EnumString};

/// Why an entry was skipped without a usable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum SkipReason {
    /// Destroy requested, but no identifier is known.
    Unidentified,
    /// Destroy requested, and nothing is live under the identifier.
    NotFound,
}

/// What the engine did for one declared entry.
///
/// Fatal conditions are not outcomes: they surface as [`crate::SyncError`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(OutcomeKind), derive(Hash, PartialOrd, Ord, Serialize, Display, EnumString))]
pub enum Outcome {
    Created { id: String },
    Updated,
    Destroyed,
    SkippedNoId { reason: SkipReason },
    SkippedMatch,
    /// An update or destroy was rejected; the cycle carried on.
    Failed { reason: String },
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        OutcomeKind::from(self)
    }

    /// True when the cluster was changed.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Outcome::Created { .. } | Outcome::Updated | Outcome::Destroyed
        )
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Outcome::Created { id } => write!(f, "Created({id})"),
            Outcome::SkippedNoId { reason } => write!(f, "SkippedNoId({reason})"),
            Outcome::Failed { reason } => write!(f, "Failed({reason})"),
            other => write!(f, "{}", other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        created = { Outcome::Created { id: "abc".into() }, "Created(abc)", true },
        updated = { Outcome::Updated, "Updated", true },
        destroyed = { Outcome::Destroyed, "Destroyed", true },
        skipped_unidentified = { Outcome::SkippedNoId { reason: SkipReason::Unidentified }, "SkippedNoId(Unidentified)", false },
        skipped_not_found = { Outcome::SkippedNoId { reason: SkipReason::NotFound }, "SkippedNoId(NotFound)", false },
        skipped_match = { Outcome::SkippedMatch, "SkippedMatch", false },
        failed = { Outcome::Failed { reason: "boom".into() }, "Failed(boom)", false },
    )]
    fn test_outcome_display_and_mutation(outcome: Outcome, display: &str, mutation: bool) {
        assert_eq!(outcome.to_string(), display);
        assert_eq!(outcome.is_mutation(), mutation);
    }

    #[test]
    fn test_outcome_kind_round_trips_through_str() {
        let kind = Outcome::SkippedMatch.kind();
        assert_eq!(kind.to_string(), "SkippedMatch");
        assert_eq!("SkippedMatch".parse::<OutcomeKind>().unwrap(), kind);
    }
}
