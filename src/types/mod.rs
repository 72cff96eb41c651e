//! Data model for the reconciliation cycle.
//!
//! - [`DeclaredEntry`]: desired state decoded from one definition parameter
//! - [`LiveEntry`]: the cluster's current ACL record for an identifier
//! - [`AclSpec`]: the payload of a create or update request
//! - [`Outcome`]: what the engine did for one entry
//! - [`SyncReport`]: every outcome of one cycle, in processing order
//! - [`ParameterRecord`], [`ParameterPage`], [`PutOptions`]: parameter store values

mod declared;
mod live;
mod outcome;
mod parameter;
mod report;

pub use declared::{DEFAULT_KIND, DeclaredEntry};
pub use live::{AclSpec, LiveEntry};
pub use outcome::{Outcome, OutcomeKind, SkipReason};
pub use parameter::{ParameterPage, ParameterRecord, ParameterType, PutOptions};
pub use report::{EntryReport, SyncReport};
