// src/lib.rs
pub use agent::{TokenSlot, push_agent_token};
pub use bootstrap::{BootstrapExit, bootstrap};
pub use consul::{ConsulClient, ConsulConfig, connect};
pub use engine::Reconciler;
pub use error::{
    AgentError, BootstrapError, ClusterError, ConfigError, ConnectError, EXIT_UNSAVED_TOKEN,
    StoreError, SyncError,
};
pub use metrics::{MetricsSink, NoOpSink, TracingSink};
pub use parser::EntryParser;
pub use store::FsParameterStore;
pub use sync::{SyncOptions, SyncRunner, sync_exit_code};
pub use traits::{AclBackend, AgentApi, ParameterStore};
pub use types::{
    AclSpec, DeclaredEntry, EntryReport, LiveEntry, Outcome, OutcomeKind, ParameterPage,
    ParameterRecord, PutOptions, SkipReason, SyncReport,
};

pub mod agent;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod consul;
mod engine;
mod error;
pub mod metrics;
pub mod parser;
mod reader;
pub mod store;
mod sync;
pub mod timers;
mod traits;
pub mod types;

#[cfg(test)]
mod tests;
