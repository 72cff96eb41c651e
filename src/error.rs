use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::PathBuf;

use thiserror::Error;

/// Process exit status when the cluster issued a token that was not stored.
pub const EXIT_UNSAVED_TOKEN: u8 = 255;

/// Failures of the parameter store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("parameter not found: {0}")]
    NotFound(String),

    #[error("parameter already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid parameter name: {0:?}")]
    InvalidName(String),

    #[error("invalid page token: {0:?}")]
    InvalidPageToken(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt parameter {name}: {reason}")]
    Corrupt { name: String, reason: String },
}

/// Failures talking to the Consul HTTP API.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ClusterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClusterError::Decode(err.to_string())
        } else {
            ClusterError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClusterError {
    fn from(err: serde_json::Error) -> Self {
        ClusterError::Decode(err.to_string())
    }
}

/// Conditions that abort a sync cycle.
///
/// Non-fatal per-entry failures are reported as [`crate::Outcome::Failed`] instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("ACL definition prefix is required")]
    MissingDefinitionPrefix,

    #[error("failed to determine Consul leader: {0}")]
    LeaderCheck(#[source] ClusterError),

    #[error("failed to get ACL definition parameters from prefix \"{prefix}\": {source}")]
    List {
        prefix: String,
        #[source]
        source: StoreError,
    },

    #[error("parameter {name} has no slug below prefix \"{prefix}\"")]
    EmptySlug { name: String, prefix: String },

    #[error("failed to parse parameter {slug} from {name} as acl: {reason}")]
    Decode {
        slug: String,
        name: String,
        reason: String,
    },

    #[error("failed to get ACL ID from parameter \"{key}\": {source}")]
    IndexLookup {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to get info for ACL {slug} (Name: \"{name}\"): {source}")]
    Lookup {
        slug: String,
        name: String,
        #[source]
        source: ClusterError,
    },

    #[error("failed to create ACL {slug} (Name: \"{name}\"): {source}")]
    Create {
        slug: String,
        name: String,
        #[source]
        source: ClusterError,
    },

    #[error("created ACL {slug} with ID {id}, but failed to save the ID to \"{key}\": {source}")]
    IndexWrite {
        slug: String,
        id: String,
        key: String,
        #[source]
        source: StoreError,
    },
}

impl SyncError {
    /// Slug of the definition being processed when the error happened.
    pub fn slug(&self) -> Option<&str> {
        match self {
            SyncError::Decode { slug, .. }
            | SyncError::Lookup { slug, .. }
            | SyncError::Create { slug, .. }
            | SyncError::IndexWrite { slug, .. } => Some(slug),
            _ => None,
        }
    }

    /// Process exit status. Every error that reaches the caller ends the run.
    pub const fn exit_code(&self) -> u8 {
        1
    }
}

/// Failures of the one-shot ACL bootstrap.
#[derive(Error)]
pub enum BootstrapError {
    #[error("token parameter name cannot be empty")]
    MissingParameter,

    #[error("bootstrap failed: {0}")]
    Request(#[source] ClusterError),

    /// The cluster issued a token but it could not be stored.
    #[error("bootstrap succeeded, but failed to save token parameter to \"{param}\": {source}")]
    Persist {
        token: String,
        param: String,
        #[source]
        source: StoreError,
    },
}

impl BootstrapError {
    /// The issued token, if bootstrap got that far.
    pub fn token(&self) -> Option<&str> {
        match self {
            BootstrapError::Persist { token, .. } => Some(token),
            _ => None,
        }
    }

    pub const fn exit_code(&self) -> u8 {
        match self {
            BootstrapError::Persist { .. } => EXIT_UNSAVED_TOKEN,
            _ => 1,
        }
    }
}

impl Debug for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BootstrapError::MissingParameter => f.write_str("MissingParameter"),
            BootstrapError::Request(err) => f.debug_tuple("Request").field(err).finish(),
            BootstrapError::Persist { param, source, .. } => f
                .debug_struct("Persist")
                .field("token", &"<redacted>")
                .field("param", param)
                .field("source", source)
                .finish(),
        }
    }
}

/// Failures pushing a token into the local agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to read token from parameter \"{param}\": {source}")]
    TokenRead {
        param: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to set agent {slot}: {source}")]
    Push {
        slot: String,
        #[source]
        source: ClusterError,
    },
}

/// Failures building a Consul client from configuration.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to get management token from parameter \"{param}\": {source}")]
    ManagementToken {
        param: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to create Consul client: {0}")]
    Client(#[source] ClusterError),
}

/// Invalid command-line or environment configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0}")]
    Missing(&'static str),

    #[error("invalid Consul address {0:?}")]
    InvalidAddress(String),
}
