use crate::agent::TokenSlot;
use crate::error::{ClusterError, StoreError};
use crate::types::{AclSpec, LiveEntry, ParameterPage, PutOptions};

/// The cluster's ACL API, as seen by the reconciler.
///
/// Calls are blocking. Implementations apply their own transport timeouts.
pub trait AclBackend {
    /// The live entry for `id`, or `None` when the cluster has no such entry.
    fn lookup(&self, id: &str) -> Result<Option<LiveEntry>, ClusterError>;

    /// Create an entry and return its identifier.
    ///
    /// When `spec.id` is `None` the cluster assigns the identifier.
    fn create(&self, spec: &AclSpec) -> Result<String, ClusterError>;

    /// Replace name, kind and rules of the entry at `id`.
    fn update(&self, id: &str, spec: &AclSpec) -> Result<(), ClusterError>;

    fn destroy(&self, id: &str) -> Result<(), ClusterError>;

    /// Whether the agent this backend talks to is the current cluster leader.
    fn is_leader(&self) -> Result<bool, ClusterError>;
}

/// Agent-level operations outside the reconciliation cycle.
pub trait AgentApi {
    /// Run the one-time ACL bootstrap and return the management token.
    fn bootstrap(&self) -> Result<String, ClusterError>;

    /// Replace one of the running agent's token slots.
    fn update_agent_token(&self, slot: TokenSlot, token: &str) -> Result<(), ClusterError>;
}

/// Hierarchical key/value parameter store.
pub trait ParameterStore {
    /// Read a parameter.
    ///
    /// A missing parameter is [`StoreError::NotFound`] when `fail_if_absent`
    /// is set, and an empty string otherwise.
    fn get(&self, name: &str, fail_if_absent: bool) -> Result<String, StoreError>;

    /// Write a parameter. An existing value without `options.overwrite` is
    /// [`StoreError::AlreadyExists`].
    fn put(&self, name: &str, value: &str, options: &PutOptions) -> Result<(), StoreError>;

    /// One page of every parameter below `prefix`, recursively.
    ///
    /// `page_size: None` leaves the page size to the store. Pass the previous
    /// page's `next_token` to continue.
    fn list_page(
        &self,
        prefix: &str,
        page_size: Option<usize>,
        next_token: Option<&str>,
    ) -> Result<ParameterPage, StoreError>;
}
