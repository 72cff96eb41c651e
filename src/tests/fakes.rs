//! In-memory stand-ins for the cluster and the parameter store.
//!
//! Every call is recorded so tests can assert on exactly which remote
//! operations a cycle performed.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;

use crate::agent::TokenSlot;
use crate::error::{ClusterError, StoreError};
use crate::traits::{AclBackend, AgentApi, ParameterStore};
use crate::types::{AclSpec, LiveEntry, ParameterPage, ParameterRecord, PutOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Lookup(String),
    Create(AclSpec),
    Update(String, AclSpec),
    Destroy(String),
    IsLeader,
    Bootstrap,
    AgentToken(TokenSlot, String),
}

impl Call {
    fn is_mutation(&self) -> bool {
        matches!(self, Call::Create(_) | Call::Update(..) | Call::Destroy(_))
    }
}

fn refused() -> ClusterError {
    ClusterError::Status {
        status: 500,
        body: "rpc error: injected failure".to_string(),
    }
}

#[derive(Debug)]
pub(crate) struct FakeCluster {
    entries: RefCell<BTreeMap<String, LiveEntry>>,
    calls: RefCell<Vec<Call>>,
    next_id: Cell<u32>,
    leader: Cell<bool>,
    fail_leader: Cell<bool>,
    fail_lookup: Cell<bool>,
    fail_create_for: RefCell<BTreeSet<String>>,
    fail_update_for: RefCell<BTreeSet<String>>,
    fail_destroy_for: RefCell<BTreeSet<String>>,
    fail_bootstrap: Cell<bool>,
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self {
            entries: RefCell::default(),
            calls: RefCell::default(),
            next_id: Cell::new(1),
            leader: Cell::new(true),
            fail_leader: Cell::new(false),
            fail_lookup: Cell::new(false),
            fail_create_for: RefCell::default(),
            fail_update_for: RefCell::default(),
            fail_destroy_for: RefCell::default(),
            fail_bootstrap: Cell::new(false),
        }
    }
}

impl FakeCluster {
    pub(crate) fn with_entry(self, id: &str, name: &str, kind: &str, rules: &str) -> Self {
        self.entries.borrow_mut().insert(
            id.to_string(),
            LiveEntry {
                id: id.to_string(),
                name: name.to_string(),
                kind: kind.to_string(),
                rules: rules.to_string(),
            },
        );
        self
    }

    pub(crate) fn set_leader(&self, leader: bool) {
        self.leader.set(leader);
    }

    pub(crate) fn fail_leader(&self) {
        self.fail_leader.set(true);
    }

    pub(crate) fn fail_lookup(&self) {
        self.fail_lookup.set(true);
    }

    /// Reject creates whose name is `name`.
    pub(crate) fn fail_create(&self, name: &str) {
        self.fail_create_for.borrow_mut().insert(name.to_string());
    }

    pub(crate) fn fail_update(&self, id: &str) {
        self.fail_update_for.borrow_mut().insert(id.to_string());
    }

    pub(crate) fn fail_destroy(&self, id: &str) {
        self.fail_destroy_for.borrow_mut().insert(id.to_string());
    }

    pub(crate) fn fail_bootstrap(&self) {
        self.fail_bootstrap.set(true);
    }

    pub(crate) fn entry(&self, id: &str) -> Option<LiveEntry> {
        self.entries.borrow().get(id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub(crate) fn mutations(&self) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn mint_id(&self) -> String {
        let n = self.next_id.get();
        self.next_id.set(n + 1);
        format!("00000000-0000-0000-0000-{n:012}")
    }
}

impl AclBackend for FakeCluster {
    fn lookup(&self, id: &str) -> Result<Option<LiveEntry>, ClusterError> {
        self.record(Call::Lookup(id.to_string()));
        if self.fail_lookup.get() {
            return Err(refused());
        }
        Ok(self.entry(id))
    }

    fn create(&self, spec: &AclSpec) -> Result<String, ClusterError> {
        self.record(Call::Create(spec.clone()));
        if self.fail_create_for.borrow().contains(&spec.name) {
            return Err(refused());
        }
        let id = spec.id.clone().unwrap_or_else(|| self.mint_id());
        self.entries
            .borrow_mut()
            .insert(id.clone(), spec.clone().into_live(id.clone()));
        Ok(id)
    }

    fn update(&self, id: &str, spec: &AclSpec) -> Result<(), ClusterError> {
        self.record(Call::Update(id.to_string(), spec.clone()));
        if self.fail_update_for.borrow().contains(id) {
            return Err(refused());
        }
        self.entries
            .borrow_mut()
            .insert(id.to_string(), spec.clone().into_live(id));
        Ok(())
    }

    fn destroy(&self, id: &str) -> Result<(), ClusterError> {
        self.record(Call::Destroy(id.to_string()));
        if self.fail_destroy_for.borrow().contains(id) {
            return Err(refused());
        }
        self.entries.borrow_mut().remove(id);
        Ok(())
    }

    fn is_leader(&self) -> Result<bool, ClusterError> {
        self.record(Call::IsLeader);
        if self.fail_leader.get() {
            return Err(ClusterError::UnexpectedResponse(
                "failed to parse /agent/self stats".to_string(),
            ));
        }
        Ok(self.leader.get())
    }
}

impl AgentApi for FakeCluster {
    fn bootstrap(&self) -> Result<String, ClusterError> {
        self.record(Call::Bootstrap);
        if self.fail_bootstrap.get() {
            return Err(ClusterError::Status {
                status: 403,
                body: "ACL bootstrap no longer allowed".to_string(),
            });
        }
        Ok(self.mint_id())
    }

    fn update_agent_token(&self, slot: TokenSlot, token: &str) -> Result<(), ClusterError> {
        self.record(Call::AgentToken(slot, token.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Put {
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) options: PutOptions,
}

/// Parameter store held in a sorted map. Listing pages are offsets into the
/// sorted key set.
#[derive(Debug, Default)]
pub(crate) struct FakeStore {
    values: RefCell<BTreeMap<String, String>>,
    gets: RefCell<Vec<(String, bool)>>,
    puts: RefCell<Vec<Put>>,
    lists: Cell<usize>,
    fail_gets: RefCell<BTreeSet<String>>,
    fail_puts: Cell<bool>,
    fail_list_on: Cell<Option<usize>>,
}

impl FakeStore {
    pub(crate) fn insert(&self, name: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    pub(crate) fn value(&self, name: &str) -> Option<String> {
        self.values.borrow().get(name).cloned()
    }

    pub(crate) fn fail_get(&self, name: &str) {
        self.fail_gets.borrow_mut().insert(name.to_string());
    }

    pub(crate) fn fail_puts(&self) {
        self.fail_puts.set(true);
    }

    /// Fail the `n`th listing call (1-based) and every one after it.
    pub(crate) fn fail_list_from(&self, n: usize) {
        self.fail_list_on.set(Some(n));
    }

    pub(crate) fn gets(&self) -> Vec<(String, bool)> {
        self.gets.borrow().clone()
    }

    pub(crate) fn puts(&self) -> Vec<Put> {
        self.puts.borrow().clone()
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.lists.get()
    }

    fn io_error(name: &str) -> StoreError {
        StoreError::Io {
            path: PathBuf::from(name),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "injected failure"),
        }
    }
}

impl ParameterStore for FakeStore {
    fn get(&self, name: &str, fail_if_absent: bool) -> Result<String, StoreError> {
        self.gets
            .borrow_mut()
            .push((name.to_string(), fail_if_absent));
        if self.fail_gets.borrow().contains(name) {
            return Err(Self::io_error(name));
        }
        match self.value(name) {
            Some(value) => Ok(value),
            None if fail_if_absent => Err(StoreError::NotFound(name.to_string())),
            None => Ok(String::new()),
        }
    }

    fn put(&self, name: &str, value: &str, options: &PutOptions) -> Result<(), StoreError> {
        self.puts.borrow_mut().push(Put {
            name: name.to_string(),
            value: value.to_string(),
            options: options.clone(),
        });
        if self.fail_puts.get() {
            return Err(Self::io_error(name));
        }
        if !options.overwrite && self.values.borrow().contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        self.insert(name, value);
        Ok(())
    }

    fn list_page(
        &self,
        prefix: &str,
        page_size: Option<usize>,
        next_token: Option<&str>,
    ) -> Result<ParameterPage, StoreError> {
        let call = self.lists.get() + 1;
        self.lists.set(call);
        if self.fail_list_on.get().is_some_and(|n| call >= n) {
            return Err(Self::io_error(prefix));
        }

        let offset = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StoreError::InvalidPageToken(token.to_string()))?,
            None => 0,
        };
        let matching: Vec<ParameterRecord> = self
            .values
            .borrow()
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, value)| ParameterRecord::new(name.as_str(), value.as_str()))
            .collect();

        let take = page_size.unwrap_or(usize::MAX);
        let records: Vec<ParameterRecord> =
            matching.iter().skip(offset).take(take).cloned().collect();
        let end = offset.saturating_add(records.len());
        let next_token = (end < matching.len()).then(|| end.to_string());
        Ok(ParameterPage {
            records,
            next_token,
        })
    }
}
