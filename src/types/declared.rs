//! Desired ACL entries decoded from definition parameters.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use super::live::{AclSpec, LiveEntry};

/// Classification used when a definition leaves `type` empty.
pub const DEFAULT_KIND: &str = "client";

/// Desired state for one ACL entry.
///
/// `slug` is never empty. `id` is empty when neither the definition nor the
/// id index knows the cluster identifier yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredEntry {
    pub slug: String,
    pub id: String,
    pub name: String,
    pub kind: String,
    pub rules: String,
    pub destroy: bool,
}

impl Display for DeclaredEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, r#"{} (Name: "{}")"#, self.slug, self.name)
    }
}

impl DeclaredEntry {
    /// Create an entry with no id, no rules, the default kind and `destroy` unset.
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            id: String::new(),
            name: name.into(),
            kind: DEFAULT_KIND.to_string(),
            rules: String::new(),
            destroy: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_rules(mut self, rules: impl Into<String>) -> Self {
        self.rules = rules.into();
        self
    }

    pub fn with_destroy(mut self, destroy: bool) -> Self {
        self.destroy = destroy;
        self
    }

    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// True when name, kind and rules are byte-for-byte equal to the live entry.
    ///
    /// No normalization happens here: a cluster that reformats rule text will
    /// see an update on every cycle.
    pub fn matches(&self, live: &LiveEntry) -> bool {
        self.name == live.name && self.kind == live.kind && self.rules == live.rules
    }

    /// Request payload carrying the identifier, if one is known.
    pub fn spec(&self) -> AclSpec {
        AclSpec {
            id: self.has_id().then(|| self.id.clone()),
            name: self.name.clone(),
            kind: self.kind.clone(),
            rules: self.rules.clone(),
        }
    }

    /// Request payload with the identifier left out, so the cluster mints one.
    pub fn spec_without_id(&self) -> AclSpec {
        AclSpec {
            id: None,
            ..self.spec()
        }
    }
}
