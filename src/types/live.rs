//! Live ACL records and mutation payloads.

use serde::{Deserialize, Serialize};

/// The cluster's current record for an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveEntry {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub rules: String,
}

/// Body of a create or update request. `id: None` asks the cluster to assign one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclSpec {
    pub id: Option<String>,
    pub name: String,
    pub kind: String,
    pub rules: String,
}

impl AclSpec {
    /// The live record this spec would produce under `id`.
    pub fn into_live(self, id: impl Into<String>) -> LiveEntry {
        LiveEntry {
            id: id.into(),
            name: self.name,
            kind: self.kind,
            rules: self.rules,
        }
    }
}
