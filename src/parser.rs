//! Decoding of ACL definition parameters into [`DeclaredEntry`] values.
//!
//! A definition is a JSON object:
//!
//! ```json
//! { "id": "optional", "name": "svc-a", "type": "client", "rules": "...", "destroy": "false" }
//! ```
//!
//! Field names match case-insensitively, so the Consul spelling (`ID`,
//! `Name`, `Type`, `Rules`, `Destroy`) works too. When two keys fold to the
//! same field the later one wins. `destroy` is a string-encoded boolean; a
//! bare JSON boolean is accepted as well.

use std::fmt;

use serde::de::{Error as _, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SyncError;
use crate::traits::ParameterStore;
use crate::types::{DEFAULT_KIND, DeclaredEntry, ParameterRecord};

/// Append `/` to a non-empty prefix that lacks one.
pub fn ensure_trailing_slash(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

/// Last `/`-separated segment of `name` once `prefix` is stripped.
pub fn slug_for<'a>(name: &'a str, prefix: &str) -> &'a str {
    let tail = name.strip_prefix(prefix).unwrap_or(name);
    tail.rsplit('/').next().unwrap_or(tail)
}

/// Id-index parameter name for `slug`.
pub fn index_key(id_prefix: &str, slug: &str) -> String {
    format!("{id_prefix}{slug}")
}

#[derive(Debug, Deserialize)]
struct AclDefinition {
    id: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    rules: Option<String>,
    #[serde(default, deserialize_with = "string_bool")]
    destroy: bool,
}

impl AclDefinition {
    fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        let FoldedObject(fields) = serde_json::from_str(payload)?;
        serde_json::from_value(Value::Object(fields))
    }
}

/// A JSON object with its keys lowercased in document order.
struct FoldedObject(Map<String, Value>);

impl<'de> Deserialize<'de> for FoldedObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FoldVisitor;

        impl<'de> Visitor<'de> for FoldVisitor {
            type Value = FoldedObject;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an ACL definition object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fields = Map::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    fields.insert(key.to_lowercase(), value);
                }
                Ok(FoldedObject(fields))
            }
        }

        deserializer.deserialize_map(FoldVisitor)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

fn string_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(false),
        Some(Flag::Bool(value)) => Ok(value),
        Some(Flag::Text(text)) => text
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid destroy flag {text:?}"))),
    }
}

/// Turns definition records into declared entries, resolving missing ids
/// from the id index.
pub struct EntryParser<'a, S: ?Sized> {
    store: &'a S,
    definition_prefix: String,
    id_prefix: String,
}

impl<'a, S: ParameterStore + ?Sized> EntryParser<'a, S> {
    pub fn new(store: &'a S, definition_prefix: &str, id_prefix: &str) -> Self {
        Self {
            store,
            definition_prefix: ensure_trailing_slash(definition_prefix),
            id_prefix: ensure_trailing_slash(id_prefix),
        }
    }

    /// Decode one record.
    ///
    /// Reads the id index exactly once when the payload has no id; an absent
    /// index entry leaves the id empty. Malformed payloads are fatal.
    pub fn parse(&self, record: &ParameterRecord) -> Result<DeclaredEntry, SyncError> {
        let slug = slug_for(&record.name, &self.definition_prefix);
        if slug.is_empty() {
            return Err(SyncError::EmptySlug {
                name: record.name.clone(),
                prefix: self.definition_prefix.clone(),
            });
        }

        debug!(
            event = "Parse",
            phase = "Record",
            name = record.name.as_str(),
            slug,
            bytes = record.value.len()
        );

        let definition =
            AclDefinition::from_json(&record.value).map_err(|e| SyncError::Decode {
                slug: slug.to_string(),
                name: record.name.clone(),
                reason: e.to_string(),
            })?;

        let mut id = definition.id.unwrap_or_default();
        if id.is_empty() {
            let key = index_key(&self.id_prefix, slug);
            id = self
                .store
                .get(&key, false)
                .map_err(|source| SyncError::IndexLookup {
                    key: key.clone(),
                    source,
                })?;
            debug!(
                event = "Parse",
                phase = "IdIndex",
                slug,
                key = key.as_str(),
                found = !id.is_empty()
            );
        }

        let kind = definition
            .kind
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| DEFAULT_KIND.to_string());

        Ok(DeclaredEntry {
            slug: slug.to_string(),
            id,
            name: definition.name.unwrap_or_default(),
            kind,
            rules: definition.rules.unwrap_or_default(),
            destroy: definition.destroy,
        })
    }
}
