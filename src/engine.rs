use tracing::{error, info, warn};

use crate::error::SyncError;
use crate::parser::{ensure_trailing_slash, index_key};
use crate::traits::{AclBackend, ParameterStore};
use crate::types::{DeclaredEntry, LiveEntry, Outcome, PutOptions, SkipReason};

/// Converges one live ACL entry towards its declaration.
///
/// Each call performs at most one cluster mutation and at most one id-index
/// write. Nothing is cached between calls.
pub struct Reconciler<'a, B: ?Sized, S: ?Sized> {
    backend: &'a B,
    store: &'a S,
    id_prefix: String,
    put_options: PutOptions,
}

impl<'a, B, S> Reconciler<'a, B, S>
where
    B: AclBackend + ?Sized,
    S: ParameterStore + ?Sized,
{
    pub fn new(backend: &'a B, store: &'a S, id_prefix: &str, put_options: PutOptions) -> Self {
        Self {
            backend,
            store,
            id_prefix: ensure_trailing_slash(id_prefix),
            put_options,
        }
    }

    /// Decide and apply the action for `entry`.
    ///
    /// `Err` aborts the cycle: a failed lookup, a failed create, or a created
    /// entry whose id could not be saved. Rejected updates and destroys are
    /// returned as [`Outcome::Failed`] so the cycle can go on.
    pub fn reconcile(&self, entry: &DeclaredEntry) -> Result<Outcome, SyncError> {
        if !entry.has_id() {
            return self.reconcile_unidentified(entry);
        }

        let live = self
            .backend
            .lookup(&entry.id)
            .map_err(|source| SyncError::Lookup {
                slug: entry.slug.clone(),
                name: entry.name.clone(),
                source,
            })?;

        match live {
            None => self.reconcile_missing(entry),
            Some(live) => Ok(self.reconcile_existing(entry, &live)),
        }
    }

    /// No id known: mint a new entry and remember its id, unless asked to destroy.
    fn reconcile_unidentified(&self, entry: &DeclaredEntry) -> Result<Outcome, SyncError> {
        if entry.destroy {
            warn!(
                event = "Reconcile",
                slug = entry.slug.as_str(),
                name = entry.name.as_str(),
                "Unable to destroy ACL {entry}, no ID was provided."
            );
            return Ok(Outcome::SkippedNoId {
                reason: SkipReason::Unidentified,
            });
        }

        info!(
            event = "Reconcile",
            action = "create",
            slug = entry.slug.as_str(),
            "Creating ACL {entry} because no ID was provided."
        );
        let id = self.create(entry, false)?;

        let key = index_key(&self.id_prefix, &entry.slug);
        self.store
            .put(&key, &id, &self.put_options)
            .map_err(|source| SyncError::IndexWrite {
                slug: entry.slug.clone(),
                id: id.clone(),
                key: key.clone(),
                source,
            })?;
        info!(
            event = "Reconcile",
            phase = "IdIndex",
            slug = entry.slug.as_str(),
            key = key.as_str(),
            "Saved ID of ACL {entry}."
        );

        Ok(Outcome::Created { id })
    }

    /// Id known but nothing live under it: recreate under the same id.
    ///
    /// An index entry left behind by an earlier destroy lands here too.
    fn reconcile_missing(&self, entry: &DeclaredEntry) -> Result<Outcome, SyncError> {
        if entry.destroy {
            info!(
                event = "Reconcile",
                slug = entry.slug.as_str(),
                "Unable to destroy ACL {entry}, no ACL found with the provided ID."
            );
            return Ok(Outcome::SkippedNoId {
                reason: SkipReason::NotFound,
            });
        }

        info!(
            event = "Reconcile",
            action = "create",
            slug = entry.slug.as_str(),
            "Creating ACL {entry} with provided ID."
        );
        let id = self.create(entry, true)?;
        Ok(Outcome::Created { id })
    }

    fn reconcile_existing(&self, entry: &DeclaredEntry, live: &LiveEntry) -> Outcome {
        if entry.destroy {
            info!(
                event = "Reconcile",
                action = "destroy",
                slug = entry.slug.as_str(),
                "Destroying ACL {entry}."
            );
            return match self.backend.destroy(&entry.id) {
                Ok(()) => Outcome::Destroyed,
                Err(e) => {
                    error!(
                        event = "Reconcile",
                        action = "destroy",
                        slug = entry.slug.as_str(),
                        "Failed to delete ACL {entry}: {e}"
                    );
                    Outcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
        }

        if entry.matches(live) {
            info!(
                event = "Reconcile",
                action = "skip",
                slug = entry.slug.as_str(),
                "Skipping ACL {entry} - matches."
            );
            return Outcome::SkippedMatch;
        }

        info!(
            event = "Reconcile",
            action = "update",
            slug = entry.slug.as_str(),
            "Updating ACL {entry}"
        );
        match self.backend.update(&entry.id, &entry.spec()) {
            Ok(()) => Outcome::Updated,
            Err(e) => {
                error!(
                    event = "Reconcile",
                    action = "update",
                    slug = entry.slug.as_str(),
                    "Failed to update ACL {entry}: {e}"
                );
                Outcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn create(&self, entry: &DeclaredEntry, with_id: bool) -> Result<String, SyncError> {
        let spec = if with_id {
            entry.spec()
        } else {
            entry.spec_without_id()
        };
        self.backend
            .create(&spec)
            .map_err(|source| SyncError::Create {
                slug: entry.slug.clone(),
                name: entry.name.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests;
