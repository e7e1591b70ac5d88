use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use tailscope_api::{ApiError, LogApi};
use tailscope_types::{FilterState, SavedSearch};

/// Persists and restores named filter-state snapshots.
///
/// The local list mirrors the server's ordering (newest first by
/// convention) and is never reordered here. Deletion is optimistic: the
/// entry disappears locally as soon as the call is issued and is only
/// put back if the server reports a failure.
pub struct SavedSearchStore {
    api: Arc<dyn LogApi>,
    entries: RwLock<Vec<SavedSearch>>,
}

impl SavedSearchStore {
    pub fn new(api: Arc<dyn LogApi>) -> Self {
        Self {
            api,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of the local list
    pub fn entries(&self) -> Vec<SavedSearch> {
        self.entries.read().clone()
    }

    /// Reload the list from the server, preserving its ordering
    pub async fn list(&self) -> Result<Vec<SavedSearch>, ApiError> {
        let fetched = self.api.list_saved_searches().await?;
        *self.entries.write() = fetched.clone();
        Ok(fetched)
    }

    /// Persist a named snapshot. Blank names are rejected before any
    /// network call.
    pub async fn create(
        &self,
        name: &str,
        snapshot: FilterState,
    ) -> Result<SavedSearch, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation(
                "saved search name must not be empty".into(),
            ));
        }

        let saved = self.api.create_saved_search(name, &snapshot).await?;
        // Newest first, matching the server's list convention
        self.entries.write().insert(0, saved.clone());
        Ok(saved)
    }

    /// Delete a saved search. The entry is removed locally up front and
    /// re-inserted at its old position only if the server reports a
    /// failure.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let removed = {
            let mut entries = self.entries.write();
            match entries.iter().position(|s| s.id == id) {
                Some(index) => Some((index, entries.remove(index))),
                None => None,
            }
        };

        match self.api.delete_saved_search(id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Some((index, entry)) = removed {
                    warn!(id, error = %err, "delete failed, restoring saved search");
                    let mut entries = self.entries.write();
                    let index = index.min(entries.len());
                    entries.insert(index, entry);
                }
                Err(err)
            }
        }
    }
}
