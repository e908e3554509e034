use crate::db::{QueueCriteria, QueueStore};
use crate::error::Result;
use crate::model::QueueEntry;
use tracing::debug;

/// Answers "is equivalent work already pending?" for a candidate entry.
///
/// This is a read-only probe. Inserts still go through
/// [`QueueStore::enqueue`], which re-checks the key inside the insert itself.
#[derive(Debug, Clone)]
pub struct DuplicateChecker {
    store: QueueStore,
}

impl DuplicateChecker {
    pub fn new(store: QueueStore) -> Self {
        Self { store }
    }

    pub async fn is_already_queued(&self, candidate: &QueueEntry) -> Result<bool> {
        let criteria = QueueCriteria::active_duplicates_of(
            candidate.kind,
            &candidate.target_entity_id,
            &candidate.type_metadata,
            candidate.action,
        );
        let existing = self.store.find(&criteria).await?;
        if let Some(entry) = existing.first() {
            debug!(
                existing_id = ?entry.id,
                kind = candidate.kind.as_str(),
                target_entity_id = %candidate.target_entity_id,
                "equivalent entry already queued"
            );
            return Ok(true);
        }
        Ok(false)
    }
}
