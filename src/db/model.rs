//! Criteria and view models used by the queue store.

use crate::model::{QueueAction, QueueKind, QueueStatus};

/// Filter for `QueueStore::find`. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct QueueCriteria {
    pub kind: Option<QueueKind>,
    pub target_entity_id: Option<String>,
    pub type_metadata: Option<String>,
    pub action: Option<QueueAction>,
    pub statuses: Vec<QueueStatus>,
    pub limit: Option<u32>,
}

impl QueueCriteria {
    /// Active entries sharing the dedup key of `(kind, target, type, action)`.
    pub fn active_duplicates_of(
        kind: QueueKind,
        target_entity_id: &str,
        type_metadata: &str,
        action: QueueAction,
    ) -> Self {
        Self {
            kind: Some(kind),
            target_entity_id: Some(target_entity_id.to_string()),
            type_metadata: Some(type_metadata.to_string()),
            action: Some(action),
            statuses: QueueStatus::ACTIVE.to_vec(),
            limit: Some(1),
        }
    }

    pub fn with_status(status: QueueStatus) -> Self {
        Self {
            statuses: vec![status],
            ..Default::default()
        }
    }
}

/// Row of the per-kind status breakdown shown to operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub kind: QueueKind,
    pub status: QueueStatus,
    pub count: i64,
}
