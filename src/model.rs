use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Result, SyncError};

pub const MEDIA_TYPE_EXTERNAL_VIDEO: &str = "external-video";
pub const MEDIA_TYPE_IMAGE: &str = "image";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Asset,
    Product,
}

impl QueueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueKind::Asset => "asset",
            QueueKind::Product => "product",
        }
    }

    pub fn parse_kind(s: &str) -> Option<Self> {
        match s {
            "asset" => Some(QueueKind::Asset),
            "product" => Some(QueueKind::Product),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QueueAction {
    InsertUpdate,
    Delete,
}

impl QueueAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueAction::InsertUpdate => "insert_update",
            QueueAction::Delete => "delete",
        }
    }

    pub fn parse_action(s: &str) -> Option<Self> {
        match s {
            "insert_update" => Some(QueueAction::InsertUpdate),
            "delete" => Some(QueueAction::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum QueueStatus {
    #[default]
    Pending,
    Processing,
    Done,
    Error,
}

impl QueueStatus {
    pub const ACTIVE: [QueueStatus; 2] = [QueueStatus::Pending, QueueStatus::Processing];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Done => "done",
            QueueStatus::Error => "error",
        }
    }

    pub fn parse_status(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QueueStatus::Pending),
            "processing" => Some(QueueStatus::Processing),
            "done" => Some(QueueStatus::Done),
            "error" => Some(QueueStatus::Error),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, QueueStatus::Pending | QueueStatus::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueStatus::Done | QueueStatus::Error)
    }
}

/// Outcome of a single handler invocation. Never persisted as-is; the drain
/// derives the entry's terminal status from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionResult {
    Success,
    Skipped,
    Error,
}

impl ActionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionResult::Success => "SUCCESS",
            ActionResult::Skipped => "SKIPPED",
            ActionResult::Error => "ERROR",
        }
    }

    /// Status a processed entry lands in.
    pub fn terminal_status(&self) -> QueueStatus {
        match self {
            ActionResult::Success | ActionResult::Skipped => QueueStatus::Done,
            ActionResult::Error => QueueStatus::Error,
        }
    }
}

/// A durable unit of pending synchronization work. Asset and product entries
/// share one shape and are told apart by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Option<i64>,
    pub kind: QueueKind,
    pub action: QueueAction,
    pub status: QueueStatus,
    pub target_entity_id: String,
    pub store_view_id: i64,
    pub type_metadata: String,
    pub value: Option<String>,
    pub asset_id: i64,
    pub claimed_by: Option<String>,
    pub error_message: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl QueueEntry {
    /// Unsaved entry of the given kind in its default (PENDING) state.
    pub fn new(kind: QueueKind) -> Self {
        Self {
            id: None,
            kind,
            action: QueueAction::InsertUpdate,
            status: QueueStatus::Pending,
            target_entity_id: String::new(),
            store_view_id: 0,
            type_metadata: String::new(),
            value: None,
            asset_id: 0,
            claimed_by: None,
            error_message: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn asset(
        action: QueueAction,
        store_view_id: i64,
        target_entity_id: impl Into<String>,
        type_metadata: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            action,
            store_view_id,
            target_entity_id: target_entity_id.into(),
            type_metadata: type_metadata.into(),
            value: Some(value.into()),
            ..Self::new(QueueKind::Asset)
        }
    }

    pub fn product(
        action: QueueAction,
        store_view_id: i64,
        target_entity_id: impl Into<String>,
    ) -> Self {
        Self {
            action,
            store_view_id,
            target_entity_id: target_entity_id.into(),
            ..Self::new(QueueKind::Product)
        }
    }

    /// Product entry covering the same target as this asset entry; used to
    /// probe whether the base product import is still pending.
    pub fn to_product_entry(&self) -> Self {
        Self::product(self.action, self.store_view_id, self.target_entity_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContent {
    pub name: String,
    pub mime_type: String,
    pub base64_encoded_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoContent {
    pub media_type: String,
    pub video_provider: String,
    pub video_url: String,
    pub video_title: String,
    pub video_description: String,
    pub video_metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaGalleryEntry {
    pub id: Option<i64>,
    pub media_type: String,
    pub label: Option<String>,
    pub disabled: bool,
    pub types: Vec<String>,
    pub content: Option<ImageContent>,
    pub video_content: Option<VideoContent>,
}

impl MediaGalleryEntry {
    pub fn is_external_video(&self) -> bool {
        self.media_type == MEDIA_TYPE_EXTERNAL_VIDEO
    }

    pub fn video_url(&self) -> Option<&str> {
        self.video_content.as_ref().map(|v| v.video_url.as_str())
    }
}

/// Catalog-side product projection. Owns its media gallery for the duration
/// of a reconciliation or handler pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: Option<i64>,
    pub sku: String,
    pub store_id: i64,
    pub category_ids: Vec<i64>,
    pub media_gallery_entries: Vec<MediaGalleryEntry>,
}

impl Product {
    pub fn media_entry_ids(&self) -> Vec<i64> {
        self.media_gallery_entries
            .iter()
            .filter_map(|e| e.id)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDescriptor {
    pub format: String,
    pub link: String,
}

/// PIM-side product descriptor: arbitrary keyed fields as delivered upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PimProduct {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PimProduct {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn pimcore_id(&self) -> Option<String> {
        match self.fields.get("pimcore_id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Category ids from the descriptor. Entries that are not integers are
    /// dropped and logged.
    pub fn category_ids(&self) -> Vec<i64> {
        let Some(Value::Array(items)) = self.fields.get("category_ids") else {
            return Vec::new();
        };
        let mut ids = Vec::with_capacity(items.len());
        let mut dropped = Vec::new();
        for item in items {
            let parsed = match item {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            };
            match parsed {
                Some(id) => ids.push(id),
                None => dropped.push(item.to_string()),
            }
        }
        if !dropped.is_empty() {
            warn!(
                pimcore_id = ?self.pimcore_id(),
                dropped = %dropped.join(", "),
                "ignoring category ids that are not integers"
            );
        }
        ids
    }

    /// Desired video state. `Ok(None)` when the field is missing, null or
    /// empty; a non-empty value that is not an object is a format error.
    pub fn video(&self) -> Result<Option<VideoDescriptor>> {
        let video = match self.fields.get("video") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) if s.is_empty() => return Ok(None),
            Some(Value::Array(items)) if items.is_empty() => return Ok(None),
            Some(Value::Object(video)) => video,
            Some(other) => {
                return Err(SyncError::Format(format!(
                    "video field must be an object, got {other}"
                )))
            }
        };
        if video.is_empty() {
            return Ok(None);
        }
        let field = |key: &str| {
            video
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Ok(Some(VideoDescriptor {
            format: field("format"),
            link: field("link"),
        }))
    }
}
