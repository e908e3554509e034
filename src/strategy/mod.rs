//! Asset handler strategies: type-specific execution of a dequeued entry
//! against the catalog.

use async_trait::async_trait;

use crate::catalog::ExecutionContext;
use crate::error::Result;
use crate::model::{ActionResult, QueueEntry};

pub mod video;

pub use video::VideoStrategy;

/// Result of one handler invocation plus the catalog id it materialized, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerOutcome {
    pub result: ActionResult,
    pub asset_id: Option<i64>,
}

impl HandlerOutcome {
    pub fn success(asset_id: i64) -> Self {
        Self {
            result: ActionResult::Success,
            asset_id: Some(asset_id),
        }
    }

    pub fn skipped() -> Self {
        ActionResult::Skipped.into()
    }

    pub fn error() -> Self {
        ActionResult::Error.into()
    }
}

impl From<ActionResult> for HandlerOutcome {
    fn from(result: ActionResult) -> Self {
        Self {
            result,
            asset_id: None,
        }
    }
}

/// `Ok` carries business outcomes (including ERROR for recoverable upstream
/// problems); `Err` is reserved for failures the caller must see.
#[async_trait]
pub trait AssetHandlerStrategy: Send + Sync {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        entry: Option<&QueueEntry>,
    ) -> Result<HandlerOutcome>;
}
