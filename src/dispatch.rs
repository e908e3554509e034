use std::sync::Arc;

use crate::error::Result;
use crate::strategy::AssetHandlerStrategy;
use crate::type_metadata::AssetKind;

/// Routes a queue entry's type metadata to the strategy for its asset family.
///
/// Every [`AssetKind`] maps to exactly one handler; tokens outside the known
/// families fail with `SyncError::UnsupportedType`, malformed tokens with
/// `SyncError::Format`.
#[derive(Clone)]
pub struct StrategyDispatcher {
    video: Arc<dyn AssetHandlerStrategy>,
}

impl StrategyDispatcher {
    pub fn new(video: Arc<dyn AssetHandlerStrategy>) -> Self {
        Self { video }
    }

    pub fn resolve(&self, type_metadata: &str) -> Result<Arc<dyn AssetHandlerStrategy>> {
        match AssetKind::from_token(type_metadata)? {
            AssetKind::ProductVideo(_) => Ok(Arc::clone(&self.video)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ExecutionContext;
    use crate::error::SyncError;
    use crate::model::QueueEntry;
    use crate::strategy::HandlerOutcome;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl AssetHandlerStrategy for Noop {
        async fn execute(
            &self,
            _ctx: &ExecutionContext,
            _entry: Option<&QueueEntry>,
        ) -> Result<HandlerOutcome> {
            Ok(HandlerOutcome::skipped())
        }
    }

    #[test]
    fn every_video_provider_routes_to_video_strategy() {
        let video: Arc<dyn AssetHandlerStrategy> = Arc::new(Noop);
        let dispatcher = StrategyDispatcher::new(Arc::clone(&video));
        for token in [
            "catalog_product:video_youtube",
            "catalog_product:video_vimeo",
            "catalog_product:video_other",
        ] {
            let resolved = dispatcher.resolve(token).unwrap();
            assert!(Arc::ptr_eq(&resolved, &video), "{token}");
        }
    }

    #[test]
    fn unknown_and_malformed_tokens_are_rejected() {
        let dispatcher = StrategyDispatcher::new(Arc::new(Noop));
        assert!(matches!(
            dispatcher.resolve("catalog_product:image_main"),
            Err(SyncError::UnsupportedType(_))
        ));
        assert!(matches!(
            dispatcher.resolve("garbage"),
            Err(SyncError::Format(_))
        ));
    }
}
