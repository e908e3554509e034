//! Reconciliation of desired (PIM) video state against the catalog product.
//!
//! Runs inline during a product sync pass. It never calls the video provider:
//! it either drops stale video entries from the in-memory product, leaves the
//! product alone, or enqueues an asset entry for the drain to pick up.

use tracing::{debug, error, info, instrument, warn};

use crate::db::QueueStore;
use crate::dedup::DuplicateChecker;
use crate::error::{Result, SyncError};
use crate::model::{PimProduct, Product, QueueAction, QueueEntry};
use crate::type_metadata::{TypeMetadata, VideoSource};

/// Canonical watch URL for a provider video id.
pub fn get_complete_video_url(format: &str, link: &str) -> Result<String> {
    match VideoSource::from_format(format) {
        VideoSource::Youtube => Ok(format!("https://youtube.com/watch?v={link}")),
        VideoSource::Vimeo => Ok(format!("https://vimeo.com/{link}")),
        VideoSource::Unsupported(other) => Err(SyncError::UnsupportedFormat(other)),
    }
}

#[derive(Debug, Clone)]
pub struct VideoModifier {
    store: QueueStore,
    checker: DuplicateChecker,
}

impl VideoModifier {
    pub fn new(store: QueueStore) -> Self {
        let checker = DuplicateChecker::new(store.clone());
        Self { store, checker }
    }

    #[instrument(skip_all, fields(sku = %product.sku))]
    pub async fn handle(
        &self,
        mut product: Product,
        pim_product: PimProduct,
    ) -> Result<(Product, PimProduct)> {
        let desired = match pim_product.video() {
            Ok(desired) => desired,
            Err(err) => {
                error!(?err, "Could not process video element");
                return Ok((product, pim_product));
            }
        };

        let new_video = match &desired {
            None => None,
            Some(video) => match get_complete_video_url(&video.format, &video.link) {
                Ok(url) => Some((video.format.clone(), url)),
                Err(err) => {
                    error!(?err, "Could not process video element");
                    return Ok((product, pim_product));
                }
            },
        };

        let Some((format, new_url)) = new_video else {
            let before = product.media_gallery_entries.len();
            product
                .media_gallery_entries
                .retain(|entry| !entry.is_external_video());
            let removed = before - product.media_gallery_entries.len();
            if removed > 0 {
                info!(removed, "removed video entries absent from PIM");
            }
            return Ok((product, pim_product));
        };

        let unchanged = product
            .media_gallery_entries
            .iter()
            .any(|entry| entry.is_external_video() && entry.video_url() == Some(new_url.as_str()));
        if unchanged {
            debug!(url = %new_url, "video already present");
            return Ok((product, pim_product));
        }

        let Some(target_entity_id) = pim_product.pimcore_id() else {
            warn!("PIM product has no pimcore_id; cannot queue video");
            return Ok((product, pim_product));
        };

        let type_metadata = TypeMetadata::product_video(&VideoSource::from_format(&format));
        let entry = QueueEntry::asset(
            QueueAction::InsertUpdate,
            product.store_id,
            target_entity_id,
            type_metadata.encode(),
            new_url,
        );

        if self.checker.is_already_queued(&entry).await? {
            return Ok((product, pim_product));
        }
        match self.store.enqueue(&entry).await? {
            Some(saved) => info!(
                entry_id = ?saved.id,
                target_entity_id = %saved.target_entity_id,
                "video queued"
            ),
            None => debug!("video queued concurrently by another pass"),
        }

        Ok((product, pim_product))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_provider_urls() {
        assert_eq!(
            get_complete_video_url("youtube", "abc123").unwrap(),
            "https://youtube.com/watch?v=abc123"
        );
        assert_eq!(
            get_complete_video_url("vimeo", "987").unwrap(),
            "https://vimeo.com/987"
        );
    }

    #[test]
    fn rejects_other_formats() {
        match get_complete_video_url("dailymotion", "x") {
            Err(SyncError::UnsupportedFormat(format)) => assert_eq!(format, "dailymotion"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
