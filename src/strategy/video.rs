use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::{AssetHandlerStrategy, HandlerOutcome};
use crate::catalog::{CatalogRepository, ExecutionContext, StoreContext};
use crate::dedup::DuplicateChecker;
use crate::error::{CatalogError, Result, SyncError};
use crate::image::{encode_image, ImageContentValidator, MIME_JPEG};
use crate::media::{ThumbnailFetcher, VideoListResponse, VideoMetadataApi};
use crate::model::{
    MediaGalleryEntry, Product, QueueEntry, VideoContent, MEDIA_TYPE_EXTERNAL_VIDEO,
};
use crate::type_metadata::{AssetKind, VideoSource};

/// Metadata pulled from the provider for one video.
#[derive(Debug, Clone, PartialEq, Eq)]
struct VideoDetails {
    video_id: String,
    provider: String,
    title: String,
    description: String,
    thumbnail_url: String,
}

/// Text after the first `v=` in a watch URL, up to the next `&` or `#`.
pub fn extract_youtube_id(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("v=")?;
    let id = rest.split(|c: char| c == '&' || c == '#').next().unwrap_or_default();
    (!id.is_empty()).then_some(id)
}

/// Materializes external videos into a product's media gallery.
pub struct VideoStrategy {
    catalog: Arc<dyn CatalogRepository>,
    store_context: Arc<dyn StoreContext>,
    checker: DuplicateChecker,
    video_api: Arc<dyn VideoMetadataApi>,
    thumbnails: Arc<dyn ThumbnailFetcher>,
    validator: ImageContentValidator,
    youtube_api_key: Option<String>,
}

impl VideoStrategy {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        store_context: Arc<dyn StoreContext>,
        checker: DuplicateChecker,
        video_api: Arc<dyn VideoMetadataApi>,
        thumbnails: Arc<dyn ThumbnailFetcher>,
        youtube_api_key: Option<String>,
    ) -> Self {
        Self {
            catalog,
            store_context,
            checker,
            video_api,
            thumbnails,
            validator: ImageContentValidator,
            youtube_api_key: youtube_api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    async fn create_youtube_video(&self, url: &str, product: Product) -> Result<HandlerOutcome> {
        let Some(api_key) = self.youtube_api_key.as_deref() else {
            error!("No youtube api key provided");
            return Ok(HandlerOutcome::error());
        };
        let Some(video_id) = extract_youtube_id(url) else {
            error!(url, "could not extract youtube video id from url");
            return Ok(HandlerOutcome::error());
        };

        let body = match self.video_api.fetch_video_metadata(video_id, api_key).await {
            Ok(body) => body,
            Err(err) => {
                error!(?err, video_id, "Could not retrieve video data from youtube api");
                return Ok(HandlerOutcome::error());
            }
        };
        let response: VideoListResponse = match serde_json::from_str(&body) {
            Ok(response) => response,
            Err(err) => {
                error!(?err, video_id, "Error occurred while trying to decode youtube api data");
                return Ok(HandlerOutcome::error());
            }
        };
        let Some(item) = response.items.into_iter().next() else {
            error!(video_id, "No items retrieved from youtube api");
            return Ok(HandlerOutcome::error());
        };
        if item.id != video_id {
            error!(video_id, returned = %item.id, "Wrong video returned in youtube api");
            return Ok(HandlerOutcome::error());
        }
        let Some(thumbnail_url) = item.snippet.thumbnails.best_url() else {
            error!(video_id, "youtube api returned no thumbnail");
            return Ok(HandlerOutcome::error());
        };

        let details = VideoDetails {
            video_id: video_id.to_string(),
            provider: VideoSource::Youtube.as_str().to_string(),
            title: item.snippet.title.clone(),
            description: item.snippet.description.clone(),
            thumbnail_url: thumbnail_url.to_string(),
        };

        let Some(entry) = self.create_video_entry(url, &details).await? else {
            return Ok(HandlerOutcome::error());
        };
        let asset_id = self.add_video_for_product(product, entry).await?;
        info!(video_id, asset_id, "video attached to product");
        Ok(HandlerOutcome::success(asset_id))
    }

    /// `Ok(None)` when the thumbnail request itself failed (logged);
    /// an empty thumbnail body is a hard failure.
    async fn create_video_entry(
        &self,
        video_url: &str,
        details: &VideoDetails,
    ) -> Result<Option<MediaGalleryEntry>> {
        let thumbnail = match self.thumbnails.fetch_thumbnail(&details.thumbnail_url).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(?err, url = %details.thumbnail_url, "thumbnail request failed");
                return Ok(None);
            }
        };
        if thumbnail.is_empty() {
            return Err(SyncError::Localized(
                "Could not get preview image information. Please check your connection and try again."
                    .to_string(),
            ));
        }

        // Provider thumbnails are served as JPEG.
        let content = encode_image(
            format!("{}_{}", details.provider, details.video_id),
            MIME_JPEG,
            &thumbnail,
        );

        Ok(Some(MediaGalleryEntry {
            id: None,
            media_type: MEDIA_TYPE_EXTERNAL_VIDEO.to_string(),
            label: Some(details.title.clone()),
            disabled: false,
            types: Vec::new(),
            content: Some(content),
            video_content: Some(VideoContent {
                media_type: MEDIA_TYPE_EXTERNAL_VIDEO.to_string(),
                video_provider: details.provider.clone(),
                video_url: video_url.to_string(),
                video_title: details.title.clone(),
                video_description: details.description.clone(),
                video_metadata: None,
            }),
        }))
    }

    /// Append, persist, and return the id the catalog assigned to the new entry.
    async fn add_video_for_product(
        &self,
        mut product: Product,
        entry: MediaGalleryEntry,
    ) -> Result<i64> {
        let valid = entry
            .content
            .as_ref()
            .is_some_and(|c| self.validator.is_valid(c));
        if !valid {
            return Err(SyncError::Input("The image content is not valid.".to_string()));
        }

        let existing: HashSet<i64> = product.media_entry_ids().into_iter().collect();
        product.media_gallery_entries.push(entry);

        let saved = match self.catalog.save(product).await {
            Ok(saved) => saved,
            Err(CatalogError::Input(msg)) => return Err(SyncError::Input(msg)),
            Err(err) => {
                error!(?err, "catalog rejected product save");
                return Err(SyncError::State("Cannot save product.".to_string()));
            }
        };

        saved
            .media_entry_ids()
            .into_iter()
            .find(|id| !existing.contains(id))
            .ok_or_else(|| SyncError::State("Failed to save new media gallery entry.".to_string()))
    }
}

#[async_trait]
impl AssetHandlerStrategy for VideoStrategy {
    #[instrument(skip_all, fields(entry_id = ?entry.and_then(|e| e.id)))]
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        entry: Option<&QueueEntry>,
    ) -> Result<HandlerOutcome> {
        if let Err(err) = self.store_context.apply_scope(ctx.scope).await {
            warn!(?err, scope = ctx.scope.as_str(), "could not apply execution scope; continuing");
        }

        let Some(entry) = entry else {
            return Err(SyncError::Configuration(
                "Queue entry is required for this strategy.".to_string(),
            ));
        };

        self.store_context
            .set_current_store(entry.store_view_id)
            .await
            .map_err(|err| {
                SyncError::Configuration(format!(
                    "cannot select store view {}: {err:#}",
                    entry.store_view_id
                ))
            })?;

        let product = match self.catalog.get_by_pim_id(&entry.target_entity_id).await {
            Ok(product) => product,
            Err(err) => {
                debug!(?err, target_entity_id = %entry.target_entity_id, "target product unavailable");
                if self.checker.is_already_queued(&entry.to_product_entry()).await? {
                    info!(
                        target_entity_id = %entry.target_entity_id,
                        "product import still pending; skipping video"
                    );
                    return Ok(HandlerOutcome::skipped());
                }
                return Err(SyncError::NotYetPublished {
                    target_entity_id: entry.target_entity_id.clone(),
                });
            }
        };

        let kind = match AssetKind::from_token(&entry.type_metadata) {
            Ok(kind) => kind,
            Err(err) => {
                warn!(?err, type_metadata = %entry.type_metadata, "no video sub-kind; skipping");
                return Ok(HandlerOutcome::skipped());
            }
        };

        let url = entry.value.as_deref().unwrap_or_default();
        match kind {
            AssetKind::ProductVideo(VideoSource::Youtube) => {
                self.create_youtube_video(url, product).await
            }
            AssetKind::ProductVideo(VideoSource::Vimeo) => {
                info!(url, "vimeo videos are not supported yet; skipping");
                Ok(HandlerOutcome::skipped())
            }
            AssetKind::ProductVideo(VideoSource::Unsupported(other)) => {
                warn!(provider = %other, "unsupported video provider; skipping");
                Ok(HandlerOutcome::skipped())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_watch_id() {
        assert_eq!(
            extract_youtube_id("https://youtube.com/watch?v=abc123"),
            Some("abc123")
        );
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/watch?v=abc123&t=42"),
            Some("abc123")
        );
        assert_eq!(extract_youtube_id("https://vimeo.com/987"), None);
        assert_eq!(extract_youtube_id("https://youtube.com/watch?v="), None);
    }
}
