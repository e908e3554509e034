use futures::future::join_all;
use serde_json::json;

use pim_asset_sync::db::{self, QueueCriteria, QueueStore};
use pim_asset_sync::model::{
    MediaGalleryEntry, PimProduct, Product, QueueAction, QueueKind, QueueStatus, VideoContent,
    MEDIA_TYPE_EXTERNAL_VIDEO, MEDIA_TYPE_IMAGE,
};
use pim_asset_sync::reconcile::VideoModifier;

async fn setup_store() -> QueueStore {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    QueueStore::new(pool)
}

async fn all_entries(store: &QueueStore) -> Vec<pim_asset_sync::model::QueueEntry> {
    store.find(&QueueCriteria::default()).await.unwrap()
}

fn image_entry(id: i64) -> MediaGalleryEntry {
    MediaGalleryEntry {
        id: Some(id),
        media_type: MEDIA_TYPE_IMAGE.into(),
        label: None,
        disabled: false,
        types: vec!["image".into()],
        content: None,
        video_content: None,
    }
}

fn video_entry(id: i64, url: &str) -> MediaGalleryEntry {
    MediaGalleryEntry {
        id: Some(id),
        media_type: MEDIA_TYPE_EXTERNAL_VIDEO.into(),
        label: Some("clip".into()),
        disabled: false,
        types: vec![],
        content: None,
        video_content: Some(VideoContent {
            media_type: MEDIA_TYPE_EXTERNAL_VIDEO.into(),
            video_provider: "youtube".into(),
            video_url: url.into(),
            video_title: "clip".into(),
            video_description: String::new(),
            video_metadata: None,
        }),
    }
}

fn product(entries: Vec<MediaGalleryEntry>) -> Product {
    Product {
        id: Some(7),
        sku: "SKU-7".into(),
        store_id: 3,
        category_ids: vec![],
        media_gallery_entries: entries,
    }
}

fn pim(video: serde_json::Value) -> PimProduct {
    PimProduct::from_value(json!({ "pimcore_id": "pim-7", "video": video }))
}

#[tokio::test]
async fn new_video_is_queued_once() {
    let store = setup_store().await;
    let modifier = VideoModifier::new(store.clone());
    let desired = pim(json!({ "format": "youtube", "link": "abc123" }));

    let (out, _) = modifier
        .handle(product(vec![image_entry(1)]), desired.clone())
        .await
        .unwrap();
    assert_eq!(out.media_gallery_entries.len(), 1);

    let entries = all_entries(&store).await;
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.kind, QueueKind::Asset);
    assert_eq!(entry.action, QueueAction::InsertUpdate);
    assert_eq!(entry.status, QueueStatus::Pending);
    assert_eq!(entry.store_view_id, 3);
    assert_eq!(entry.target_entity_id, "pim-7");
    assert_eq!(entry.type_metadata, "catalog_product:video_youtube");
    assert_eq!(
        entry.value.as_deref(),
        Some("https://youtube.com/watch?v=abc123")
    );

    // Second pass over the same state adds nothing.
    modifier
        .handle(product(vec![image_entry(1)]), desired)
        .await
        .unwrap();
    assert_eq!(all_entries(&store).await.len(), 1);
}

#[tokio::test]
async fn vimeo_video_is_queued_with_vimeo_type() {
    let store = setup_store().await;
    let modifier = VideoModifier::new(store.clone());
    modifier
        .handle(
            product(vec![]),
            pim(json!({ "format": "vimeo", "link": "987" })),
        )
        .await
        .unwrap();

    let entries = all_entries(&store).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].type_metadata, "catalog_product:video_vimeo");
    assert_eq!(entries[0].value.as_deref(), Some("https://vimeo.com/987"));
}

#[tokio::test]
async fn present_video_is_left_alone() {
    let store = setup_store().await;
    let modifier = VideoModifier::new(store.clone());
    let current = product(vec![
        image_entry(1),
        video_entry(2, "https://youtube.com/watch?v=abc123"),
    ]);

    let (out, _) = modifier
        .handle(
            current.clone(),
            pim(json!({ "format": "youtube", "link": "abc123" })),
        )
        .await
        .unwrap();
    assert_eq!(out, current);
    assert!(all_entries(&store).await.is_empty());
}

#[tokio::test]
async fn absent_video_removes_external_videos_only() {
    let store = setup_store().await;
    let modifier = VideoModifier::new(store.clone());

    for video in [json!({}), json!(null)] {
        let (out, _) = modifier
            .handle(
                product(vec![
                    image_entry(1),
                    video_entry(2, "https://youtube.com/watch?v=old"),
                ]),
                pim(video),
            )
            .await
            .unwrap();
        assert_eq!(out.media_gallery_entries, vec![image_entry(1)]);
    }

    let (out, _) = modifier
        .handle(
            product(vec![video_entry(2, "https://youtube.com/watch?v=old")]),
            PimProduct::from_value(json!({ "pimcore_id": "pim-7" })),
        )
        .await
        .unwrap();
    assert!(out.media_gallery_entries.is_empty());
    assert!(all_entries(&store).await.is_empty());
}

#[tokio::test]
async fn unsupported_format_changes_nothing() {
    let store = setup_store().await;
    let modifier = VideoModifier::new(store.clone());
    let current = product(vec![video_entry(2, "https://youtube.com/watch?v=old")]);

    let (out, pim_out) = modifier
        .handle(
            current.clone(),
            pim(json!({ "format": "dailymotion", "link": "x1" })),
        )
        .await
        .unwrap();
    assert_eq!(out, current);
    assert_eq!(pim_out.pimcore_id().as_deref(), Some("pim-7"));
    assert!(all_entries(&store).await.is_empty());
}

#[tokio::test]
async fn malformed_video_field_keeps_existing_videos() {
    let store = setup_store().await;
    let modifier = VideoModifier::new(store.clone());
    let current = product(vec![
        image_entry(1),
        video_entry(2, "https://youtube.com/watch?v=old"),
    ]);

    for video in [json!("abc"), json!(42), json!(["youtube", "abc"])] {
        let (out, _) = modifier
            .handle(current.clone(), pim(video.clone()))
            .await
            .unwrap();
        assert_eq!(out, current, "{video}");
    }
    assert!(all_entries(&store).await.is_empty());
}

#[tokio::test]
async fn missing_pimcore_id_does_not_queue() {
    let store = setup_store().await;
    let modifier = VideoModifier::new(store.clone());
    modifier
        .handle(
            product(vec![]),
            PimProduct::from_value(json!({ "video": { "format": "youtube", "link": "abc" } })),
        )
        .await
        .unwrap();
    assert!(all_entries(&store).await.is_empty());
}

#[tokio::test]
async fn finished_entry_does_not_block_requeue() {
    let store = setup_store().await;
    let modifier = VideoModifier::new(store.clone());
    let desired = pim(json!({ "format": "youtube", "link": "abc123" }));

    modifier
        .handle(product(vec![]), desired.clone())
        .await
        .unwrap();
    let claimed = store
        .claim_next(QueueKind::Asset, "worker-1")
        .await
        .unwrap()
        .unwrap();
    assert!(store
        .complete(claimed.id.unwrap(), QueueStatus::Error, None, Some("boom"))
        .await
        .unwrap());

    modifier.handle(product(vec![]), desired).await.unwrap();
    let active = store
        .find(&QueueCriteria::with_status(QueueStatus::Pending))
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(all_entries(&store).await.len(), 2);
}

#[tokio::test]
async fn concurrent_passes_queue_a_single_entry() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("queue.db").display());
    let pool = db::init_pool(&url).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    let store = QueueStore::new(pool);

    let desired = pim(json!({ "format": "youtube", "link": "abc123" }));
    let passes = (0..8).map(|_| {
        let modifier = VideoModifier::new(store.clone());
        let desired = desired.clone();
        async move { modifier.handle(product(vec![]), desired).await }
    });
    for result in join_all(passes).await {
        result.unwrap();
    }

    let active = store
        .find(&QueueCriteria::active_duplicates_of(
            QueueKind::Asset,
            "pim-7",
            "catalog_product:video_youtube",
            QueueAction::InsertUpdate,
        ))
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
}
