use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

use pim_asset_sync::catalog::{CategoryLinkManagement, CategoryRepository};
use pim_asset_sync::category::CategoryLinkListener;
use pim_asset_sync::model::{PimProduct, Product};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Invalidate(i64),
    Assign(String, Vec<i64>),
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Call>>,
    fail_invalidate: Option<i64>,
}

#[async_trait]
impl CategoryRepository for Recorder {
    async fn invalidate_products_position(&self, category_id: i64) -> Result<()> {
        if self.fail_invalidate == Some(category_id) {
            return Err(anyhow!("category {category_id} not found"));
        }
        self.calls.lock().await.push(Call::Invalidate(category_id));
        Ok(())
    }
}

#[async_trait]
impl CategoryLinkManagement for Recorder {
    async fn assign_product_to_categories(&self, sku: &str, category_ids: &[i64]) -> Result<()> {
        self.calls
            .lock()
            .await
            .push(Call::Assign(sku.to_string(), category_ids.to_vec()));
        Ok(())
    }
}

fn product() -> Product {
    Product {
        id: Some(7),
        sku: "SKU-7".into(),
        store_id: 1,
        category_ids: vec![1],
        media_gallery_entries: vec![],
    }
}

#[tokio::test]
async fn caches_are_invalidated_before_assignment() {
    let recorder = Arc::new(Recorder::default());
    let listener = CategoryLinkListener::new(recorder.clone(), recorder.clone());
    let pim = PimProduct::from_value(json!({ "category_ids": [5, 9] }));

    let mut product = product();
    listener.on_product_save(&mut product, &pim).await.unwrap();

    assert_eq!(
        *recorder.calls.lock().await,
        vec![
            Call::Invalidate(5),
            Call::Invalidate(9),
            Call::Assign("SKU-7".into(), vec![5, 9]),
        ]
    );
    assert_eq!(product.category_ids, vec![5, 9]);
}

#[tokio::test]
async fn empty_category_list_still_assigns() {
    let recorder = Arc::new(Recorder::default());
    let listener = CategoryLinkListener::new(recorder.clone(), recorder.clone());

    let mut product = product();
    listener
        .on_product_save(&mut product, &PimProduct::default())
        .await
        .unwrap();

    assert_eq!(
        *recorder.calls.lock().await,
        vec![Call::Assign("SKU-7".into(), vec![])]
    );
    assert!(product.category_ids.is_empty());
}

#[tokio::test]
async fn invalidation_failure_stops_before_assignment() {
    let recorder = Arc::new(Recorder {
        fail_invalidate: Some(9),
        ..Default::default()
    });
    let listener = CategoryLinkListener::new(recorder.clone(), recorder.clone());
    let pim = PimProduct::from_value(json!({ "category_ids": [5, 9] }));

    let mut product = product();
    let err = listener.on_product_save(&mut product, &pim).await.unwrap_err();
    assert!(format!("{err:#}").contains("category 9"));
    assert_eq!(*recorder.calls.lock().await, vec![Call::Invalidate(5)]);
    assert_eq!(product.category_ids, vec![1]);
}

#[tokio::test]
async fn non_integer_category_ids_are_not_assigned() {
    let recorder = Arc::new(Recorder::default());
    let listener = CategoryLinkListener::new(recorder.clone(), recorder.clone());
    let pim = PimProduct::from_value(json!({ "category_ids": [5, null, "x", "9"] }));

    let mut product = product();
    listener.on_product_save(&mut product, &pim).await.unwrap();

    assert_eq!(
        *recorder.calls.lock().await,
        vec![
            Call::Invalidate(5),
            Call::Invalidate(9),
            Call::Assign("SKU-7".into(), vec![5, 9]),
        ]
    );
}
