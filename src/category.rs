use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::catalog::{CategoryLinkManagement, CategoryRepository};
use crate::model::{PimProduct, Product};

/// Reassigns a saved product's category links from its PIM descriptor.
///
/// Position caches of every target category are invalidated before the bulk
/// assignment, which otherwise reads stale ordering.
pub struct CategoryLinkListener {
    categories: Arc<dyn CategoryRepository>,
    links: Arc<dyn CategoryLinkManagement>,
}

impl CategoryLinkListener {
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        links: Arc<dyn CategoryLinkManagement>,
    ) -> Self {
        Self { categories, links }
    }

    #[instrument(skip_all, fields(sku = %product.sku))]
    pub async fn on_product_save(
        &self,
        product: &mut Product,
        pim_product: &PimProduct,
    ) -> Result<()> {
        let category_ids = pim_product.category_ids();

        for category_id in &category_ids {
            self.categories
                .invalidate_products_position(*category_id)
                .await
                .with_context(|| format!("failed to reset position cache of category {category_id}"))?;
        }

        self.links
            .assign_product_to_categories(&product.sku, &category_ids)
            .await
            .with_context(|| format!("failed to assign {} to categories", product.sku))?;

        debug!(?category_ids, "category links assigned");
        product.category_ids = category_ids;
        Ok(())
    }
}
