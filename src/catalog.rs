//! Boundary traits for the catalog platform. The pipeline only ever talks to
//! the catalog through these; persistence and transport live behind them.

use anyhow::Result;
use async_trait::async_trait;

use crate::error::CatalogError;
use crate::model::Product;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Fails with `CatalogError::NotFound` while the product has not been
    /// published to the catalog yet.
    async fn get_by_pim_id(&self, pim_id: &str) -> std::result::Result<Product, CatalogError>;

    async fn save(&self, product: Product) -> std::result::Result<Product, CatalogError>;
}

/// Privilege scope a pipeline operation runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionScope {
    #[default]
    Admin,
}

impl ExecutionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionScope::Admin => "admin",
        }
    }
}

/// Explicit execution context threaded through handler calls.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub scope: ExecutionScope,
}

impl ExecutionContext {
    pub fn admin() -> Self {
        Self {
            scope: ExecutionScope::Admin,
        }
    }
}

#[async_trait]
pub trait StoreContext: Send + Sync {
    async fn apply_scope(&self, scope: ExecutionScope) -> Result<()>;

    async fn set_current_store(&self, store_view_id: i64) -> Result<()>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Drop the cached product-position data held for `category_id`.
    async fn invalidate_products_position(&self, category_id: i64) -> Result<()>;
}

#[async_trait]
pub trait CategoryLinkManagement: Send + Sync {
    async fn assign_product_to_categories(&self, sku: &str, category_ids: &[i64]) -> Result<()>;
}
