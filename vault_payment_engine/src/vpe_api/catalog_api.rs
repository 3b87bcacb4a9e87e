use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    db::traits::ProductCatalog,
    db_types::{NewProduct, Product, ProductUpdate},
    product_cache::ProductCache,
    vpe_api::errors::CatalogApiError,
};

/// Reads go through the [`ProductCache`]. Writes go to the store and then invalidate the cache, so an edit made here
/// is visible to the very next read.
pub struct CatalogApi<B> {
    db: B,
    cache: Arc<ProductCache<B>>,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B>
where B: ProductCatalog
{
    pub fn new(db: B, cache: Arc<ProductCache<B>>) -> Self {
        Self { db, cache }
    }

    pub async fn products(&self) -> Result<Arc<Vec<Product>>, CatalogApiError> {
        Ok(self.cache.get_products().await?)
    }

    pub async fn product(&self, id: i64) -> Result<Product, CatalogApiError> {
        self.cache.get_product(id).await?.ok_or(CatalogApiError::ProductNotFound(id))
    }

    pub async fn add_product(&self, product: NewProduct) -> Result<Product, CatalogApiError> {
        if product.name.trim().is_empty() {
            return Err(CatalogApiError::InvalidProduct("A product needs a name".into()));
        }
        if !product.price.is_positive() {
            return Err(CatalogApiError::InvalidProduct(format!("Price must be positive, not {}", product.price)));
        }
        let product = self.db.insert_product(product).await?;
        self.cache.invalidate();
        info!("🛒️ Product #{} ({}) added to the catalog", product.id, product.name);
        Ok(product)
    }

    pub async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Product, CatalogApiError> {
        if update.price.is_some_and(|p| !p.is_positive()) {
            return Err(CatalogApiError::InvalidProduct("Price must be positive".into()));
        }
        if update.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
            return Err(CatalogApiError::InvalidProduct("A product needs a name".into()));
        }
        let product = self.db.update_product(id, update).await?.ok_or(CatalogApiError::ProductNotFound(id))?;
        self.cache.invalidate();
        info!("🛒️ Product #{id} updated");
        Ok(product)
    }

    /// Removes a product from the catalog. Existing orders keep the product name and price they were placed with.
    pub async fn remove_product(&self, id: i64) -> Result<(), CatalogApiError> {
        if !self.db.delete_product(id).await? {
            return Err(CatalogApiError::ProductNotFound(id));
        }
        self.cache.invalidate();
        info!("🛒️ Product #{id} removed from the catalog");
        Ok(())
    }
}
