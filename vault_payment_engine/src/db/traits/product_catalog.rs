use crate::{
    db::traits::StoreError,
    db_types::{NewProduct, Product, ProductUpdate},
};

/// The authoritative product store.
///
/// Reads go through the [`crate::ProductCache`]; writes come from the admin panel. Orders copy the price they need at
/// creation time, so editing or deleting a product never touches existing orders.
#[allow(async_fn_in_trait)]
pub trait ProductCatalog: Clone {
    async fn fetch_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Returns the updated product, or `None` if there is no product with the given id.
    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Option<Product>, StoreError>;

    /// Returns `true` if a product was deleted.
    async fn delete_product(&self, id: i64) -> Result<bool, StoreError>;
}
