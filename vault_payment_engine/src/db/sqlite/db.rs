use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{db_url, new_pool, orders, products, SqliteDatabaseError};
use crate::{
    db::traits::{OrderManagement, ProductCatalog, StoreError},
    db_types::{NewOrder, NewProduct, Order, OrderCode, OrderStatusType, Product, ProductUpdate},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let order = orders::insert_order(order, &mut conn).await?;
        debug!("🗃️ Order {} has been saved in the DB with id {}", order.order_code, order.id);
        Ok(order)
    }

    async fn order_code_exists(&self, code: &OrderCode) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::order_exists(code, &mut conn).await?)
    }

    async fn fetch_order_by_code(&self, code: &OrderCode) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::fetch_order_by_code(code, &mut conn).await?)
    }

    async fn fetch_order_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::fetch_order_by_invoice_id(invoice_id, &mut conn).await?)
    }

    async fn fetch_recent_orders(&self, limit: u32) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::fetch_recent_orders(limit, &mut conn).await?)
    }

    async fn transition_status(
        &self,
        code: &OrderCode,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        trace!("🗃️ Order {code}: attempting {from} -> {to}");
        Ok(orders::transition_status(code, from, to, &mut conn).await?)
    }

    async fn flag_for_review(&self, code: &OrderCode, note: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::set_review_note(code, note, &mut conn).await?)
    }
}

impl ProductCatalog for SqliteDatabase {
    async fn fetch_products(&self) -> Result<Vec<Product>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(products::fetch_products(&mut conn).await?)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(products::insert_product(product, &mut conn).await?)
    }

    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Option<Product>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        trace!("🗃️ Product #{id} updating with new values: {update:?}");
        Ok(products::update_product(id, update, &mut conn).await?)
    }

    async fn delete_product(&self, id: i64) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let deleted = products::delete_product(id, &mut conn).await?;
        debug!("🗃️ Product #{id} delete request. Deleted: {deleted}");
        Ok(deleted)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `VPG_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every startup.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) {
        self.pool.close().await;
    }
}
