//! Read-through cache over the product catalog.
//!
//! Both front-ends list products on nearly every interaction, so the catalog is served from an in-memory snapshot.
//! The snapshot is
//! * populated on first access,
//! * reloaded when it is older than the time-to-live, or after [`ProductCache::invalidate`] is called (the admin
//!   routes call it after every catalog edit),
//! * never modified in place. A reload builds a complete new snapshot and swaps the pointer, so a reader sees either
//!   the old list or the new one.
//!
//! If a reload fails, the previous snapshot keeps being served and the failure is only logged. The error reaches the
//! caller only when there has never been a snapshot to fall back on.
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use thiserror::Error;
use tokio::{
    sync::{Mutex, RwLock},
    time::Instant,
};

use crate::{db::traits::ProductCatalog, db_types::Product};

pub const DEFAULT_PRODUCT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("The product catalog is unavailable. {0}")]
    CatalogUnavailable(String),
}

#[derive(Debug)]
struct Snapshot {
    products: Arc<Vec<Product>>,
    loaded_at: Instant,
    generation: u64,
}

pub struct ProductCache<C> {
    catalog: C,
    ttl: Duration,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    reload_lock: Mutex<()>,
    // Bumped by `invalidate`. A snapshot loaded under an older generation is stale.
    generation: AtomicU64,
}

impl<C> std::fmt::Debug for ProductCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProductCache (ttl: {:?})", self.ttl)
    }
}

impl<C> ProductCache<C>
where C: ProductCatalog
{
    pub fn new(catalog: C, ttl: Duration) -> Self {
        Self { catalog, ttl, snapshot: RwLock::new(None), reload_lock: Mutex::new(()), generation: AtomicU64::new(0) }
    }

    /// The full product list.
    pub async fn get_products(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        if let Some(snapshot) = self.fresh_snapshot().await {
            return Ok(Arc::clone(&snapshot.products));
        }
        let _reloading = self.reload_lock.lock().await;
        // Another caller may have finished a reload while we waited for the lock
        if let Some(snapshot) = self.fresh_snapshot().await {
            return Ok(Arc::clone(&snapshot.products));
        }
        // Read the generation before loading, so an invalidation that lands mid-load leaves this snapshot stale
        let generation = self.generation.load(Ordering::SeqCst);
        match self.catalog.fetch_products().await {
            Ok(products) => {
                debug!("🛒️ Product catalog reloaded. {} products", products.len());
                let snapshot =
                    Arc::new(Snapshot { products: Arc::new(products), loaded_at: Instant::now(), generation });
                let products = Arc::clone(&snapshot.products);
                *self.snapshot.write().await = Some(snapshot);
                Ok(products)
            },
            Err(e) => match self.snapshot.read().await.as_ref() {
                Some(stale) => {
                    warn!("🛒️ Could not reload the product catalog. Serving the previous snapshot. {e}");
                    Ok(Arc::clone(&stale.products))
                },
                None => {
                    error!("🛒️ Could not load the product catalog, and there is no snapshot to fall back on. {e}");
                    Err(CatalogError::CatalogUnavailable(e.to_string()))
                },
            },
        }
    }

    /// Looks a single product up in the current snapshot. The same freshness rules as [`Self::get_products`] apply.
    pub async fn get_product(&self, id: i64) -> Result<Option<Product>, CatalogError> {
        let products = self.get_products().await?;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    /// Forces the next read to reload from the catalog.
    pub fn invalidate(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("🛒️ Product cache invalidated (generation {generation})");
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn fresh_snapshot(&self) -> Option<Arc<Snapshot>> {
        let guard = self.snapshot.read().await;
        let snapshot = guard.as_ref()?;
        let current_generation = self.generation.load(Ordering::SeqCst);
        let fresh = snapshot.generation == current_generation && snapshot.loaded_at.elapsed() < self.ttl;
        fresh.then(|| Arc::clone(snapshot))
    }
}
