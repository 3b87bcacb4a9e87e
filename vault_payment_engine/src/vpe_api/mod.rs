//! # Vault payment engine public API
//!
//! * [`order_flow_api`] is the order ledger. It creates orders against the processor, cancels them, applies payment
//!   confirmations and gates delivery. It is the only writer of order records.
//! * [`catalog_api`] serves the product list through the [`ProductCache`](crate::ProductCache) and carries admin edits
//!   to the catalog, invalidating the cache as it goes.
//! * [`callback_api`] authenticates and parses processor callbacks. Nothing from a callback reaches the ledger without
//!   passing through it.
//!
//! Every API is created from a database backend implementing the backend traits it needs:
//!
//! ```rust,ignore
//! let db = SqliteDatabase::new_with_url(url, 5).await?;
//! let cache = Arc::new(ProductCache::new(db.clone(), DEFAULT_PRODUCT_CACHE_TTL));
//! let api = OrderFlowApi::new(db, cache, Arc::new(ThrottleGuard::default()), processor, producers);
//! let created = api.create_order(request).await?;
//! ```
pub mod callback_api;
pub mod catalog_api;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
