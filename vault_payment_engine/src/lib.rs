//! Vault Payment Engine
//!
//! The Vault Payment Engine is the order and payment reconciliation core behind the Vault shop. Two front-ends (a
//! chat bot and an anonymous web store) sell catalog items through it, and a crypto payment processor settles the
//! invoices it issues.
//!
//! The library is divided into these sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. You should never need to access
//!    the database directly. Instead, use the public API provided by the engine. The exception is the data types used
//!    in the database. These are defined in the [`db_types`] module and are public.
//! 2. The engine public API ([`mod@vpe_api`]). The [`OrderFlowApi`] (the order ledger) creates orders, cancels them,
//!    and applies payment confirmations exactly once. The [`CallbackVerifier`] authenticates processor callbacks
//!    before anything reaches the ledger.
//!    The [`CatalogApi`] serves the product list and carries admin edits to it.
//! 3. Process-wide collaborators injected into the ledger: the [`ProductCache`] and the [`ThrottleGuard`].
//! 4. The [`InvoiceProcessor`] trait, which payment processor integrations implement.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted when an order changes
//! state (created, paid, cancelled), when a buyer asks for delivery, and when a payment needs manual review. Delivery
//! of these events is fire-and-forget: a slow or broken subscriber never holds up the ledger.
mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod invoice;
pub mod product_cache;
pub mod throttle;
pub mod vpe_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{OrderManagement, ProductCatalog, StoreError, VaultStore};
pub use invoice::{Invoice, InvoiceError, InvoiceProcessor, InvoiceRequest};
pub use product_cache::{CatalogError, ProductCache, DEFAULT_PRODUCT_CACHE_TTL};
pub use throttle::{ThrottleGuard, ORDER_CREATION_LIMIT, THROTTLE_WINDOW};
pub use vpe_api::{
    callback_api::{CallbackError, CallbackVerifier, ParsedCallback, PaymentStatus, IPN_SIGNATURE_HEADER},
    catalog_api::CatalogApi,
    errors::{CatalogApiError, OrderFlowError},
    order_flow_api::{OrderFlowApi, PaymentPolicy},
    order_objects,
};
