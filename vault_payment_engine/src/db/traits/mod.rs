//! #  Database management and control.
//!
//! This module provides the interfaces that define the contracts of the payment engine database *backends*.
//!
//! * [`OrderManagement`] is the order store. The order ledger is its only writer. Every status change goes through
//!   [`OrderManagement::transition_status`], a compare-and-set on the current status, so that several workers (or
//!   several processes) sharing one database can never apply two transitions for the same event.
//! * [`ProductCatalog`] is the authoritative product store. Admin routes write to it, and the product cache reads
//!   from it.
mod errors;
mod order_management;
mod product_catalog;

pub use errors::StoreError;
pub use order_management::OrderManagement;
pub use product_catalog::ProductCatalog;

/// Everything the order ledger and the catalog need from a single backend.
pub trait VaultStore: OrderManagement + ProductCatalog {}

impl<T> VaultStore for T where T: OrderManagement + ProductCatalog {}
