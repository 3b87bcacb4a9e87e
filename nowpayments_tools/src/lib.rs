//! A client for the parts of the NOWPayments REST API the Vault gateway uses: creating invoices and checking that
//! the API is up.
//!
//! The crate knows nothing about orders or the ledger. The server adapts it to the engine's `InvoiceProcessor`.
mod api;
mod config;
mod error;
mod helpers;

mod data_objects;

pub use api::NowPaymentsApi;
pub use config::NowPaymentsConfig;
pub use data_objects::{ApiStatus, InvoiceResponse, NewInvoice};
pub use error::NowPaymentsApiError;
