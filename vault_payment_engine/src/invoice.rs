//! The seam between the order ledger and the payment processor.
//!
//! The ledger asks an [`InvoiceProcessor`] for an invoice before it persists an order. Integrations (NOWPayments in
//! the server) implement the trait; tests substitute fakes.
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vpg_common::Amount;

use crate::db_types::OrderCode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRequest {
    /// Doubles as the idempotency token. A retried request for the same order carries the same code, so the
    /// processor will not open a second invoice.
    pub order_code: OrderCode,
    pub amount: Amount,
    pub currency: String,
    /// The coin the buyer wants to pay with, if they picked one.
    pub pay_currency: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: String,
    /// A pay address or a hosted-checkout URL.
    pub payment_url: String,
    pub expected_amount: Amount,
    pub expected_currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceError {
    /// Network failure, timeout, or a 5xx from the processor. Worth retrying with the same order code.
    #[error("The payment processor is unavailable. {0}")]
    ProcessorUnavailable(String),
    /// The processor refused the request (4xx). Retrying will not help.
    #[error("The payment processor rejected the invoice request. {0}")]
    Rejected(String),
}

impl InvoiceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ProcessorUnavailable(_))
    }
}

#[allow(async_fn_in_trait)]
pub trait InvoiceProcessor {
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, InvoiceError>;
}
