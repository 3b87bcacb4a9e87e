use thiserror::Error;

use crate::db_types::OrderCode;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("An order with code {0} already exists")]
    DuplicateOrderCode(OrderCode),
    #[error("Invoice {0} is already attached to another order")]
    DuplicateInvoice(String),
}
