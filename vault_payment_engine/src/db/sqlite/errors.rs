use thiserror::Error;

use crate::{db::traits::StoreError, db_types::OrderCode};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Cannot insert duplicate order {0}")]
    DuplicateOrder(OrderCode),
    #[error("Cannot attach invoice {0} to a second order")]
    DuplicateInvoice(String),
}

impl From<SqliteDatabaseError> for StoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::DuplicateOrder(code) => StoreError::DuplicateOrderCode(code),
            SqliteDatabaseError::DuplicateInvoice(id) => StoreError::DuplicateInvoice(id),
            e => StoreError::DatabaseError(e.to_string()),
        }
    }
}
