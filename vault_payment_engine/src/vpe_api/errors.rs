use thiserror::Error;

use crate::{
    db::traits::StoreError,
    db_types::{OrderCode, OrderStatusType},
    invoice::InvoiceError,
    product_cache::CatalogError,
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Quantity must be at least 1, and small enough that the order total can be priced")]
    InvalidQuantity,
    #[error("No order matches {0}")]
    OrderNotFound(String),
    #[error("Order {0} was placed by someone else")]
    Forbidden(OrderCode),
    #[error("Order {code} is {status} and can no longer be cancelled")]
    NotCancellable { code: OrderCode, status: OrderStatusType },
    #[error("Order {code} cannot go from {from} to {to}")]
    InvalidTransition { code: OrderCode, from: OrderStatusType, to: OrderStatusType },
    #[error("Too many requests. Try again in a minute.")]
    RateLimited,
    #[error("Could not create a payment invoice. {0}")]
    PaymentInitFailed(#[from] InvoiceError),
    #[error("Invalid delivery details. {0}")]
    InvalidDeliveryDetails(String),
    #[error(transparent)]
    CatalogUnavailable(#[from] CatalogError),
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

/// Errors from the admin catalog endpoints.
#[derive(Debug, Clone, Error)]
pub enum CatalogApiError {
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Invalid product. {0}")]
    InvalidProduct(String),
    #[error(transparent)]
    CatalogUnavailable(#[from] CatalogError),
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}
