use std::fmt::Display;

use serde::{Deserialize, Serialize};
use vault_payment_engine::order_objects::DeliveryMethod;

pub const DEFAULT_RECENT_ORDERS: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

/// Body of `POST /orders/{code}/cancel`. Only the buyer who placed the order may cancel it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderParams {
    pub requester_id: String,
}

/// Body of `POST /orders/{code}/delivery`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryParams {
    pub method: DeliveryMethod,
    /// A Telegram handle or an email address, depending on `method`.
    pub details: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentOrdersQuery {
    pub limit: Option<u32>,
}

impl RecentOrdersQuery {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_RECENT_ORDERS)
    }
}

/// What the `/ipn` route answers once a callback has been authenticated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackAck {
    pub invoice_id: String,
    /// `paid`, `already_settled`, `held_for_review`, `ignored` or `unknown_invoice`.
    pub outcome: String,
}

impl CallbackAck {
    pub fn new<S: Into<String>>(invoice_id: &str, outcome: S) -> Self {
        Self { invoice_id: invoice_id.to_string(), outcome: outcome.into() }
    }
}
