use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vpg_common::Amount;

use crate::helpers::{amount_as_number, amount_from_any, string_or_number};

/// The body of `POST /v1/invoice`.
#[derive(Debug, Clone, Serialize)]
pub struct NewInvoice {
    #[serde(serialize_with = "amount_as_number")]
    pub price_amount: Amount,
    pub price_currency: String,
    /// Our order code. NOWPayments echoes it back in every callback.
    pub order_id: String,
    pub order_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipn_callback_url: Option<String>,
}

impl NewInvoice {
    pub fn new<S: Into<String>>(order_id: S, price_amount: Amount, price_currency: &str) -> Self {
        Self {
            price_amount,
            price_currency: price_currency.to_lowercase(),
            order_id: order_id.into(),
            order_description: String::new(),
            pay_currency: None,
            ipn_callback_url: None,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.order_description = description.into();
        self
    }

    pub fn with_pay_currency(mut self, pay_currency: Option<&str>) -> Self {
        self.pay_currency = pay_currency.map(str::to_lowercase);
        self
    }

    pub fn with_callback_url(mut self, url: Option<&str>) -> Self {
        self.ipn_callback_url = url.map(String::from);
        self
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceResponse {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(deserialize_with = "amount_from_any")]
    pub price_amount: Amount,
    pub price_currency: String,
    #[serde(default)]
    pub pay_currency: Option<String>,
    pub invoice_url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// `GET /v1/status`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiStatus {
    pub message: String,
}

impl ApiStatus {
    pub fn is_ok(&self) -> bool {
        self.message.eq_ignore_ascii_case("ok")
    }
}
