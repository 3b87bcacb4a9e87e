use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vpg_common::Amount;

use crate::db_types::{Channel, ConversionError, Order, OrderCode, OrderStatusType};

/// A buyer's request for a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub product_id: i64,
    pub quantity: u32,
    /// Opaque to the ledger. The chat id for bot orders, a browser token for web orders.
    pub requester_id: String,
    pub channel: Channel,
    /// The coin the buyer wants to pay with. If omitted, the processor lets the buyer pick on its checkout page.
    #[serde(default)]
    pub pay_currency: Option<String>,
}

impl OrderRequest {
    pub fn new<S: Into<String>>(product_id: i64, quantity: u32, requester_id: S, channel: Channel) -> Self {
        Self { product_id, quantity, requester_id: requester_id.into(), channel, pay_currency: None }
    }

    pub fn with_pay_currency<S: Into<String>>(mut self, pay_currency: S) -> Self {
        self.pay_currency = Some(pay_currency.into());
        self
    }
}

/// What a buyer needs to pay for a freshly created order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_code: OrderCode,
    pub invoice_id: String,
    pub payment_url: String,
    pub total_amount: Amount,
    pub currency: String,
    pub pay_amount: Amount,
    pub pay_currency: String,
}

impl From<&Order> for OrderCreated {
    fn from(order: &Order) -> Self {
        Self {
            order_code: order.order_code.clone(),
            invoice_id: order.invoice_id.clone(),
            payment_url: order.payment_url.clone(),
            total_amount: order.total_amount,
            currency: order.currency.clone(),
            pay_amount: order.pay_amount,
            pay_currency: order.pay_currency.clone(),
        }
    }
}

/// The public view of an order. Anyone holding the order code may see this, so it leaves out the requester id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusView {
    pub order_code: OrderCode,
    pub product_name: String,
    pub quantity: i64,
    pub total_amount: Amount,
    pub currency: String,
    pub status: OrderStatusType,
    pub payment_url: String,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<Order> for OrderStatusView {
    fn from(order: Order) -> Self {
        Self {
            order_code: order.order_code,
            product_name: order.product_name,
            quantity: order.quantity,
            total_amount: order.total_amount,
            currency: order.currency,
            status: order.status,
            payment_url: order.payment_url,
            created_at: order.created_at,
            paid_at: order.paid_at,
            delivered_at: order.delivered_at,
        }
    }
}

//--------------------------------------  Payment confirmations  -------------------------------------------------------
/// Why a confirmation was parked for a human instead of being applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ReviewReason {
    /// Less was received than expected, beyond the tolerance.
    AmountMismatch { expected: Amount, received: Amount, currency: String },
    /// The payment was in a currency that matches neither the quoted pay currency nor the order currency.
    CurrencyMismatch { expected: String, received: String },
    /// The buyer cancelled the order, then paid anyway. Any refund is handled by hand.
    PaidAfterCancel { received: Amount, currency: String },
}

impl ReviewReason {
    pub fn code(&self) -> &'static str {
        match self {
            ReviewReason::AmountMismatch { .. } => "amount_mismatch",
            ReviewReason::CurrencyMismatch { .. } => "currency_mismatch",
            ReviewReason::PaidAfterCancel { .. } => "paid_after_cancel",
        }
    }
}

impl Display for ReviewReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewReason::AmountMismatch { expected, received, currency } => {
                write!(f, "{}: expected {expected} {currency}, received {received} {currency}", self.code())
            },
            ReviewReason::CurrencyMismatch { expected, received } => {
                write!(f, "{}: expected {expected}, received {received}", self.code())
            },
            ReviewReason::PaidAfterCancel { received, currency } => {
                write!(f, "{}: received {received} {currency} for a cancelled order", self.code())
            },
        }
    }
}

/// The result of applying a payment confirmation. None of these are errors: each one is a legitimate, terminal
/// answer to "what happened to this callback".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConfirmationOutcome {
    /// The order moved from `pending` to `paid`.
    Paid { order: Order },
    /// The order had already been paid (and possibly delivered). The confirmation was a replay.
    AlreadySettled { order: Order },
    /// Nothing was transitioned. The order has been flagged and the admin notified.
    HeldForReview { order: Order, reason: ReviewReason },
}

impl ConfirmationOutcome {
    pub fn order(&self) -> &Order {
        match self {
            ConfirmationOutcome::Paid { order } => order,
            ConfirmationOutcome::AlreadySettled { order } => order,
            ConfirmationOutcome::HeldForReview { order, .. } => order,
        }
    }
}

//--------------------------------------       Delivery        ---------------------------------------------------------
/// Where the buyer wants the goods sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Telegram,
    Email,
}

impl Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMethod::Telegram => write!(f, "telegram"),
            DeliveryMethod::Email => write!(f, "email"),
        }
    }
}

impl FromStr for DeliveryMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "telegram" => Ok(Self::Telegram),
            "email" => Ok(Self::Email),
            other => Err(ConversionError::from(format!("Unknown delivery method: {other}"))),
        }
    }
}
