use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use vpg_common::Amount;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

impl From<String> for ConversionError {
    fn from(value: String) -> Self {
        Self(value)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The order lifecycle.
///
/// ```text
///   Pending ──► Paid ──► Delivered
///      │
///      └──────► Cancelled
/// ```
/// `Delivered` and `Cancelled` are terminal. Nothing ever moves back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been created and an invoice issued, but no payment has been confirmed.
    Pending,
    /// The processor confirmed a payment that covers the order total.
    Paid,
    /// An admin has delivered the goods.
    Delivered,
    /// The buyer cancelled the order before paying.
    Cancelled,
}

impl OrderStatusType {
    /// True for states in which a payment has been received.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Paid | Self::Delivered)
    }

    /// The edges of the state machine. A state never transitions to itself.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!((self, next), (Pending, Paid) | (Pending, Cancelled) | (Paid, Delivered))
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Paid => write!(f, "paid"),
            OrderStatusType::Delivered => write!(f, "delivered"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------       Channel         ---------------------------------------------------------
/// The front-end an order came in through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// The chat bot. The requester id is the buyer's chat id, so the buyer can be messaged directly.
    Bot,
    /// The anonymous web store. The requester id is a token generated by the browser.
    Web,
}

impl Channel {
    /// The first character of order codes issued for this channel.
    pub fn code_prefix(&self) -> char {
        match self {
            Channel::Bot => 'B',
            Channel::Web => 'W',
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Bot => write!(f, "bot"),
            Channel::Web => write!(f, "web"),
        }
    }
}

impl FromStr for Channel {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bot" | "telegram" => Ok(Self::Bot),
            "web" => Ok(Self::Web),
            s => Err(ConversionError(format!("Invalid channel: {s}"))),
        }
    }
}

//--------------------------------------       OrderCode       ---------------------------------------------------------
/// The externally visible order identifier. Possession of the code is all that is needed to look an order up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderCode(pub String);

impl FromStr for OrderCode {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("Order code cannot be empty".into()));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }
}

impl From<String> for OrderCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_code: OrderCode,
    pub product_id: i64,
    /// The product name at the time the order was placed.
    pub product_name: String,
    pub quantity: i64,
    /// Unit price × quantity, fixed when the order was created.
    #[sqlx(try_from = "String")]
    pub total_amount: Amount,
    pub currency: String,
    pub requester_id: String,
    pub channel: Channel,
    pub status: OrderStatusType,
    /// The processor's invoice id. Set once, at creation, and never replaced.
    pub invoice_id: String,
    pub payment_url: String,
    /// What the processor told us it expects to receive, in `pay_currency`.
    #[sqlx(try_from = "String")]
    pub pay_amount: Amount,
    pub pay_currency: String,
    /// Set when a payment for this order was held for manual review.
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_code: OrderCode,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: u32,
    pub total_amount: Amount,
    pub currency: String,
    pub requester_id: String,
    pub channel: Channel,
    pub invoice_id: String,
    pub payment_url: String,
    pub pay_amount: Amount,
    pub pay_currency: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Product        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub price: Amount,
    pub currency: String,
    pub description: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Amount,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn default_currency() -> String {
    vpg_common::DEFAULT_PRICE_CURRENCY.to_string()
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, price: Amount) -> Self {
        Self { name: name.into(), price, currency: default_currency(), description: String::new(), image_url: None }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }
}

/// An admin edit to a product. Only the fields that are `Some` are changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Amount>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl ProductUpdate {
    pub fn with_price(mut self, price: Amount) -> Self {
        self.price = Some(price);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none() && self.description.is_none() && self.image_url.is_none()
    }
}
