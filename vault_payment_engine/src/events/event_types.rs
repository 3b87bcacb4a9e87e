use serde::{Deserialize, Serialize};

use crate::{
    db_types::Order,
    vpe_api::order_objects::{DeliveryMethod, ReviewReason},
};

/// A new order was persisted with a processor invoice attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// A confirmation moved an order from `pending` to `paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
}

impl OrderCancelledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// The buyer of a paid order has told us where to deliver the goods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRequestedEvent {
    pub order: Order,
    pub method: DeliveryMethod,
    pub details: String,
}

impl DeliveryRequestedEvent {
    pub fn new(order: Order, method: DeliveryMethod, details: String) -> Self {
        Self { order, method, details }
    }
}

/// A payment confirmation could not be applied automatically and needs a human to look at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReviewEvent {
    pub order: Order,
    pub reason: ReviewReason,
}

impl PaymentReviewEvent {
    pub fn new(order: Order, reason: ReviewReason) -> Self {
        Self { order, reason }
    }
}
