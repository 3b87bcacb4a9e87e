use std::{fmt::Debug, sync::Arc, time::Duration};

use chrono::Utc;
use log::*;
use rust_decimal::Decimal;
use vpg_common::Amount;

use crate::{
    db::traits::{OrderManagement, ProductCatalog, StoreError},
    db_types::{NewOrder, Order, OrderCode, OrderStatusType},
    events::{
        DeliveryRequestedEvent,
        EventProducers,
        OrderCancelledEvent,
        OrderCreatedEvent,
        OrderPaidEvent,
        PaymentReviewEvent,
    },
    helpers::generate_order_code,
    invoice::{Invoice, InvoiceError, InvoiceProcessor, InvoiceRequest},
    product_cache::ProductCache,
    throttle::ThrottleGuard,
    vpe_api::{
        errors::OrderFlowError,
        order_objects::{
            ConfirmationOutcome,
            DeliveryMethod,
            OrderCreated,
            OrderRequest,
            OrderStatusView,
            ReviewReason,
        },
    },
};

const MAX_CODE_ATTEMPTS: usize = 5;
pub const MAX_RECENT_ORDERS: u32 = 500;

/// Knobs for how the ledger deals with money and with the processor.
#[derive(Debug, Clone, Copy)]
pub struct PaymentPolicy {
    /// Largest accepted shortfall, as a fraction of the expected amount.
    pub tolerance: Decimal,
    /// Upper bound on a single invoice request.
    pub invoice_timeout: Duration,
    /// Total invoice requests per order, including the first one.
    pub invoice_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for PaymentPolicy {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(5, 3),
            invoice_timeout: Duration::from_secs(20),
            invoice_attempts: 3,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

/// `OrderFlowApi` is the order ledger.
///
/// It is the only component that writes order records, and every status change it makes is a compare-and-set against
/// the store. When two actors race for the same order (a buyer cancelling while the processor's callback arrives),
/// exactly one write lands and the loser is told so. Nothing is retried blindly.
pub struct OrderFlowApi<B, P> {
    db: B,
    products: Arc<ProductCache<B>>,
    throttle: Arc<ThrottleGuard>,
    processor: P,
    producers: EventProducers,
    policy: PaymentPolicy,
}

impl<B, P> Debug for OrderFlowApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.policy)
    }
}

impl<B, P> OrderFlowApi<B, P> {
    pub fn new(
        db: B,
        products: Arc<ProductCache<B>>,
        throttle: Arc<ThrottleGuard>,
        processor: P,
        producers: EventProducers,
    ) -> Self {
        Self { db, products, throttle, processor, producers, policy: PaymentPolicy::default() }
    }

    pub fn with_policy(mut self, policy: PaymentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &PaymentPolicy {
        &self.policy
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, P> OrderFlowApi<B, P>
where
    B: OrderManagement + ProductCatalog,
    P: InvoiceProcessor,
{
    /// Creates an order and its processor invoice.
    ///
    /// The order is only persisted once the processor has issued an invoice. If invoicing fails, nothing is written
    /// and the caller gets [`OrderFlowError::PaymentInitFailed`].
    pub async fn create_order(&self, request: OrderRequest) -> Result<OrderCreated, OrderFlowError> {
        if !self.throttle.allow(&request.requester_id) {
            info!("🔄️📦️ Order request from {} was rate limited", request.requester_id);
            return Err(OrderFlowError::RateLimited);
        }
        if request.quantity == 0 {
            return Err(OrderFlowError::InvalidQuantity);
        }
        let product = self
            .products
            .get_product(request.product_id)
            .await?
            .ok_or(OrderFlowError::ProductNotFound(request.product_id))?;
        let total_amount = product.price.checked_mul(request.quantity).ok_or_else(|| {
            info!("🔄️📦️ {} x product #{} overflows the order total", request.quantity, product.id);
            OrderFlowError::InvalidQuantity
        })?;
        let now = Utc::now();
        let order_code = self.unused_order_code(&request, now).await?;
        let invoice_request = InvoiceRequest {
            order_code: order_code.clone(),
            amount: total_amount,
            currency: product.currency.clone(),
            pay_currency: request.pay_currency.clone(),
            description: format!("{} x {}", request.quantity, product.name),
        };
        let invoice = self.request_invoice(&invoice_request).await?;
        let new_order = NewOrder {
            order_code,
            product_id: product.id,
            product_name: product.name,
            quantity: request.quantity,
            total_amount,
            currency: product.currency,
            requester_id: request.requester_id,
            channel: request.channel,
            invoice_id: invoice.invoice_id,
            payment_url: invoice.payment_url,
            pay_amount: invoice.expected_amount,
            pay_currency: invoice.expected_currency,
            created_at: now,
        };
        let invoice_id = new_order.invoice_id.clone();
        let order = self.db.insert_order(new_order).await.map_err(|e| {
            error!(
                "🔄️📦️ Invoice {invoice_id} was issued for order {}, but the order could not be saved. The invoice \
                 must be reconciled by hand. {e}",
                invoice_request.order_code
            );
            e
        })?;
        info!(
            "🔄️📦️ Order {} created for {} {} (invoice {})",
            order.order_code, order.total_amount, order.currency, order.invoice_id
        );
        let created = OrderCreated::from(&order);
        self.producers.publish_order_created(OrderCreatedEvent::new(order));
        Ok(created)
    }

    async fn unused_order_code(
        &self,
        request: &OrderRequest,
        now: chrono::DateTime<Utc>,
    ) -> Result<OrderCode, OrderFlowError> {
        let mut code = generate_order_code(request.channel, now);
        for _ in 1..MAX_CODE_ATTEMPTS {
            if !self.db.order_code_exists(&code).await? {
                return Ok(code);
            }
            warn!("🔄️📦️ Order code {code} is already taken. Generating another one.");
            code = generate_order_code(request.channel, now);
        }
        if self.db.order_code_exists(&code).await? {
            error!("🔄️📦️ Could not find a free order code after {MAX_CODE_ATTEMPTS} attempts");
            return Err(StoreError::DuplicateOrderCode(code).into());
        }
        Ok(code)
    }

    /// Asks the processor for an invoice, retrying transient failures with the same order code. The processor
    /// deduplicates on the order code, so a retry after a lost response does not open a second invoice.
    async fn request_invoice(&self, request: &InvoiceRequest) -> Result<Invoice, OrderFlowError> {
        let attempts = self.policy.invoice_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = tokio::time::timeout(self.policy.invoice_timeout, self.processor.create_invoice(request))
                .await
                .unwrap_or_else(|_| {
                    Err(InvoiceError::ProcessorUnavailable(format!(
                        "No response within {:?}",
                        self.policy.invoice_timeout
                    )))
                });
            match result {
                Ok(invoice) => {
                    debug!("🔄️🧾️ Invoice {} issued for order {}", invoice.invoice_id, request.order_code);
                    return Ok(invoice);
                },
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(
                        "🔄️🧾️ Invoice attempt {attempt}/{attempts} for order {} failed. Retrying. {e}",
                        request.order_code
                    );
                    tokio::time::sleep(self.policy.retry_backoff).await;
                    attempt += 1;
                },
                Err(e) => {
                    error!("🔄️🧾️ Could not create an invoice for order {}. {e}", request.order_code);
                    return Err(OrderFlowError::PaymentInitFailed(e));
                },
            }
        }
    }

    /// Cancels a pending order on behalf of the buyer who placed it.
    pub async fn cancel_order(&self, code: &OrderCode, requester_id: &str) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(code).await?;
        if order.requester_id != requester_id {
            warn!("🔄️❌️ {requester_id} tried to cancel order {code}, which belongs to someone else");
            return Err(OrderFlowError::Forbidden(code.clone()));
        }
        if order.status != OrderStatusType::Pending {
            return Err(OrderFlowError::NotCancellable { code: code.clone(), status: order.status });
        }
        match self.db.transition_status(code, OrderStatusType::Pending, OrderStatusType::Cancelled).await? {
            Some(order) => {
                info!("🔄️❌️ Order {code} cancelled by the buyer");
                self.producers.publish_order_cancelled(OrderCancelledEvent::new(order.clone()));
                Ok(order)
            },
            None => {
                // Lost a race, most likely against a payment confirmation
                let status = self.fetch_order(code).await?.status;
                info!("🔄️❌️ Cancellation of order {code} lost a race. The order is now {status}");
                Err(OrderFlowError::NotCancellable { code: code.clone(), status })
            },
        }
    }

    /// Applies an authenticated payment confirmation.
    ///
    /// Confirmations may arrive more than once, and out of order. Replays of a settled order are acknowledged
    /// without doing anything. Payments that cannot be applied automatically are flagged on the order, announced
    /// with a `payment_review` event, and otherwise left alone.
    pub async fn apply_payment_confirmation(
        &self,
        invoice_id: &str,
        amount: Amount,
        currency: &str,
    ) -> Result<ConfirmationOutcome, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_invoice_id(invoice_id)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(format!("invoice {invoice_id}")))?;
        trace!("🔄️💰️ Confirmation of {amount} {currency} for order {} ({})", order.order_code, order.status);
        match order.status {
            OrderStatusType::Paid | OrderStatusType::Delivered => {
                debug!("🔄️💰️ Order {} is already {}. Ignoring the replay.", order.order_code, order.status);
                Ok(ConfirmationOutcome::AlreadySettled { order })
            },
            OrderStatusType::Cancelled => {
                let reason = ReviewReason::PaidAfterCancel { received: amount, currency: currency.to_string() };
                self.hold_for_review(order, reason).await
            },
            OrderStatusType::Pending => match self.check_amount(&order, amount, currency) {
                Err(reason) => self.hold_for_review(order, reason).await,
                Ok(()) => self.mark_paid(order, amount, currency).await,
            },
        }
    }

    fn check_amount(&self, order: &Order, amount: Amount, currency: &str) -> Result<(), ReviewReason> {
        let expected = if currency.eq_ignore_ascii_case(&order.pay_currency) {
            order.pay_amount
        } else if currency.eq_ignore_ascii_case(&order.currency) {
            order.total_amount
        } else {
            return Err(ReviewReason::CurrencyMismatch {
                expected: order.pay_currency.clone(),
                received: currency.to_string(),
            });
        };
        if !amount.covers(expected, self.policy.tolerance) {
            return Err(ReviewReason::AmountMismatch { expected, received: amount, currency: currency.to_string() });
        }
        if amount > expected {
            info!("🔄️💰️ Order {} was overpaid. Expected {expected}, received {amount} {currency}", order.order_code);
        }
        Ok(())
    }

    async fn mark_paid(
        &self,
        order: Order,
        amount: Amount,
        currency: &str,
    ) -> Result<ConfirmationOutcome, OrderFlowError> {
        let code = order.order_code;
        match self.db.transition_status(&code, OrderStatusType::Pending, OrderStatusType::Paid).await? {
            Some(order) => {
                info!("🔄️💰️ Order {code} is paid ({amount} {currency})");
                self.producers.publish_order_paid(OrderPaidEvent::new(order.clone()));
                Ok(ConfirmationOutcome::Paid { order })
            },
            None => {
                let order = self.fetch_order(&code).await?;
                match order.status {
                    OrderStatusType::Paid | OrderStatusType::Delivered => {
                        debug!("🔄️💰️ A concurrent confirmation already settled order {code}");
                        Ok(ConfirmationOutcome::AlreadySettled { order })
                    },
                    OrderStatusType::Cancelled => {
                        info!("🔄️💰️ Order {code} was cancelled while its payment was being applied");
                        let reason = ReviewReason::PaidAfterCancel { received: amount, currency: currency.to_string() };
                        self.hold_for_review(order, reason).await
                    },
                    OrderStatusType::Pending => {
                        error!("🔄️💰️ Order {code} is pending, but could not be marked as paid");
                        Err(OrderFlowError::InvalidTransition {
                            code,
                            from: OrderStatusType::Pending,
                            to: OrderStatusType::Paid,
                        })
                    },
                }
            },
        }
    }

    async fn hold_for_review(&self, order: Order, reason: ReviewReason) -> Result<ConfirmationOutcome, OrderFlowError> {
        warn!("🔄️🔍️ Payment for order {} needs manual review. {reason}", order.order_code);
        let note = reason.to_string();
        self.db.flag_for_review(&order.order_code, &note).await?;
        let order = Order { review_note: Some(note), ..order };
        self.producers.publish_payment_review(PaymentReviewEvent::new(order.clone(), reason.clone()));
        Ok(ConfirmationOutcome::HeldForReview { order, reason })
    }

    /// Marks a paid order as delivered. Calling this on an order that is already delivered does nothing.
    pub async fn mark_delivered(&self, code: &OrderCode) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(code).await?;
        match order.status {
            OrderStatusType::Delivered => {
                debug!("🔄️🚚️ Order {code} was already delivered");
                Ok(order)
            },
            OrderStatusType::Paid => {
                match self.db.transition_status(code, OrderStatusType::Paid, OrderStatusType::Delivered).await? {
                    Some(order) => {
                        info!("🔄️🚚️ Order {code} delivered");
                        Ok(order)
                    },
                    None => {
                        let order = self.fetch_order(code).await?;
                        if order.status == OrderStatusType::Delivered {
                            Ok(order)
                        } else {
                            Err(OrderFlowError::InvalidTransition {
                                code: code.clone(),
                                from: order.status,
                                to: OrderStatusType::Delivered,
                            })
                        }
                    },
                }
            },
            status @ (OrderStatusType::Pending | OrderStatusType::Cancelled) => Err(OrderFlowError::InvalidTransition {
                code: code.clone(),
                from: status,
                to: OrderStatusType::Delivered,
            }),
        }
    }

    /// The buyer of a paid order submits where the goods should go. The admin channel is told; nothing is stored.
    pub async fn request_delivery(
        &self,
        code: &OrderCode,
        method: DeliveryMethod,
        details: &str,
    ) -> Result<Order, OrderFlowError> {
        let details = details.trim();
        if details.is_empty() {
            return Err(OrderFlowError::InvalidDeliveryDetails("Delivery details cannot be empty".into()));
        }
        if method == DeliveryMethod::Email && !details.contains('@') {
            return Err(OrderFlowError::InvalidDeliveryDetails(format!("'{details}' is not an email address")));
        }
        let order = self.fetch_order(code).await?;
        if order.status != OrderStatusType::Paid {
            return Err(OrderFlowError::InvalidTransition {
                code: code.clone(),
                from: order.status,
                to: OrderStatusType::Delivered,
            });
        }
        info!("🔄️🚚️ Delivery by {method} requested for order {code}");
        self.producers.publish_delivery_requested(DeliveryRequestedEvent::new(
            order.clone(),
            method,
            details.to_string(),
        ));
        Ok(order)
    }

    pub async fn order_status(&self, code: &OrderCode) -> Result<OrderStatusView, OrderFlowError> {
        self.fetch_order(code).await.map(OrderStatusView::from)
    }

    /// The most recent orders, newest first. `limit` is capped at [`MAX_RECENT_ORDERS`].
    pub async fn recent_orders(&self, limit: u32) -> Result<Vec<Order>, OrderFlowError> {
        let limit = limit.clamp(1, MAX_RECENT_ORDERS);
        Ok(self.db.fetch_recent_orders(limit).await?)
    }

    async fn fetch_order(&self, code: &OrderCode) -> Result<Order, OrderFlowError> {
        self.db.fetch_order_by_code(code).await?.ok_or_else(|| OrderFlowError::OrderNotFound(code.to_string()))
    }
}
