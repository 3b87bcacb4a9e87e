use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    DeliveryRequestedEvent,
    EventHandler,
    EventProducer,
    Handler,
    OrderCancelledEvent,
    OrderCreatedEvent,
    OrderPaidEvent,
    PaymentReviewEvent,
};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The publishing side of every registered hook. Cheap to clone; the ledger holds one copy.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub order_cancelled_producer: Vec<EventProducer<OrderCancelledEvent>>,
    pub delivery_requested_producer: Vec<EventProducer<DeliveryRequestedEvent>>,
    pub payment_review_producer: Vec<EventProducer<PaymentReviewEvent>>,
}

impl EventProducers {
    pub fn publish_order_created(&self, event: OrderCreatedEvent) {
        publish_all(&self.order_created_producer, event);
    }

    pub fn publish_order_paid(&self, event: OrderPaidEvent) {
        publish_all(&self.order_paid_producer, event);
    }

    pub fn publish_order_cancelled(&self, event: OrderCancelledEvent) {
        publish_all(&self.order_cancelled_producer, event);
    }

    pub fn publish_delivery_requested(&self, event: DeliveryRequestedEvent) {
        publish_all(&self.delivery_requested_producer, event);
    }

    pub fn publish_payment_review(&self, event: PaymentReviewEvent) {
        publish_all(&self.payment_review_producer, event);
    }
}

fn publish_all<E: Clone + Send + Sync>(producers: &[EventProducer<E>], event: E) {
    producers.iter().for_each(|p| p.publish_event(event.clone()));
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_order_cancelled: Option<EventHandler<OrderCancelledEvent>>,
    pub on_delivery_requested: Option<EventHandler<DeliveryRequestedEvent>>,
    pub on_payment_review: Option<EventHandler<PaymentReviewEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_order_created: hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f)),
            on_order_paid: hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f)),
            on_order_cancelled: hooks.on_order_cancelled.map(|f| EventHandler::new(buffer_size, f)),
            on_delivery_requested: hooks.on_delivery_requested.map(|f| EventHandler::new(buffer_size, f)),
            on_payment_review: hooks.on_payment_review.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_cancelled {
            result.order_cancelled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_delivery_requested {
            result.delivery_requested_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_review {
            result.payment_review_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns one task per registered handler. Each task ends once all of its producers are dropped.
    pub fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_cancelled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_delivery_requested {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payment_review {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_order_cancelled: Option<Handler<OrderCancelledEvent>>,
    pub on_delivery_requested: Option<Handler<DeliveryRequestedEvent>>,
    pub on_payment_review: Option<Handler<PaymentReviewEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_order_cancelled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCancelledEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_cancelled = Some(Arc::new(f));
        self
    }

    pub fn on_delivery_requested<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DeliveryRequestedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_delivery_requested = Some(Arc::new(f));
        self
    }

    pub fn on_payment_review<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentReviewEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_payment_review = Some(Arc::new(f));
        self
    }
}
