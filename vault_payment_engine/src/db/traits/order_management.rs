use crate::{
    db::traits::StoreError,
    db_types::{NewOrder, Order, OrderCode, OrderStatusType},
};

/// The `OrderManagement` trait defines the behaviour of the order store.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Stores a brand-new order with `pending` status and returns the stored record.
    ///
    /// Fails with [`StoreError::DuplicateOrderCode`] or [`StoreError::DuplicateInvoice`] if either identifier is
    /// already taken.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    async fn order_code_exists(&self, code: &OrderCode) -> Result<bool, StoreError>;

    async fn fetch_order_by_code(&self, code: &OrderCode) -> Result<Option<Order>, StoreError>;

    /// Payment callbacks only carry the processor's invoice id, so orders must be searchable by it.
    async fn fetch_order_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Order>, StoreError>;

    /// The most recently created orders, newest first.
    async fn fetch_recent_orders(&self, limit: u32) -> Result<Vec<Order>, StoreError>;

    /// Atomically moves the order from `from` to `to`, stamping `paid_at` or `delivered_at` as appropriate.
    ///
    /// This is a single conditional update. If the stored status is no longer `from` (because another worker got
    /// there first), nothing is written and `None` is returned. Callers must treat `None` as a lost race and must not
    /// retry blindly.
    async fn transition_status(
        &self,
        code: &OrderCode,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Option<Order>, StoreError>;

    /// Attaches a manual-review note to the order without touching its status.
    async fn flag_for_review(&self, code: &OrderCode, note: &str) -> Result<(), StoreError>;
}
