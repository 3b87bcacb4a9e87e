use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewOrder, Order, OrderCode, OrderStatusType},
};

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// Writes with `RETURNING` are always read with `fetch_all`. SQLite only completes (and autocommits) the write once
/// the statement has been stepped past its last row.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, SqliteDatabaseError> {
    if order_exists(&order.order_code, conn).await? {
        return Err(SqliteDatabaseError::DuplicateOrder(order.order_code));
    }
    let code = order.order_code.clone();
    let invoice_id = order.invoice_id.clone();
    let result = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (
                order_code,
                product_id,
                product_name,
                quantity,
                total_amount,
                currency,
                requester_id,
                channel,
                status,
                invoice_id,
                payment_url,
                pay_amount,
                pay_currency,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *;
        "#,
    )
    .bind(order.order_code)
    .bind(order.product_id)
    .bind(order.product_name)
    .bind(i64::from(order.quantity))
    .bind(order.total_amount.to_string())
    .bind(order.currency)
    .bind(order.requester_id)
    .bind(order.channel)
    .bind(OrderStatusType::Pending)
    .bind(order.invoice_id)
    .bind(order.payment_url)
    .bind(order.pay_amount.to_string())
    .bind(order.pay_currency)
    .bind(order.created_at)
    .fetch_all(conn)
    .await;
    match result {
        Ok(rows) => rows.into_iter().next().ok_or(SqliteDatabaseError::DriverError(sqlx::Error::RowNotFound)),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            if e.message().contains("invoice_id") {
                Err(SqliteDatabaseError::DuplicateInvoice(invoice_id))
            } else {
                Err(SqliteDatabaseError::DuplicateOrder(code))
            }
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order_by_code(
    code: &OrderCode,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_code = $1")
        .bind(code.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_invoice_id(
    invoice_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE invoice_id = $1")
        .bind(invoice_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Checks whether an order with the given code already exists in the database.
pub async fn order_exists(code: &OrderCode, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE order_code = $1")
        .bind(code.as_str())
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

/// Fetches the most recent orders, ordered by `created_at` in descending order
pub async fn fetch_recent_orders(limit: u32, conn: &mut SqliteConnection) -> Result<Vec<Order>, SqliteDatabaseError> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC, id DESC LIMIT $1")
        .bind(i64::from(limit))
        .fetch_all(conn)
        .await?;
    trace!("🗃️ Result of fetch_recent_orders: {}", orders.len());
    Ok(orders)
}

/// The compare-and-set at the heart of the order ledger.
///
/// The `WHERE status = <from>` clause makes the update conditional on the status the caller last saw. SQLite
/// serialises writers, so of two racing transitions out of the same status exactly one matches a row.
pub async fn transition_status(
    code: &OrderCode,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let now = Utc::now();
    let mut builder = QueryBuilder::new("UPDATE orders SET status = ");
    builder.push_bind(to);
    match to {
        OrderStatusType::Paid => {
            builder.push(", paid_at = ").push_bind(now);
            builder.push(", review_note = NULL");
        },
        OrderStatusType::Delivered => {
            builder.push(", delivered_at = ").push_bind(now);
        },
        OrderStatusType::Pending | OrderStatusType::Cancelled => {},
    }
    builder.push(" WHERE order_code = ").push_bind(code.as_str());
    builder.push(" AND status = ").push_bind(from);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let order = builder.build_query_as::<Order>().fetch_all(conn).await?.into_iter().next();
    match &order {
        Some(_) => debug!("🗃️ Order {code} moved from {from} to {to}"),
        None => debug!("🗃️ Order {code} was not in {from} status. Nothing was written"),
    }
    Ok(order)
}

pub async fn set_review_note(
    code: &OrderCode,
    note: &str,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    let res = sqlx::query("UPDATE orders SET review_note = $1 WHERE order_code = $2")
        .bind(note)
        .bind(code.as_str())
        .execute(conn)
        .await?;
    trace!("🗃️ Review note for {code} set. {} rows affected", res.rows_affected());
    Ok(())
}
