//! # Order Repository
//!
//! Read access to the order ledger.
//!
//! Orders are append-only: the ONLY writer is the checkout transaction in
//! [`crate::checkout`]. This repository deliberately exposes no insert or
//! update methods, which is how the "orders are immutable after creation"
//! invariant is held at the API level.

use sqlx::SqlitePool;

use crate::error::DbResult;
use stockbook_core::Order;

/// Repository for order reads.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

/// Column list shared by the order queries.
const ORDER_COLUMNS: &str = "id, client_id, total_cents, status, created_at";

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Lists a client's orders, newest first.
    pub async fn list_for_client(&self, client_id: &str, limit: u32) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE client_id = ?1 \
             ORDER BY created_at DESC LIMIT ?2"
        ))
        .bind(client_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Counts orders (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
