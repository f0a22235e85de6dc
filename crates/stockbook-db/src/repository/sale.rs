//! # Sale Repository
//!
//! Read access to the sale ledger.
//!
//! Sale rows are written by the checkout transaction and amended only by
//! [`crate::checkout::Checkout::amend_sale`], which pairs the row update
//! with its stock adjustment in one transaction. This repository is
//! therefore read-only, like [`crate::repository::order::OrderRepository`].

use sqlx::SqlitePool;

use crate::error::DbResult;
use stockbook_core::Sale;

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

/// Column list shared by the sale queries.
const SALE_COLUMNS: &str =
    "id, order_id, product_id, client_id, quantity, unit_price_cents, amount_cents, created_at";

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all sales for an order, in insertion order.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE order_id = ?1 ORDER BY created_at, id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists a client's sales, newest first.
    pub async fn list_for_client(&self, client_id: &str, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE client_id = ?1 \
             ORDER BY created_at DESC LIMIT ?2"
        ))
        .bind(client_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Sums the sale amounts for an order.
    ///
    /// Used by tests and diagnostics to check the ledger invariant:
    /// this must always equal the order's `total_cents`.
    pub async fn total_for_order(&self, order_id: &str) -> DbResult<i64> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT SUM(amount_cents) FROM sales WHERE order_id = ?1")
                .bind(order_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(total.unwrap_or(0))
    }

    /// Counts sales (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
