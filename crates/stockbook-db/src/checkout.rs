//! # Checkout Module
//!
//! The order commit orchestrator and the sale amendment flow - the one part
//! of Stockbook where multiple dependent writes MUST succeed or fail
//! together.
//!
//! ## Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Order Commit Sequence                              │
//! │                                                                         │
//! │  commit(cart, client_id)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Pure validation (no writes): cart non-empty, quantities positive,     │
//! │  unit prices non-negative                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN TRANSACTION ◄────────────────────────────────┐                  │
//! │       │                                              │                  │
//! │       ├── client exists & not deleted?               │                  │
//! │       ├── stock re-read per line (snapshots are      │  any failure    │
//! │       │   NEVER trusted at commit time)              │  rolls the      │
//! │       ├── 1. INSERT order  (total = Σ line amounts)  │  whole          │
//! │       ├── 2. INSERT sale per line                    │  transaction    │
//! │       ├── 3. UPDATE stock per line (guarded delta,   │  back - no      │
//! │       │      rows_affected checked)                  │  partial state  │
//! │       ├── 4. UPDATE client revenue (delta)           │  ever persists  │
//! │       ▼                                              │                  │
//! │  COMMIT ─────────────────────────────────────────────┘                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  OrderReceipt { order, sales } for invoice generation                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Two concurrent commits against the same product cannot both succeed past
//! the available stock: the decrement is a conditional update
//! (`... AND stock >= qty`) checked for rows-affected, inside a
//! transaction, so the loser fails cleanly instead of driving stock
//! negative.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use stockbook_core::{
    Cart, Client, CoreError, Order, OrderStatus, Sale, MAX_LINE_QUANTITY, MAX_UNIT_PRICE_CENTS,
};

// =============================================================================
// Errors
// =============================================================================

/// The step of the commit/amendment sequence that failed.
///
/// Logged on failure so an operator can tell exactly where a storage error
/// interrupted the sequence (the transaction has already been rolled back by
/// the time the caller sees this).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    Begin,
    ClientLookup,
    StockCheck,
    OrderInsert,
    SaleInsert,
    StockDecrement,
    RevenueUpdate,
    SaleLookup,
    SaleUpdate,
    StockAdjust,
    Commit,
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommitStep::Begin => "begin transaction",
            CommitStep::ClientLookup => "client lookup",
            CommitStep::StockCheck => "stock check",
            CommitStep::OrderInsert => "order insert",
            CommitStep::SaleInsert => "sale insert",
            CommitStep::StockDecrement => "stock decrement",
            CommitStep::RevenueUpdate => "revenue update",
            CommitStep::SaleLookup => "sale lookup",
            CommitStep::SaleUpdate => "sale update",
            CommitStep::StockAdjust => "stock adjustment",
            CommitStep::Commit => "transaction commit",
        };
        f.write_str(name)
    }
}

/// Errors from the checkout flows.
///
/// ## Two Classes
/// - `Domain`: a business rule rejected the request BEFORE any state
///   changed (empty cart, bad price, insufficient stock, ...). Specific and
///   actionable for the end user.
/// - `CommitFailed`: the storage layer failed mid-sequence. The transaction
///   has been rolled back; the caller shows a generic "failed to process
///   sale" message because partial-state problems are not something the end
///   user can act on.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A business rule rejected the request; nothing was written.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// A storage operation failed mid-sequence; the transaction was rolled
    /// back and no partial state persists.
    #[error("Failed to process sale: {step} failed: {source}")]
    CommitFailed {
        step: CommitStep,
        #[source]
        source: DbError,
    },
}

impl CheckoutError {
    /// Returns a closure that annotates a sqlx error with the failing step.
    fn at(step: CommitStep) -> impl FnOnce(sqlx::Error) -> CheckoutError {
        move |err| {
            let source = DbError::from(err);
            warn!(step = %step, error = %source, "Checkout step failed, rolling back");
            CheckoutError::CommitFailed { step, source }
        }
    }
}

/// Result type for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Receipt
// =============================================================================

/// The outcome of a successful commit: everything an invoice/receipt
/// renderer (an external collaborator) needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    /// The persisted order, with its generated ID.
    pub order: Order,
    /// The persisted sale rows, one per cart line.
    pub sales: Vec<Sale>,
}

// =============================================================================
// Checkout
// =============================================================================

/// The order commit orchestrator.
///
/// Owns the two flows where stock and revenue bookkeeping must move in
/// lockstep with ledger rows: [`Checkout::commit`] and
/// [`Checkout::amend_sale`]. Each runs in a single SQLite transaction.
#[derive(Debug, Clone)]
pub struct Checkout {
    pool: SqlitePool,
}

impl Checkout {
    /// Creates a new Checkout orchestrator.
    pub fn new(pool: SqlitePool) -> Self {
        Checkout { pool }
    }

    /// Commits a cart as an Order plus Sale rows and applies the stock and
    /// revenue side effects - all inside one transaction.
    ///
    /// ## Preconditions (checked before any write)
    /// - cart is non-empty
    /// - every line has `0 < quantity ≤ 999` and `unit_price_cents ≥ 0`
    /// - `client_id` names an existing, non-deleted client
    /// - every line's quantity is covered by COMMIT-TIME stock, re-read
    ///   inside the transaction (the cart's add-time snapshot may be stale)
    ///
    /// ## Guarantees
    /// - the order's total equals the sum of its sale amounts, exactly
    /// - post-commit stock = pre-commit stock − quantity, per line
    /// - post-commit revenue = pre-commit revenue + order total
    /// - on ANY failure, no order, sale, stock, or revenue state changes
    pub async fn commit(&self, cart: &Cart, client_id: &str) -> CheckoutResult<OrderReceipt> {
        // ---------------------------------------------------------------------
        // Pure validation - before any write
        // ---------------------------------------------------------------------
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        for line in cart.lines() {
            if line.quantity <= 0 {
                return Err(CoreError::InvalidQuantity(line.quantity).into());
            }
            if line.quantity > MAX_LINE_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: line.quantity,
                    max: MAX_LINE_QUANTITY,
                }
                .into());
            }
            if line.unit_price_cents < 0 || line.unit_price_cents > MAX_UNIT_PRICE_CENTS {
                return Err(CoreError::InvalidPrice(line.unit_price_cents).into());
            }
        }

        debug!(
            client_id = %client_id,
            lines = cart.line_count(),
            total = %cart.total(),
            "Committing cart"
        );

        // ---------------------------------------------------------------------
        // Transaction - dropped (rolled back) on any early return
        // ---------------------------------------------------------------------
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(CheckoutError::at(CommitStep::Begin))?;

        // Client must exist and not be soft-deleted
        let client: Option<Client> = sqlx::query_as(
            "SELECT id, name, phone, email, address, revenue_cents, status, \
             created_at, updated_at FROM clients WHERE id = ?1",
        )
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(CheckoutError::at(CommitStep::ClientLookup))?;

        match client {
            Some(ref c) if c.is_billable() => {}
            _ => return Err(CoreError::InvalidClient(client_id.to_string()).into()),
        }

        // Re-read stock inside the transaction; the cart snapshot may have
        // been consumed by a concurrent commit since add-time
        for line in cart.lines() {
            let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                .bind(&line.product_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(CheckoutError::at(CommitStep::StockCheck))?;

            let stock = stock
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            if stock < line.quantity {
                return Err(CoreError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    available: stock,
                    requested: line.quantity,
                }
                .into());
            }
        }

        let now = Utc::now();

        // 1. Insert the order
        let order = Order {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            total_cents: cart.total_cents(),
            status: OrderStatus::Completed,
            created_at: now,
        };

        sqlx::query(
            "INSERT INTO orders (id, client_id, total_cents, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&order.id)
        .bind(&order.client_id)
        .bind(order.total_cents)
        .bind(order.status)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(CheckoutError::at(CommitStep::OrderInsert))?;

        // 2. Insert one sale row per cart line
        let mut sales = Vec::with_capacity(cart.line_count());
        for line in cart.lines() {
            let sale = Sale {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                product_id: line.product_id.clone(),
                client_id: client_id.to_string(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                amount_cents: line.amount_cents(),
                created_at: now,
            };

            sqlx::query(
                "INSERT INTO sales (id, order_id, product_id, client_id, quantity, \
                 unit_price_cents, amount_cents, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&sale.id)
            .bind(&sale.order_id)
            .bind(&sale.product_id)
            .bind(&sale.client_id)
            .bind(sale.quantity)
            .bind(sale.unit_price_cents)
            .bind(sale.amount_cents)
            .bind(sale.created_at)
            .execute(&mut *tx)
            .await
            .map_err(CheckoutError::at(CommitStep::SaleInsert))?;

            sales.push(sale);
        }

        // 3. Decrement stock per line with the conditional guard. The guard
        //    re-asserts the check above at write time, so a writer on
        //    another connection can never push us below zero.
        for line in cart.lines() {
            let result = sqlx::query(
                "UPDATE products SET stock = stock - ?2, updated_at = ?3 \
                 WHERE id = ?1 AND stock >= ?2",
            )
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(CheckoutError::at(CommitStep::StockDecrement))?;

            if result.rows_affected() == 0 {
                let available: i64 =
                    sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                        .bind(&line.product_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(CheckoutError::at(CommitStep::StockDecrement))?
                        .unwrap_or(0);

                return Err(CoreError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    available,
                    requested: line.quantity,
                }
                .into());
            }
        }

        // 4. Credit the client's revenue with the order total
        let result = sqlx::query(
            "UPDATE clients SET revenue_cents = revenue_cents + ?2, updated_at = ?3 \
             WHERE id = ?1",
        )
        .bind(client_id)
        .bind(order.total_cents)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(CheckoutError::at(CommitStep::RevenueUpdate))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::InvalidClient(client_id.to_string()).into());
        }

        tx.commit()
            .await
            .map_err(CheckoutError::at(CommitStep::Commit))?;

        info!(
            order_id = %order.id,
            client_id = %client_id,
            total = %order.total(),
            lines = sales.len(),
            "Order committed"
        );

        Ok(OrderReceipt { order, sales })
    }

    /// Amends an existing sale's quantity and client, keeping product stock
    /// consistent - in one transaction.
    ///
    /// ## Behavior
    /// - stock changes by exactly `old_quantity - new_quantity` (a reduced
    ///   sale returns stock, an increased sale consumes it), guarded so
    ///   stock can never go negative
    /// - the amount is recomputed from the sale's FROZEN `unit_price_cents`.
    ///   A sale made at a custom price keeps that price; reverting to the
    ///   product's current list price here would silently repric the sale,
    ///   which is exactly the defect this flow exists to avoid.
    /// - client revenue and the parent order's total keep their commit-time
    ///   values; amendment adjusts the sale row and stock only
    pub async fn amend_sale(
        &self,
        sale_id: &str,
        new_quantity: i64,
        new_client_id: &str,
    ) -> CheckoutResult<Sale> {
        if new_quantity <= 0 {
            return Err(CoreError::InvalidQuantity(new_quantity).into());
        }
        if new_quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: new_quantity,
                max: MAX_LINE_QUANTITY,
            }
            .into());
        }

        debug!(sale_id = %sale_id, new_quantity, new_client_id = %new_client_id, "Amending sale");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(CheckoutError::at(CommitStep::Begin))?;

        let sale: Option<Sale> = sqlx::query_as(
            "SELECT id, order_id, product_id, client_id, quantity, unit_price_cents, \
             amount_cents, created_at FROM sales WHERE id = ?1",
        )
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(CheckoutError::at(CommitStep::SaleLookup))?;

        let sale = sale.ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        let client: Option<Client> = sqlx::query_as(
            "SELECT id, name, phone, email, address, revenue_cents, status, \
             created_at, updated_at FROM clients WHERE id = ?1",
        )
        .bind(new_client_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(CheckoutError::at(CommitStep::ClientLookup))?;

        match client {
            Some(ref c) if c.is_billable() => {}
            _ => return Err(CoreError::InvalidClient(new_client_id.to_string()).into()),
        }

        // Positive adjustment returns stock, negative consumes it
        let adjustment = sale.quantity - new_quantity;

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET stock = stock + ?2, updated_at = ?3 \
             WHERE id = ?1 AND stock + ?2 >= 0",
        )
        .bind(&sale.product_id)
        .bind(adjustment)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(CheckoutError::at(CommitStep::StockAdjust))?;

        if result.rows_affected() == 0 {
            let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                .bind(&sale.product_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(CheckoutError::at(CommitStep::StockAdjust))?;

            let stock = stock
                .ok_or_else(|| CoreError::ProductNotFound(sale.product_id.clone()))?;

            // Everything the amended sale could draw on: current stock plus
            // the units the original sale already holds
            return Err(CoreError::InsufficientStock {
                product_id: sale.product_id.clone(),
                available: stock + sale.quantity,
                requested: new_quantity,
            }
            .into());
        }

        // Frozen unit price, never the product's current list price. The
        // multiplication is checked because the sale row predates us and its
        // price is not re-validated here.
        let amount_cents = sale
            .unit_price_cents
            .checked_mul(new_quantity)
            .ok_or(CoreError::InvalidPrice(sale.unit_price_cents))?;

        sqlx::query(
            "UPDATE sales SET quantity = ?2, client_id = ?3, amount_cents = ?4 WHERE id = ?1",
        )
        .bind(sale_id)
        .bind(new_quantity)
        .bind(new_client_id)
        .bind(amount_cents)
        .execute(&mut *tx)
        .await
        .map_err(CheckoutError::at(CommitStep::SaleUpdate))?;

        tx.commit()
            .await
            .map_err(CheckoutError::at(CommitStep::Commit))?;

        info!(
            sale_id = %sale_id,
            old_quantity = sale.quantity,
            new_quantity,
            stock_adjustment = adjustment,
            "Sale amended"
        );

        Ok(Sale {
            quantity: new_quantity,
            client_id: new_client_id.to_string(),
            amount_cents,
            ..sale
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::client::generate_client_id;
    use crate::repository::product::generate_product_id;
    use stockbook_core::{ClientStatus, Product};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, name: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            name: name.to_string(),
            category_id: None,
            cost_price_cents: price_cents / 2,
            selling_price_cents: price_cents,
            stock,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        product
    }

    async fn seed_client(db: &Database, name: &str) -> Client {
        let now = Utc::now();
        let client = Client {
            id: generate_client_id(),
            name: name.to_string(),
            phone: None,
            email: None,
            address: None,
            revenue_cents: 0,
            status: ClientStatus::Active,
            created_at: now,
            updated_at: now,
        };
        db.clients().insert(&client).await.unwrap();
        client
    }

    /// Asserts that nothing has been persisted: no orders, no sales.
    async fn assert_ledgers_empty(db: &Database) {
        assert_eq!(db.orders().count().await.unwrap(), 0);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    /// The worked scenario: A at $100 × 2 plus B at $50 × 1 for client C
    /// with A.stock=5, B.stock=3 yields a $250 order, A.stock→3,
    /// B.stock→2, C.revenue += $250.
    #[tokio::test]
    async fn test_commit_happy_path() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 10000, 5).await;
        let b = seed_product(&db, "B", 5000, 3).await;
        let c = seed_client(&db, "C").await;

        let mut cart = Cart::new();
        cart.add_line(&a, 2).unwrap();
        cart.add_line(&b, 1).unwrap();

        let receipt = db.checkout().commit(&cart, &c.id).await.unwrap();

        assert_eq!(receipt.order.total_cents, 25000);
        assert_eq!(receipt.order.status, OrderStatus::Completed);
        assert_eq!(receipt.sales.len(), 2);

        // Side effects
        assert_eq!(db.products().current_stock(&a.id).await.unwrap(), 3);
        assert_eq!(db.products().current_stock(&b.id).await.unwrap(), 2);
        let client = db.clients().get_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(client.revenue_cents, 25000);

        // Persisted rows match the receipt
        let order = db
            .orders()
            .get_by_id(&receipt.order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.total_cents, 25000);
        let sales = db.sales().list_for_order(&order.id).await.unwrap();
        assert_eq!(sales.len(), 2);
    }

    /// Ledger invariant: the order total equals the sum of its sale
    /// amounts, exactly.
    #[tokio::test]
    async fn test_commit_total_equals_sum_of_sale_amounts() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 1234, 100).await;
        let b = seed_product(&db, "B", 567, 100).await;
        let c = seed_client(&db, "C").await;

        let mut cart = Cart::new();
        cart.add_line(&a, 7).unwrap();
        cart.add_line(&b, 13).unwrap();

        let receipt = db.checkout().commit(&cart, &c.id).await.unwrap();

        let sum = db.sales().total_for_order(&receipt.order.id).await.unwrap();
        assert_eq!(sum, receipt.order.total_cents);
        assert_eq!(sum, 1234 * 7 + 567 * 13);

        for sale in &receipt.sales {
            assert_eq!(sale.amount_cents, sale.unit_price_cents * sale.quantity);
        }
    }

    #[tokio::test]
    async fn test_commit_with_custom_unit_price() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 10000, 5).await;
        let c = seed_client(&db, "C").await;

        let mut cart = Cart::new();
        // Negotiated price below list
        cart.add_line_with_price(&a, 2, 9000).unwrap();

        let receipt = db.checkout().commit(&cart, &c.id).await.unwrap();

        assert_eq!(receipt.order.total_cents, 18000);
        assert_eq!(receipt.sales[0].unit_price_cents, 9000);

        let client = db.clients().get_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(client.revenue_cents, 18000);
    }

    #[tokio::test]
    async fn test_commit_empty_cart() {
        let db = test_db().await;
        let c = seed_client(&db, "C").await;

        let cart = Cart::new();
        let err = db.checkout().commit(&cart, &c.id).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Domain(CoreError::EmptyCart)
        ));
        assert_ledgers_empty(&db).await;
    }

    #[tokio::test]
    async fn test_commit_unknown_client() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 1000, 5).await;

        let mut cart = Cart::new();
        cart.add_line(&a, 1).unwrap();

        let err = db.checkout().commit(&cart, "missing").await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Domain(CoreError::InvalidClient(_))
        ));
        assert_ledgers_empty(&db).await;
        assert_eq!(db.products().current_stock(&a.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_commit_deleted_client() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 1000, 5).await;
        let c = seed_client(&db, "C").await;
        db.clients().soft_delete(&c.id).await.unwrap();

        let mut cart = Cart::new();
        cart.add_line(&a, 1).unwrap();

        let err = db.checkout().commit(&cart, &c.id).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Domain(CoreError::InvalidClient(_))
        ));
        assert_ledgers_empty(&db).await;
    }

    #[tokio::test]
    async fn test_commit_inactive_client_is_billable() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 1000, 5).await;
        let mut c = seed_client(&db, "C").await;
        c.status = ClientStatus::Inactive;
        db.clients().update(&c).await.unwrap();

        let mut cart = Cart::new();
        cart.add_line(&a, 1).unwrap();

        db.checkout().commit(&cart, &c.id).await.unwrap();
    }

    /// The canonical rejection: requesting 10 units with only 5 in
    /// stock fails with InsufficientStock and persists NOTHING. The cart is
    /// built against a stale snapshot (stock was 10 at add-time) to prove
    /// the commit re-reads stock rather than trusting the cart.
    #[tokio::test]
    async fn test_commit_insufficient_stock_no_partial_writes() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 1000, 10).await;
        let c = seed_client(&db, "C").await;

        let mut cart = Cart::new();
        cart.add_line(&a, 10).unwrap();

        // A concurrent sale consumed half the stock after the cart was built
        db.products().adjust_stock(&a.id, -5).await.unwrap();

        let err = db.checkout().commit(&cart, &c.id).await.unwrap_err();
        match err {
            CheckoutError::Domain(CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            }) => {
                assert_eq!(product_id, a.id);
                assert_eq!(available, 5);
                assert_eq!(requested, 10);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // No order, no sales, stock untouched, revenue untouched
        assert_ledgers_empty(&db).await;
        assert_eq!(db.products().current_stock(&a.id).await.unwrap(), 5);
        let client = db.clients().get_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(client.revenue_cents, 0);
    }

    /// One bad line poisons the whole cart: the good line's product must
    /// not lose stock either.
    #[tokio::test]
    async fn test_commit_rolls_back_all_lines_when_one_fails() {
        let db = test_db().await;
        let good = seed_product(&db, "Good", 1000, 10).await;
        let bad = seed_product(&db, "Bad", 2000, 10).await;
        let c = seed_client(&db, "C").await;

        let mut cart = Cart::new();
        cart.add_line(&good, 2).unwrap();
        cart.add_line(&bad, 8).unwrap();

        // Bad's stock collapses after the cart was built
        db.products().adjust_stock(&bad.id, -9).await.unwrap();

        let err = db.checkout().commit(&cart, &c.id).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Domain(CoreError::InsufficientStock { .. })
        ));

        assert_ledgers_empty(&db).await;
        assert_eq!(db.products().current_stock(&good.id).await.unwrap(), 10);
        assert_eq!(db.products().current_stock(&bad.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_commit_product_vanished() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 1000, 5).await;
        let c = seed_client(&db, "C").await;

        let mut cart = Cart::new();
        cart.add_line(&a, 1).unwrap();

        db.products().delete(&a.id).await.unwrap();

        let err = db.checkout().commit(&cart, &c.id).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Domain(CoreError::ProductNotFound(_))
        ));
        assert_ledgers_empty(&db).await;
    }

    /// A storage failure mid-sequence (here: the sales table is gone, so
    /// the sale insert after the order insert blows up) must surface as
    /// `CommitFailed` with the failing step, and the already-inserted order
    /// must be rolled back along with stock and revenue.
    #[tokio::test]
    async fn test_commit_storage_failure_rolls_back() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 1000, 5).await;
        let c = seed_client(&db, "C").await;

        let mut cart = Cart::new();
        cart.add_line(&a, 2).unwrap();

        sqlx::query("DROP TABLE sales")
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.checkout().commit(&cart, &c.id).await.unwrap_err();
        match err {
            CheckoutError::CommitFailed { step, .. } => {
                assert_eq!(step, CommitStep::SaleInsert);
            }
            other => panic!("expected CommitFailed, got {other:?}"),
        }

        // The order insert succeeded inside the transaction but must not
        // have survived the rollback; stock and revenue are untouched
        assert_eq!(db.orders().count().await.unwrap(), 0);
        assert_eq!(db.products().current_stock(&a.id).await.unwrap(), 5);
        let client = db.clients().get_by_id(&c.id).await.unwrap().unwrap();
        assert_eq!(client.revenue_cents, 0);
    }

    /// Failed validation is idempotent: retrying after the state is fixed
    /// succeeds, and the failures left no residue behind.
    #[tokio::test]
    async fn test_failed_commit_then_retry() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 1000, 10).await;
        let c = seed_client(&db, "C").await;

        let mut cart = Cart::new();
        cart.add_line(&a, 8).unwrap();

        db.products().adjust_stock(&a.id, -5).await.unwrap();
        assert!(db.checkout().commit(&cart, &c.id).await.is_err());
        assert!(db.checkout().commit(&cart, &c.id).await.is_err());
        assert_ledgers_empty(&db).await;

        // Restock; the same cart now commits cleanly
        db.products().adjust_stock(&a.id, 5).await.unwrap();
        let receipt = db.checkout().commit(&cart, &c.id).await.unwrap();
        assert_eq!(receipt.order.total_cents, 8000);
        assert_eq!(db.products().current_stock(&a.id).await.unwrap(), 2);
    }

    // -------------------------------------------------------------------------
    // Sale amendment
    // -------------------------------------------------------------------------

    /// Commits a one-line cart and returns the resulting sale.
    async fn seed_sale(
        db: &Database,
        product: &Product,
        client: &Client,
        quantity: i64,
        unit_price_cents: i64,
    ) -> Sale {
        let mut cart = Cart::new();
        cart.add_line_with_price(product, quantity, unit_price_cents)
            .unwrap();
        let receipt = db.checkout().commit(&cart, &client.id).await.unwrap();
        receipt.sales.into_iter().next().unwrap()
    }

    /// Reducing quantity q1→q2 returns exactly q1−q2 units of stock and
    /// recomputes the amount from the frozen unit price.
    #[tokio::test]
    async fn test_amend_reduce_quantity_returns_stock() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 1000, 10).await;
        let c = seed_client(&db, "C").await;
        let sale = seed_sale(&db, &a, &c, 6, 1000).await;
        assert_eq!(db.products().current_stock(&a.id).await.unwrap(), 4);

        let amended = db.checkout().amend_sale(&sale.id, 2, &c.id).await.unwrap();

        assert_eq!(amended.quantity, 2);
        assert_eq!(amended.amount_cents, 2000);
        // Stock changed by exactly 6 - 2 = +4
        assert_eq!(db.products().current_stock(&a.id).await.unwrap(), 8);

        let persisted = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(persisted.quantity, 2);
        assert_eq!(persisted.amount_cents, 2000);

        // The parent order keeps its commit-time total; amendment touches
        // the sale row and stock only
        let order = db.orders().get_by_id(&sale.order_id).await.unwrap().unwrap();
        assert_eq!(order.total_cents, 6000);
    }

    #[tokio::test]
    async fn test_amend_increase_quantity_consumes_stock() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 1000, 10).await;
        let c = seed_client(&db, "C").await;
        let sale = seed_sale(&db, &a, &c, 2, 1000).await;
        assert_eq!(db.products().current_stock(&a.id).await.unwrap(), 8);

        let amended = db.checkout().amend_sale(&sale.id, 7, &c.id).await.unwrap();

        assert_eq!(amended.quantity, 7);
        assert_eq!(amended.amount_cents, 7000);
        // Stock changed by exactly 2 - 7 = -5
        assert_eq!(db.products().current_stock(&a.id).await.unwrap(), 3);
    }

    /// A sale made at a custom price keeps that price on amendment; the
    /// product's list price must NOT leak back in.
    #[tokio::test]
    async fn test_amend_keeps_frozen_custom_price() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 10000, 10).await;
        let c = seed_client(&db, "C").await;
        // Sold at a negotiated $75.00, list is $100.00
        let sale = seed_sale(&db, &a, &c, 2, 7500).await;

        let amended = db.checkout().amend_sale(&sale.id, 3, &c.id).await.unwrap();

        assert_eq!(amended.unit_price_cents, 7500);
        assert_eq!(amended.amount_cents, 22500); // 3 × $75, not 3 × $100
    }

    #[tokio::test]
    async fn test_amend_insufficient_stock_rolls_back() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 1000, 5).await;
        let c = seed_client(&db, "C").await;
        let sale = seed_sale(&db, &a, &c, 2, 1000).await;
        assert_eq!(db.products().current_stock(&a.id).await.unwrap(), 3);

        // 2 held by the sale + 3 in stock = 5 available; 6 is too many
        let err = db
            .checkout()
            .amend_sale(&sale.id, 6, &c.id)
            .await
            .unwrap_err();
        match err {
            CheckoutError::Domain(CoreError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 5);
                assert_eq!(requested, 6);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Neither the sale row nor the stock moved
        let persisted = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(persisted.quantity, 2);
        assert_eq!(db.products().current_stock(&a.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_amend_reassign_client() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 1000, 10).await;
        let c1 = seed_client(&db, "C1").await;
        let c2 = seed_client(&db, "C2").await;
        let sale = seed_sale(&db, &a, &c1, 2, 1000).await;

        let amended = db.checkout().amend_sale(&sale.id, 2, &c2.id).await.unwrap();
        assert_eq!(amended.client_id, c2.id);

        let persisted = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(persisted.client_id, c2.id);
    }

    #[tokio::test]
    async fn test_amend_rejects_missing_sale_and_bad_inputs() {
        let db = test_db().await;
        let c = seed_client(&db, "C").await;

        let err = db
            .checkout()
            .amend_sale("missing", 1, &c.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Domain(CoreError::SaleNotFound(_))
        ));

        let err = db
            .checkout()
            .amend_sale("missing", 0, &c.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Domain(CoreError::InvalidQuantity(0))
        ));
    }

    #[tokio::test]
    async fn test_amend_rejects_deleted_client() {
        let db = test_db().await;
        let a = seed_product(&db, "A", 1000, 10).await;
        let c1 = seed_client(&db, "C1").await;
        let c2 = seed_client(&db, "C2").await;
        let sale = seed_sale(&db, &a, &c1, 2, 1000).await;

        db.clients().soft_delete(&c2.id).await.unwrap();

        let err = db
            .checkout()
            .amend_sale(&sale.id, 2, &c2.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Domain(CoreError::InvalidClient(_))
        ));

        // Unchanged
        let persisted = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(persisted.client_id, c1.id);
    }
}
