//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD operations
//! - Stock adjustments (delta-based, never absolute)
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read-then-write (racy)                                      │
//! │     let stock = read();                                                 │
//! │     UPDATE products SET stock = {stock - 3} WHERE id = ?               │
//! │     Two concurrent sellers both read 5, both write, stock goes wrong.  │
//! │                                                                         │
//! │  ✅ CORRECT: guarded delta update                                      │
//! │     UPDATE products SET stock = stock + ?delta                         │
//! │     WHERE id = ? AND stock + ?delta >= 0                               │
//! │     ... then check rows_affected.                                      │
//! │                                                                         │
//! │  The WHERE clause serializes concurrent decrements: the second seller  │
//! │  simply fails the guard instead of driving stock negative.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockbook_core::validation::{validate_name, validate_price_cents, validate_uuid};
use stockbook_core::Product;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

/// Column list shared by the product queries.
const PRODUCT_COLUMNS: &str = "id, name, category_id, cost_price_cents, \
     selling_price_cents, stock, created_at, updated_at";

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products sorted by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Arguments
    /// * `product` - Product to insert (id should be generated beforehand,
    ///   see [`generate_product_id`])
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        validate_uuid(&product.id)?;
        validate_name(&product.name)?;
        validate_price_cents(product.selling_price_cents)?;
        validate_price_cents(product.cost_price_cents)?;

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category_id, cost_price_cents,
                selling_price_cents, stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.cost_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an existing product's catalog fields.
    ///
    /// Stock is deliberately excluded: it is mutated only through
    /// `adjust_stock` or the checkout/amendment transactions, so a stale
    /// admin edit can never clobber a concurrent sale's decrement.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validate_name(&product.name)?;
        validate_price_cents(product.selling_price_cents)?;
        validate_price_cents(product.cost_price_cents)?;

        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category_id = ?3,
                cost_price_cents = ?4,
                selling_price_cents = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.cost_price_cents)
        .bind(product.selling_price_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Adjusts product stock by a delta (negative for sales, positive for
    /// restocking), refusing any adjustment that would drive stock negative.
    ///
    /// ## Returns
    /// * `Ok(())` - Adjustment applied
    /// * `Err(DbError::NotFound)` - Product missing, or the guard rejected
    ///   the adjustment (callers that need to distinguish re-read the stock)
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1 AND stock + ?2 >= 0
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Reads the current stock level for a product.
    ///
    /// This is the `current_stock` read the validation layer uses.
    pub async fn current_stock(&self, id: &str) -> DbResult<i64> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        stock.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product.
    ///
    /// Fails with a foreign-key violation if sales still reference it;
    /// sold products must stay in the catalog for history.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
