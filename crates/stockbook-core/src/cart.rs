//! # Cart Module
//!
//! The transient cart: a session-local selection of products and quantities
//! prior to checkout. It has no persisted identity and is discarded on
//! navigation away or explicit clear - only the checkout transaction turns
//! it into durable Order and Sale rows.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cart Lifecycle                                   │
//! │                                                                         │
//! │  Caller Action                 Cart Change                              │
//! │  ─────────────                 ───────────                              │
//! │                                                                         │
//! │  Pick product ───────────────► add_line(product, qty)                  │
//! │                                 (merges if already present)             │
//! │                                                                         │
//! │  Override price ─────────────► add_line_with_price(product, qty, p)    │
//! │                                                                         │
//! │  Change quantity ────────────► set_quantity(product_id, qty)           │
//! │                                                                         │
//! │  Remove / abandon ───────────► remove_line(id) / clear()               │
//! │                                                                         │
//! │  Checkout ───────────────────► Checkout::commit(&cart, client_id)      │
//! │                                 (stockbook-db takes over; stock is      │
//! │                                  re-read there, snapshots not trusted)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `product_id` (adding the same product merges)
//! - Quantity must be > 0 and ≤ MAX_LINE_QUANTITY
//! - Quantity must not exceed the stock snapshot taken at add-time
//! - Maximum lines: MAX_CART_LINES

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation::{validate_cart_size, validate_price_cents, validate_quantity};
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// One line of the cart.
///
/// ## Design Notes
/// - `product_id`: reference to the product (for commit-time lookup)
/// - `product_name`, `unit_price_cents`, `stock_snapshot`: frozen copies of
///   product data at add-time, so the cart displays consistent data even if
///   the catalog changes underneath it
/// - the stock snapshot is an add-time convenience check ONLY; checkout
///   re-reads stock inside its transaction and never trusts this value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product ID (UUID).
    pub product_id: String,

    /// Product name at time of adding (frozen).
    pub product_name: String,

    /// Unit price in cents. Defaults to the product's selling price; may be
    /// a custom overridden price, but never negative.
    pub unit_price_cents: i64,

    /// Quantity selected.
    pub quantity: i64,

    /// Product stock at time of adding (frozen; advisory only).
    pub stock_snapshot: i64,

    /// When this line was added to the cart.
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Creates a cart line from a product at its list selling price.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            unit_price_cents: product.selling_price_cents,
            quantity,
            stock_snapshot: product.stock,
            added_at: Utc::now(),
        }
    }

    /// Calculates the line amount (unit price × quantity), exact in cents.
    #[inline]
    pub fn amount_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }

    /// Returns the line amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents())
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The transient cart.
///
/// Exclusively owned by the active selection session; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Lines in the cart.
    lines: Vec<CartLine>,

    /// When the cart was created/last cleared.
    pub created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a product at its list selling price, merging quantities if the
    /// product is already in the cart.
    pub fn add_line(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        self.add_line_with_price(product, quantity, product.selling_price_cents)
    }

    /// Adds a product with an overridden unit price.
    ///
    /// ## Behavior
    /// - If product already in cart: merges quantities and takes the new
    ///   unit price (the override wins)
    /// - If product not in cart: appends a new line
    ///
    /// ## Errors
    /// - `InvalidQuantity` / `QuantityTooLarge` for bad quantities
    /// - `InvalidPrice` for a negative unit price
    /// - `InsufficientStock` if the merged quantity exceeds the add-time
    ///   stock snapshot
    /// - `CartTooLarge` when the line limit is reached
    pub fn add_line_with_price(
        &mut self,
        product: &Product,
        quantity: i64,
        unit_price_cents: i64,
    ) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity(quantity));
        }
        validate_price_cents(unit_price_cents).map_err(|_| CoreError::InvalidPrice(unit_price_cents))?;

        // Merge with an existing line for the same product
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let new_qty = line.quantity + quantity;
            if new_qty > MAX_LINE_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_LINE_QUANTITY,
                });
            }
            if new_qty > line.stock_snapshot {
                return Err(CoreError::InsufficientStock {
                    product_id: product.id.clone(),
                    available: line.stock_snapshot,
                    requested: new_qty,
                });
            }
            line.quantity = new_qty;
            line.unit_price_cents = unit_price_cents;
            return Ok(());
        }

        validate_quantity(quantity)?;

        if quantity > product.stock {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                available: product.stock,
                requested: quantity,
            });
        }

        validate_cart_size(self.lines.len()).map_err(|_| CoreError::CartTooLarge {
            max: MAX_CART_LINES,
        })?;

        let mut line = CartLine::from_product(product, quantity);
        line.unit_price_cents = unit_price_cents;
        self.lines.push(line);
        Ok(())
    }

    /// Updates the quantity of a line in the cart.
    ///
    /// ## Behavior
    /// - If quantity is 0: removes the line
    /// - If product not found: returns `ProductNotFound`
    /// - The add-time stock snapshot still bounds the new quantity
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_line(product_id);
        }

        validate_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        if quantity > line.stock_snapshot {
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                available: line.stock_snapshot,
                requested: quantity,
            });
        }

        line.quantity = quantity;
        Ok(())
    }

    /// Removes a line from the cart by product ID.
    pub fn remove_line(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == initial_len {
            Err(CoreError::ProductNotFound(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Clears all lines from the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.created_at = Utc::now();
    }

    /// Returns the lines in the cart.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns the number of unique lines in the cart.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Calculates the grand total (sum of line amounts), exact in cents.
    pub fn total_cents(&self) -> i64 {
        self.lines.iter().map(|l| l.amount_cents()).sum()
    }

    /// Returns the grand total as Money.
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents())
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(id: &str, selling_price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            category_id: None,
            cost_price_cents: selling_price_cents / 2,
            selling_price_cents,
            stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cart_add_line() {
        let mut cart = Cart::new();
        let product = test_product("p1", 999, 10); // $9.99

        cart.add_line(&product, 2).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.total_cents(), 1998); // $19.98
    }

    #[test]
    fn test_cart_add_same_product_merges_quantity() {
        let mut cart = Cart::new();
        let product = test_product("p1", 999, 10);

        cart.add_line(&product, 2).unwrap();
        cart.add_line(&product, 3).unwrap();

        assert_eq!(cart.line_count(), 1); // Still one unique line
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_cart_price_override() {
        let mut cart = Cart::new();
        let product = test_product("p1", 1000, 10);

        // Custom negotiated price, below list
        cart.add_line_with_price(&product, 3, 800).unwrap();

        assert_eq!(cart.total_cents(), 2400);
        assert_eq!(cart.lines()[0].unit_price_cents, 800);
    }

    #[test]
    fn test_cart_rejects_negative_price_override() {
        let mut cart = Cart::new();
        let product = test_product("p1", 1000, 10);

        let err = cart.add_line_with_price(&product, 1, -50).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPrice(-50)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_rejects_price_above_maximum() {
        let mut cart = Cart::new();
        let product = test_product("p1", 1000, 999);

        // A price this large would overflow i64 once multiplied by a full
        // quantity; the cap rejects it at the door
        let err = cart
            .add_line_with_price(&product, 999, i64::MAX / 2)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPrice(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_line_limit() {
        let mut cart = Cart::new();
        for i in 0..crate::MAX_CART_LINES {
            let product = test_product(&format!("p{i}"), 100, 10);
            cart.add_line(&product, 1).unwrap();
        }

        let one_too_many = test_product("overflow", 100, 10);
        let err = cart.add_line(&one_too_many, 1).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));
    }

    #[test]
    fn test_cart_rejects_quantity_over_stock_snapshot() {
        let mut cart = Cart::new();
        let product = test_product("p1", 1000, 5);

        let err = cart.add_line(&product, 6).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            }
        ));
    }

    #[test]
    fn test_cart_merge_respects_stock_snapshot() {
        let mut cart = Cart::new();
        let product = test_product("p1", 1000, 5);

        cart.add_line(&product, 3).unwrap();
        let err = cart.add_line(&product, 3).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        // Failed merge must not mutate the existing line
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_cart_rejects_zero_and_negative_quantity() {
        let mut cart = Cart::new();
        let product = test_product("p1", 1000, 10);

        assert!(matches!(
            cart.add_line(&product, 0),
            Err(CoreError::InvalidQuantity(0))
        ));
        assert!(matches!(
            cart.add_line(&product, -2),
            Err(CoreError::InvalidQuantity(-2))
        ));
    }

    #[test]
    fn test_cart_set_quantity() {
        let mut cart = Cart::new();
        let product = test_product("p1", 1000, 10);

        cart.add_line(&product, 2).unwrap();
        cart.set_quantity("p1", 5).unwrap();
        assert_eq!(cart.total_quantity(), 5);

        // Zero removes the line
        cart.set_quantity("p1", 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_set_quantity_unknown_product() {
        let mut cart = Cart::new();
        let err = cart.set_quantity("missing", 1).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(_)));
    }

    #[test]
    fn test_cart_remove_and_clear() {
        let mut cart = Cart::new();
        let a = test_product("a", 1000, 10);
        let b = test_product("b", 500, 10);

        cart.add_line(&a, 1).unwrap();
        cart.add_line(&b, 2).unwrap();
        assert_eq!(cart.line_count(), 2);

        cart.remove_line("a").unwrap();
        assert_eq!(cart.line_count(), 1);

        cart.clear();
        assert!(cart.is_empty());
    }

    /// A at $100 × 2 plus B at $50 × 1 totals exactly $250, no rounding.
    #[test]
    fn test_cart_total_matches_expected_scenario() {
        let mut cart = Cart::new();
        let a = test_product("a", 10000, 5);
        let b = test_product("b", 5000, 3);

        cart.add_line(&a, 2).unwrap();
        cart.add_line(&b, 1).unwrap();

        assert_eq!(cart.total_cents(), 25000); // $250.00
    }
}
