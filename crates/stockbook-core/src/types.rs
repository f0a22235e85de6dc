//! # Domain Types
//!
//! Core domain types used throughout Stockbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Client      │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name           │   │  name, contact  │   │  client_id (FK) │       │
//! │  │  selling_price  │   │  revenue_cents  │   │  total_cents    │       │
//! │  │  stock          │   │  status         │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │  ClientStatus   │   │  OrderStatus    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  order_id (FK)  │   │  Active         │   │  Completed      │       │
//! │  │  product_id(FK) │   │  Inactive       │   │  Cancelled      │       │
//! │  │  qty × price    │   │  Deleted        │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants Carried By These Types
//! - `Order.total_cents` always equals the sum of its Sale rows' amounts
//!   (enforced by the checkout transaction, asserted by tests)
//! - `Sale.amount_cents` always equals `unit_price_cents × quantity`
//! - Orders are immutable after creation: there is no update path

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// Stock is mutated only by the checkout transaction, sale amendment, or an
/// explicit admin stock adjustment - never by ad-hoc writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Optional category reference.
    pub category_id: Option<String>,

    /// Acquisition cost in cents (for margin reporting).
    pub cost_price_cents: i64,

    /// List selling price in cents. Cart lines default to this but may
    /// carry an overridden unit price.
    pub selling_price_cents: i64,

    /// Available inventory count. Never negative after a commit.
    pub stock: i64,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as a Money type.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Returns the cost price as a Money type.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    /// Checks whether the product can cover a sale of `quantity` units.
    #[inline]
    pub fn can_cover(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Client Status
// =============================================================================

/// Lifecycle status of a client record.
///
/// Clients are soft-deleted: `Deleted` clients keep their history but can no
/// longer be billed. `Inactive` clients remain billable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    /// Normal, billable client.
    Active,
    /// Dormant but billable.
    Inactive,
    /// Soft-deleted; rejected at checkout.
    Deleted,
}

impl Default for ClientStatus {
    fn default() -> Self {
        ClientStatus::Active
    }
}

// =============================================================================
// Client
// =============================================================================

/// A client (customer) record with cumulative revenue bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Client {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Contact phone number.
    pub phone: Option<String>,

    /// Contact email.
    pub email: Option<String>,

    /// Postal address.
    pub address: Option<String>,

    /// Cumulative sales total attributed to this client, in cents.
    /// Monotonically non-decreasing via sales (absent manual edits).
    pub revenue_cents: i64,

    /// Lifecycle status (soft delete).
    pub status: ClientStatus,

    /// When the client was created.
    pub created_at: DateTime<Utc>,

    /// When the client was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Returns the cumulative revenue as Money.
    #[inline]
    pub fn revenue(&self) -> Money {
        Money::from_cents(self.revenue_cents)
    }

    /// Checks whether this client can be billed (not soft-deleted).
    #[inline]
    pub fn is_billable(&self) -> bool {
        self.status != ClientStatus::Deleted
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Checkout wrote the order and all its side effects.
    Completed,
    /// Reserved for a future refund/cancellation flow.
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Completed
    }
}

// =============================================================================
// Order
// =============================================================================

/// One checkout, persisted. Append-only: orders have no update path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub client_id: String,
    /// Grand total in cents; always equals the sum of this order's
    /// sale amounts.
    pub total_cents: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Returns the order total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// One line item of an order.
///
/// The unit price is frozen at commit time (it may be an overridden custom
/// price, not the product's list price). Amendments recompute the amount
/// from THIS frozen price, never from the current list price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub client_id: String,
    /// Units sold; always positive.
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Line amount in cents; always equals unit_price_cents × quantity.
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the frozen unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
