//! # stockbook-db: Storage Layer for Stockbook
//!
//! This crate provides database access for Stockbook. It uses SQLite for
//! local storage with sqlx for async operations, and owns the one piece of
//! the system with real transactional invariants: the checkout flow.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Stockbook Data Flow                               │
//! │                                                                         │
//! │  Caller (UI / API layer)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockbook-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌──────────────┐     │   │
//! │  │   │   Database   │   │ Repositories  │   │   Checkout   │     │   │
//! │  │   │  (pool.rs)   │   │ (product.rs,  │   │ (checkout.rs)│     │   │
//! │  │   │              │   │  client.rs,   │   │              │     │   │
//! │  │   │ SqlitePool   │◄──│  order.rs,    │   │ commit()     │     │   │
//! │  │   │ Connection   │   │  sale.rs)     │   │ amend_sale() │     │   │
//! │  │   │ Management   │   │               │   │ ONE txn each │     │   │
//! │  │   └──────────────┘   └───────────────┘   └──────────────┘     │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL mode, foreign keys on)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, client, order, sale)
//! - [`checkout`] - The order commit orchestrator and sale amendment
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockbook_db::{Database, DbConfig};
//!
//! // Create database with default config
//! let config = DbConfig::new("path/to/stockbook.db");
//! let db = Database::new(config).await?;
//!
//! // Commit a cart for a client - one atomic transaction
//! let receipt = db.checkout().commit(&cart, &client_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{Checkout, CheckoutError, CommitStep, OrderReceipt};
pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::client::ClientRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
