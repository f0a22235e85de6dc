//! # Repository Module
//!
//! Database repository implementations for Stockbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │                                                                 │
//! │       │  db.products().get_by_id(&id)                                  │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── insert(&self, product)                                            │
//! │  ├── adjust_stock(&self, id, delta)                                    │
//! │  └── current_stock(&self, id)                                          │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Writes that must be atomic across entities (order + sales + stock +   │
//! │  revenue) do NOT live here - they live in the checkout module, which   │
//! │  runs them in one transaction.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD and stock adjustments
//! - [`client::ClientRepository`] - Client CRUD, soft delete, revenue
//! - [`order::OrderRepository`] - Order reads (orders are immutable)
//! - [`sale::SaleRepository`] - Sale reads

pub mod client;
pub mod order;
pub mod product;
pub mod sale;
