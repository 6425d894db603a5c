//! # Repository Module
//!
//! Tenant-scoped data access for Studio Manager.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StudioService / StockReconciler                                        │
//! │       │                                                                 │
//! │       │  db.stock().adjust(tenant, stock_id, -50.0, "Perda", user)      │
//! │       ▼                                                                 │
//! │  StockRepository                                                        │
//! │  ├── create / get_by_id / find / list / list_low                        │
//! │  ├── adjust (row + movement, one transaction)                           │
//! │  └── *_tx helpers for callers that own the transaction                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every query takes the tenant id and filters on it. Nothing here checks
//! roles; that happens one layer up in [`crate::service`].
//!
//! ## Available Repositories
//!
//! - [`client::ClientRepository`] - Clients orders belong to
//! - [`config::ConfigRepository`] - Per-tenant cost configuration
//! - [`material::MaterialRepository`] - Material catalog
//! - [`product::ProductRepository`] - Product catalog
//! - [`order::OrderRepository`] - Orders, lines and delivery lines
//! - [`stock::StockRepository`] - Stock rows and the movement ledger

pub mod client;
pub mod config;
pub mod material;
pub mod order;
pub mod product;
pub mod stock;
