//! # studio-db: Database Layer for Studio Manager
//!
//! SQLite storage for the studio's catalog, orders and filament stock, the
//! stock reconciler that runs when an order is delivered, and the
//! capability-gated command handlers the screens call.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Studio Manager Data Flow                           │
//! │                                                                         │
//! │  Screen action (mark order delivered)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    studio-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   StudioService ──► Capabilities check (studio-core::auth)      │   │
//! │  │        │                                                        │   │
//! │  │        ├──► OrderRepository.update_status                       │   │
//! │  │        └──► StockReconciler.reconcile_delivery                  │   │
//! │  │                 │  one transaction per line                     │   │
//! │  │                 ▼                                               │   │
//! │  │             StockRepository (*_tx helpers)                      │   │
//! │  │                                                                 │   │
//! │  │   Database (pool.rs) ◄── Migrations (embedded)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and command error types
//! - [`repository`] - Tenant-scoped repositories
//! - [`reconcile`] - Stock reconciliation on delivery
//! - [`service`] - Capability-gated command handlers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use studio_core::{Capabilities, OrderStatus, Role};
//! use studio_db::{Database, DbConfig, StudioService};
//!
//! let db = Database::new(DbConfig::new("studio.db")).await?;
//! let service = StudioService::new(db);
//!
//! let caps = Capabilities::new(user_id, tenant_id, vec![Role::Operator]);
//! let change = service.change_status(&caps, &order_id, OrderStatus::Delivered).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod reconcile;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, ServiceError, ServiceResult};
pub use pool::{Database, DbConfig};
pub use reconcile::{ReconcileReport, ReconcilerSettings, StockReconciler};
pub use service::{CreateOrderResponse, PeriodReport, StatusChangeResponse, StudioService};

// Repository re-exports for convenience
pub use repository::client::ClientRepository;
pub use repository::config::ConfigRepository;
pub use repository::material::MaterialRepository;
pub use repository::order::{DeliveryLine, OrderRepository};
pub use repository::product::ProductRepository;
pub use repository::stock::StockRepository;

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=studio_db=trace` - Trace for this crate only
/// - Default: `info,studio=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,studio=debug,sqlx=warn"));

    // A second call (tests, embedding apps) keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
