//! # studio-core: Pure Business Logic for Studio Manager
//!
//! Costing, order totals and stock rules for a fabrication studio
//! (3D printing / laser cutting). Every function here is pure: no database,
//! no network, no clock reads in the calculations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Studio Manager Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Order / Stock screens (front end)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │           studio-db::service (capability-gated commands)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ studio-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │ pricing  │ │  totals  │ │  quote   │ │  stock   │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │   auth   │ │validation│ │  money   │ │  report  │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          studio-db (SQLite repositories, stock reconciler)      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`pricing`] - Per-item cost / price / profit breakdown
//! - [`totals`] - Order-level financial totals
//! - [`quote`] - Prices a whole order form (line defaults, regional discount)
//! - [`stock`] - Delivery eligibility, stock deltas, manual adjustments
//! - [`auth`] - Roles and the explicit [`Capabilities`] object
//! - [`types`] - Domain types (Material, Order, StockRow, ...)
//! - [`money`] - BRL currency formatting
//! - [`report`] - Period summaries and dashboard metrics
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Floating Point on Purpose
//! Prices here are `f64`. The costing formulas are fixed business policy and
//! their results are compared against figures the studio already quotes, so
//! the arithmetic must be reproduced operation for operation. Rounding only
//! happens at display time ([`money::format_brl`]).
//!
//! ## Example Usage
//!
//! ```rust
//! use studio_core::pricing::{calculate_order_item, CalculationInputs};
//! use studio_core::types::{CostConfig, MaterialCost};
//!
//! let config = CostConfig {
//!     energy_per_h: 1.5,
//!     labor_per_h: 10.0,
//!     markup_material: 3.0,
//!     print_price_per_h: 25.0,
//!     base_fee: 5.0,
//!     min_order_price: 20.0,
//!     fortaleza_discount: 5.0,
//! };
//!
//! let inputs = CalculationInputs::new(2, 2.5, 150.0, MaterialCost::new(120.0), &config);
//! let result = calculate_order_item(&inputs);
//!
//! assert!((result.price_final - 113.0).abs() < 1e-9);
//! assert!((result.profit - 48.25).abs() < 1e-9);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod error;
pub mod money;
pub mod pricing;
pub mod quote;
pub mod report;
pub mod stock;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use auth::{Capabilities, Role};
pub use error::{CoreError, CoreResult, ValidationError};
pub use pricing::{calculate_order_item, CalculationInputs, CalculationResult};
pub use quote::{quote_order, NewOrder, OrderLineDraft, OrderQuote};
pub use report::{dashboard_metrics, summarize_orders, DashboardMetrics, OrderSummary};
pub use stock::{AdjustmentDirection, SkipReason, StockKey};
pub use totals::{calculate_order_totals, OrderTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used by the seed data and local development databases.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Reason recorded on movements created by a delivery.
pub const ORDER_DELIVERED_REASON: &str = "Pedido entregue";

/// `ref_type` recorded on movements that point back to an order.
pub const ORDER_REF_TYPE: &str = "order";

/// City whose orders get the fixed regional discount.
///
/// Matched case-insensitively as a substring of the order's city field.
pub const REGIONAL_DISCOUNT_CITY: &str = "fortaleza";

/// Markup multiplier used when the tenant never configured one.
pub const DEFAULT_MARKUP_MATERIAL: f64 = 1.5;
