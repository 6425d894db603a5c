//! # Order Totals
//!
//! Folds the per-line breakdowns of an order plus its discount and freight
//! into order-level figures.
//!
//! ```text
//! subtotal      = Σ price_final
//! total_cost    = Σ cost_total
//! total_revenue = subtotal − discount + freight
//! total_profit  = total_revenue − total_cost
//! margin        = 0 if total_revenue ≤ 0 else 100 × total_profit / total_revenue
//! ```
//!
//! Sums run in input order starting from `0.0`, so results are reproducible.
//! Discount and freight are not sign-checked.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::pricing::{margin_percent, CalculationResult};

/// Order-level financial totals.
///
/// Persisted as JSON on the order (`totals_json`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub discount: f64,
    pub freight: f64,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
    pub margin: f64,
}

/// Computes order totals from the priced lines.
///
/// ## Example
/// ```rust
/// use studio_core::totals::calculate_order_totals;
///
/// let totals = calculate_order_totals(&[], 10.0, 15.0);
/// assert_eq!(totals.subtotal, 0.0);
/// assert_eq!(totals.total_revenue, 5.0);
/// ```
pub fn calculate_order_totals(
    items: &[CalculationResult],
    discount: f64,
    freight: f64,
) -> OrderTotals {
    let subtotal = items.iter().fold(0.0, |sum, item| sum + item.price_final);
    let total_cost = items.iter().fold(0.0, |sum, item| sum + item.cost_total);
    let total_revenue = subtotal - discount + freight;
    let total_profit = total_revenue - total_cost;

    OrderTotals {
        subtotal,
        discount,
        freight,
        total_revenue,
        total_cost,
        total_profit,
        margin: margin_percent(total_profit, total_revenue),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
