//! # Reports
//!
//! Aggregates over stored order totals: the period report and the monthly
//! dashboard. Orders saved without totals count as zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::totals::OrderTotals;
use crate::types::{Order, OrderStatus};

/// Sums over a list of orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_count: usize,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
}

/// Headline figures for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    /// Revenue of delivered orders only.
    pub delivered_revenue: f64,
    /// Profit of delivered orders only.
    pub delivered_profit: f64,
    pub delivered_count: usize,
    /// Number of orders in each status (statuses with no orders omitted).
    pub status_counts: BTreeMap<OrderStatus, usize>,
}

/// Sums revenue, cost and profit over every order given.
pub fn summarize_orders(orders: &[Order]) -> OrderSummary {
    orders
        .iter()
        .fold(OrderSummary::default(), |mut summary, order| {
            let totals = totals_or_zero(order);
            summary.order_count += 1;
            summary.total_revenue += totals.total_revenue;
            summary.total_cost += totals.total_cost;
            summary.total_profit += totals.total_profit;
            summary
        })
}

/// Delivered revenue / profit and the status breakdown.
pub fn dashboard_metrics(orders: &[Order]) -> DashboardMetrics {
    let mut metrics = DashboardMetrics::default();

    for order in orders {
        *metrics.status_counts.entry(order.status).or_insert(0) += 1;

        if order.status.is_delivered() {
            let totals = totals_or_zero(order);
            metrics.delivered_count += 1;
            metrics.delivered_revenue += totals.total_revenue;
            metrics.delivered_profit += totals.total_profit;
        }
    }

    metrics
}

fn totals_or_zero(order: &Order) -> OrderTotals {
    order.totals.unwrap_or(OrderTotals {
        subtotal: 0.0,
        discount: 0.0,
        freight: 0.0,
        total_revenue: 0.0,
        total_cost: 0.0,
        total_profit: 0.0,
        margin: 0.0,
    })
}
