//! # Pricing Engine
//!
//! Turns one order line's physical inputs (machine time, filament mass,
//! quantity) and the tenant's [`CostConfig`] into a cost / price / profit
//! breakdown.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Line Pricing                                    │
//! │                                                                         │
//! │  cost_filament = weight_g × qty × (price_per_kg / 1000)                 │
//! │  cost_energy   = time_h × energy_per_h                                  │
//! │  cost_labor    = time_h × labor_per_h                                   │
//! │  cost_total    = filament + energy + labor + other_cost                 │
//! │                                                                         │
//! │  option_a (markup)     = cost_filament × markup_material                │
//! │  option_b (print time) = time_h × print_price_per_h                     │
//! │  price_variable        = max(option_a, option_b) + base_fee             │
//! │                                                                         │
//! │  price_final = fixed_price ?? price_variable                            │
//! │       │                                                                 │
//! │       ├── below min_order_price? → clamp to the floor                   │
//! │       │   (the floor wins over a fixed price too)                       │
//! │       │                                                                 │
//! │       └── regional order? → subtract fortaleza_discount                 │
//! │           (after the floor: may end up below it)                        │
//! │                                                                         │
//! │  profit         = price_final − cost_total   (may be negative)          │
//! │  margin_percent = 0 if price_final ≤ 0 else 100 × profit / price_final  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never fails and never validates: negative or nonsensical
//! inputs flow through the arithmetic. Callers validate first.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{CostConfig, MaterialCost};

// =============================================================================
// Inputs
// =============================================================================

/// Everything needed to price one order line.
///
/// ## Example
/// ```rust
/// use studio_core::pricing::CalculationInputs;
/// use studio_core::types::{CostConfig, MaterialCost};
///
/// let config = CostConfig::default();
/// let inputs = CalculationInputs::new(1, 1.0, 50.0, MaterialCost::new(120.0), &config)
///     .fixed_price(Some(80.0))
///     .other_cost(2.5)
///     .fortaleza(true);
///
/// assert_eq!(inputs.fixed_price, Some(80.0));
/// assert!(inputs.is_fortaleza);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculationInputs<'a> {
    /// Units ordered.
    pub qty: i64,
    /// Machine time in hours.
    pub time_h: f64,
    /// Material mass per unit in grams.
    pub weight_g: f64,
    pub material: MaterialCost,
    pub config: &'a CostConfig,
    /// Price agreed up front; replaces the variable price.
    pub fixed_price: Option<f64>,
    /// Extra flat cost (packaging, hardware, ...).
    pub other_cost: f64,
    /// Regional discount applies.
    pub is_fortaleza: bool,
}

impl<'a> CalculationInputs<'a> {
    /// Creates inputs with no fixed price, no extra cost and no regional
    /// discount.
    pub fn new(
        qty: i64,
        time_h: f64,
        weight_g: f64,
        material: MaterialCost,
        config: &'a CostConfig,
    ) -> Self {
        CalculationInputs {
            qty,
            time_h,
            weight_g,
            material,
            config,
            fixed_price: None,
            other_cost: 0.0,
            is_fortaleza: false,
        }
    }

    /// Sets the fixed price.
    pub fn fixed_price(mut self, fixed_price: Option<f64>) -> Self {
        self.fixed_price = fixed_price;
        self
    }

    /// Sets the extra flat cost.
    pub fn other_cost(mut self, other_cost: f64) -> Self {
        self.other_cost = other_cost;
        self
    }

    /// Sets whether the regional discount applies.
    pub fn fortaleza(mut self, is_fortaleza: bool) -> Self {
        self.is_fortaleza = is_fortaleza;
        self
    }
}

// =============================================================================
// Result
// =============================================================================

/// Cost / price / profit breakdown of one order line.
///
/// Persisted as JSON on the line item (`calculated_json`), so the field
/// names are part of the stored format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CalculationResult {
    pub cost_filament: f64,
    pub cost_energy: f64,
    pub cost_labor: f64,
    /// filament + energy + labor + other cost.
    pub cost_total: f64,
    /// Market-rate price before fixed price, floor and discount.
    pub price_variable: f64,
    pub price_final: f64,
    pub profit: f64,
    pub margin_percent: f64,
}

// =============================================================================
// Engine
// =============================================================================

/// Prices one order line.
///
/// Pure and deterministic: identical inputs give bit-identical results.
///
/// ## Example
/// ```rust
/// use studio_core::pricing::{calculate_order_item, CalculationInputs};
/// use studio_core::types::{CostConfig, MaterialCost};
///
/// let config = CostConfig { min_order_price: 20.0, ..CostConfig::default() };
///
/// // A tiny job is clamped to the minimum order price.
/// let inputs = CalculationInputs::new(1, 0.01, 1.0, MaterialCost::new(120.0), &config);
/// assert_eq!(calculate_order_item(&inputs).price_final, 20.0);
/// ```
pub fn calculate_order_item(inputs: &CalculationInputs<'_>) -> CalculationResult {
    let config = inputs.config;
    let qty = inputs.qty as f64;

    let cost_per_g = inputs.material.cost_per_g();
    let cost_filament = inputs.weight_g * qty * cost_per_g;
    let cost_energy = inputs.time_h * config.energy_per_h;
    let cost_labor = inputs.time_h * config.labor_per_h;
    let cost_total = cost_filament + cost_energy + cost_labor + inputs.other_cost;

    let option_a = cost_filament * config.markup_material;
    let option_b = inputs.time_h * config.print_price_per_h;
    let price_variable = larger(option_a, option_b) + config.base_fee;

    let mut price_final = inputs.fixed_price.unwrap_or(price_variable);

    if price_final < config.min_order_price {
        price_final = config.min_order_price;
    }

    // Applied after the floor on purpose: regional orders may go below it.
    if inputs.is_fortaleza {
        price_final -= config.fortaleza_discount;
    }

    let profit = price_final - cost_total;

    CalculationResult {
        cost_filament,
        cost_energy,
        cost_labor,
        cost_total,
        price_variable,
        price_final,
        profit,
        margin_percent: margin_percent(profit, price_final),
    }
}

/// `100 × profit / revenue`, or 0 when there is no positive revenue.
pub fn margin_percent(profit: f64, revenue: f64) -> f64 {
    if revenue > 0.0 {
        (profit / revenue) * 100.0
    } else {
        0.0
    }
}

/// Larger of two values; NaN in either position wins, like `Math.max`.
fn larger(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a >= b {
        a
    } else {
        b
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn studio_config() -> CostConfig {
        CostConfig {
            energy_per_h: 1.5,
            labor_per_h: 10.0,
            markup_material: 3.0,
            print_price_per_h: 25.0,
            base_fee: 5.0,
            min_order_price: 20.0,
            fortaleza_discount: 5.0,
        }
    }

    fn pla() -> MaterialCost {
        MaterialCost::new(120.0)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_decorative_vase_breakdown() {
        let config = studio_config();
        let result = calculate_order_item(&CalculationInputs::new(2, 2.5, 150.0, pla(), &config));

        assert_close(result.cost_filament, 36.0);
        assert_close(result.cost_energy, 3.75);
        assert_close(result.cost_labor, 25.0);
        assert_close(result.cost_total, 64.75);
        assert_close(result.price_variable, 113.0);
        assert_close(result.price_final, 113.0);
        assert_close(result.profit, 48.25);
        assert!((result.margin_percent - 42.7).abs() < 0.05);
    }

    #[test]
    fn test_regional_discount_applied() {
        let config = studio_config();
        let inputs = CalculationInputs::new(2, 2.5, 150.0, pla(), &config).fortaleza(true);
        let result = calculate_order_item(&inputs);

        assert_close(result.price_final, 108.0);
        assert_close(result.profit, 43.25);
        assert_close(result.price_variable, 113.0);
    }

    #[test]
    fn test_fixed_price_used_verbatim() {
        let config = studio_config();
        let inputs = CalculationInputs::new(1, 1.0, 50.0, pla(), &config).fixed_price(Some(80.0));
        let result = calculate_order_item(&inputs);

        assert_eq!(result.price_final, 80.0);
    }

    #[test]
    fn test_min_order_price_enforced() {
        let config = studio_config();
        let result = calculate_order_item(&CalculationInputs::new(1, 0.01, 1.0, pla(), &config));

        assert_eq!(result.price_final, 20.0);
    }

    #[test]
    fn test_floor_applies_to_fixed_price() {
        let config = studio_config();
        let inputs = CalculationInputs::new(1, 1.0, 50.0, pla(), &config).fixed_price(Some(10.0));

        assert_eq!(calculate_order_item(&inputs).price_final, 20.0);
    }

    #[test]
    fn test_regional_discount_can_go_below_floor() {
        let config = studio_config();
        let inputs = CalculationInputs::new(1, 0.01, 1.0, pla(), &config).fortaleza(true);
        let result = calculate_order_item(&inputs);

        // Clamped to 20 first, then 5 off.
        assert_eq!(result.price_final, 15.0);
        assert!(result.price_final < config.min_order_price);
    }

    #[test]
    fn test_print_time_option_wins_when_larger() {
        let config = studio_config();
        // 10 g of PLA for 4 h: markup option 3.6, print-time option 100.
        let result = calculate_order_item(&CalculationInputs::new(1, 4.0, 10.0, pla(), &config));

        assert_close(result.price_variable, 105.0);
    }

    #[test]
    fn test_other_cost_is_part_of_total() {
        let config = studio_config();
        let inputs = CalculationInputs::new(2, 2.5, 150.0, pla(), &config).other_cost(7.25);
        let result = calculate_order_item(&inputs);

        assert_close(
            result.cost_total,
            result.cost_filament + result.cost_energy + result.cost_labor + 7.25,
        );
        assert_close(result.cost_total, 72.0);
        // Extra cost changes profit, not price.
        assert_close(result.price_final, 113.0);
        assert_close(result.profit, 41.0);
    }

    #[test]
    fn test_margin_zero_when_price_not_positive() {
        let config = CostConfig {
            fortaleza_discount: 20.0,
            ..studio_config()
        };
        let inputs = CalculationInputs::new(1, 0.01, 1.0, pla(), &config).fortaleza(true);
        let result = calculate_order_item(&inputs);

        assert_eq!(result.price_final, 0.0);
        assert_eq!(result.margin_percent, 0.0);
        assert!(result.profit < 0.0);
    }

    #[test]
    fn test_margin_formula() {
        assert_eq!(margin_percent(25.0, 100.0), 25.0);
        assert_eq!(margin_percent(-10.0, 50.0), -20.0);
        assert_eq!(margin_percent(10.0, 0.0), 0.0);
        assert_eq!(margin_percent(10.0, -5.0), 0.0);
    }

    #[test]
    fn test_calculation_is_idempotent() {
        let config = studio_config();
        let inputs = CalculationInputs::new(3, 1.75, 42.5, MaterialCost::new(89.9), &config)
            .other_cost(1.1)
            .fortaleza(true);

        let first = calculate_order_item(&inputs);
        let second = calculate_order_item(&inputs);

        assert_eq!(first.price_final.to_bits(), second.price_final.to_bits());
        assert_eq!(first.cost_total.to_bits(), second.cost_total.to_bits());
        assert_eq!(first.margin_percent.to_bits(), second.margin_percent.to_bits());
    }

    #[test]
    fn test_filament_cost_matches_formula() {
        let config = studio_config();
        for (weight_g, qty, price_per_kg) in [(0.0, 1, 120.0), (12.5, 7, 95.0), (333.3, 3, 180.0)] {
            let material = MaterialCost::new(price_per_kg);
            let result =
                calculate_order_item(&CalculationInputs::new(qty, 1.0, weight_g, material, &config));
            let expected = weight_g * qty as f64 * (price_per_kg / 1000.0);
            assert_close(result.cost_filament, expected);
        }
    }

    #[test]
    fn test_result_json_field_names() {
        let config = studio_config();
        let result = calculate_order_item(&CalculationInputs::new(2, 2.5, 150.0, pla(), &config));
        let json = serde_json::to_value(result).unwrap();

        for key in [
            "cost_filament",
            "cost_energy",
            "cost_labor",
            "cost_total",
            "price_variable",
            "price_final",
            "profit",
            "margin_percent",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
