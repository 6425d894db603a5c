//! # Order Quoting
//!
//! Prices a whole order form: every line against the material catalog and
//! the tenant's cost configuration, then the order totals.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order form                                                             │
//! │  ├── city ─────────────► contains "fortaleza"? → regional discount      │
//! │  ├── line 1 ──┐                                                         │
//! │  ├── line 2 ──┼──► normalize (qty 0 → 1, NaN → 0)                       │
//! │  └── line N ──┘        │                                                │
//! │                        ├── material unknown / no config → unpriced      │
//! │                        └── calculate_order_item → CalculationResult     │
//! │                                                                         │
//! │  priced lines + discount + freight ──► calculate_order_totals           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unpriced lines are still saved with the order, without a breakdown, and
//! do not count toward the totals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::pricing::{calculate_order_item, CalculationInputs, CalculationResult};
use crate::totals::{calculate_order_totals, OrderTotals};
use crate::types::{CostConfig, Material, OrderStatus, Product};
use crate::REGIONAL_DISCOUNT_CITY;

// =============================================================================
// Line Draft
// =============================================================================

/// One line of an order form, as typed by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineDraft {
    pub product_id: Option<String>,
    pub material_id: Option<String>,
    pub color: Option<String>,
    pub qty: i64,
    pub time_h: f64,
    pub weight_g: f64,
    pub fixed_price: Option<f64>,
    pub other_cost: f64,
}

impl Default for OrderLineDraft {
    fn default() -> Self {
        OrderLineDraft {
            product_id: None,
            material_id: None,
            color: None,
            qty: 1,
            time_h: 0.0,
            weight_g: 0.0,
            fixed_price: None,
            other_cost: 0.0,
        }
    }
}

impl OrderLineDraft {
    /// A line pre-filled from a catalog product's defaults.
    pub fn from_product(product: &Product) -> Self {
        OrderLineDraft {
            product_id: Some(product.id.clone()),
            material_id: product.default_material_id.clone(),
            color: product.default_color.clone(),
            qty: 1,
            time_h: product.avg_time_h.unwrap_or(0.0),
            weight_g: product.avg_weight_g.unwrap_or(0.0),
            fixed_price: product.fixed_price,
            other_cost: 0.0,
        }
    }

    /// Applies the form defaults: a zero quantity means one unit, NaN
    /// numbers mean zero, blank ids and colors mean none.
    pub fn normalized(&self) -> Self {
        OrderLineDraft {
            product_id: non_blank(self.product_id.as_deref()),
            material_id: non_blank(self.material_id.as_deref()),
            color: non_blank(self.color.as_deref()),
            qty: if self.qty == 0 { 1 } else { self.qty },
            time_h: or_zero(self.time_h),
            weight_g: or_zero(self.weight_g),
            fixed_price: self.fixed_price.filter(|p| !p.is_nan()),
            other_cost: or_zero(self.other_cost),
        }
    }
}

// =============================================================================
// New Order
// =============================================================================

/// An order form as submitted for saving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub client_id: String,
    pub order_date: NaiveDate,
    /// Defaults to [`OrderStatus::Quoted`].
    pub status: Option<OrderStatus>,
    pub payment_method: Option<String>,
    pub delivery_method: Option<String>,
    pub city: Option<String>,
    pub discount: f64,
    pub freight: f64,
    pub notes: Option<String>,
    pub lines: Vec<OrderLineDraft>,
}

impl NewOrder {
    /// Prices this form. See [`quote_order`].
    pub fn quote(&self, materials: &[Material], config: Option<&CostConfig>) -> OrderQuote {
        quote_order(
            &self.lines,
            materials,
            config,
            self.city.as_deref(),
            or_zero(self.discount),
            or_zero(self.freight),
        )
    }
}

// =============================================================================
// Quote
// =============================================================================

/// A priced order form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderQuote {
    /// Normalized lines, in form order.
    pub lines: Vec<OrderLineDraft>,
    /// Breakdown per line; `None` for unpriced lines.
    pub items: Vec<Option<CalculationResult>>,
    pub totals: OrderTotals,
    pub is_fortaleza: bool,
}

impl OrderQuote {
    /// Number of lines that could not be priced.
    pub fn unpriced_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_none()).count()
    }
}

/// Whether an order's city gets the regional discount.
///
/// ## Example
/// ```rust
/// use studio_core::quote::is_regional_discount_city;
///
/// assert!(is_regional_discount_city(Some("Fortaleza - CE")));
/// assert!(!is_regional_discount_city(Some("Recife")));
/// assert!(!is_regional_discount_city(None));
/// ```
pub fn is_regional_discount_city(city: Option<&str>) -> bool {
    city.map(|c| c.to_lowercase().contains(REGIONAL_DISCOUNT_CITY))
        .unwrap_or(false)
}

/// Prices a single normalized line.
///
/// Returns `None` when there is no cost configuration or no material.
pub fn price_line(
    line: &OrderLineDraft,
    material: Option<&Material>,
    config: Option<&CostConfig>,
    is_fortaleza: bool,
) -> Option<CalculationResult> {
    let config = config?;
    let material = material?;

    let inputs = CalculationInputs::new(
        line.qty,
        line.time_h,
        line.weight_g,
        material.cost(),
        config,
    )
    .fixed_price(line.fixed_price)
    .other_cost(line.other_cost)
    .fortaleza(is_fortaleza);

    Some(calculate_order_item(&inputs))
}

/// Prices every line of an order form and computes the totals.
///
/// `materials` is the catalog the form offers (usually the active
/// materials); a line whose material is not in it stays unpriced.
pub fn quote_order(
    lines: &[OrderLineDraft],
    materials: &[Material],
    config: Option<&CostConfig>,
    city: Option<&str>,
    discount: f64,
    freight: f64,
) -> OrderQuote {
    let is_fortaleza = is_regional_discount_city(city);

    let lines: Vec<OrderLineDraft> = lines.iter().map(OrderLineDraft::normalized).collect();

    let items: Vec<Option<CalculationResult>> = lines
        .iter()
        .map(|line| {
            let material = line
                .material_id
                .as_deref()
                .and_then(|id| materials.iter().find(|m| m.id == id));
            price_line(line, material, config, is_fortaleza)
        })
        .collect();

    let priced: Vec<CalculationResult> = items.iter().flatten().copied().collect();
    let totals = calculate_order_totals(&priced, discount, freight);

    OrderQuote {
        lines,
        items,
        totals,
        is_fortaleza,
    }
}

/// `Some(value)` unless the value is zero or NaN.
///
/// Order lines store unset machine time and mass as NULL.
pub fn non_zero(value: f64) -> Option<f64> {
    if value == 0.0 || value.is_nan() {
        None
    } else {
        Some(value)
    }
}

fn or_zero(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductCategory;
    use chrono::Utc;

    fn config() -> CostConfig {
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

    fn material(id: &str, price_per_kg: f64) -> Material {
        Material {
            id: id.to_string(),
            tenant_id: "t1".to_string(),
            name: format!("Material {id}"),
            price_per_kg,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn vase_line() -> OrderLineDraft {
        OrderLineDraft {
            material_id: Some("pla".to_string()),
            color: Some("Branco".to_string()),
            qty: 2,
            time_h: 2.5,
            weight_g: 150.0,
            ..OrderLineDraft::default()
        }
    }

    #[test]
    fn test_regional_city_detection() {
        assert!(is_regional_discount_city(Some("FORTALEZA - CE")));
        assert!(is_regional_discount_city(Some("Região de fortaleza")));
        assert!(!is_regional_discount_city(Some("São Paulo")));
        assert!(!is_regional_discount_city(Some("")));
    }

    #[test]
    fn test_quote_prices_lines_and_totals() {
        let materials = [material("pla", 120.0)];
        let config = config();
        let quote = quote_order(&[vase_line()], &materials, Some(&config), None, 10.0, 15.0);

        let item = quote.items[0].expect("line should be priced");
        assert!((item.price_final - 113.0).abs() < 1e-9);
        assert!((quote.totals.total_revenue - 118.0).abs() < 1e-9);
        assert!(!quote.is_fortaleza);
        assert_eq!(quote.unpriced_count(), 0);
    }

    #[test]
    fn test_quote_applies_regional_discount_from_city() {
        let materials = [material("pla", 120.0)];
        let config = config();
        let quote = quote_order(
            &[vase_line()],
            &materials,
            Some(&config),
            Some("Fortaleza"),
            0.0,
            0.0,
        );

        assert!(quote.is_fortaleza);
        let item = quote.items[0].expect("line should be priced");
        assert!((item.price_final - 108.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_material_is_unpriced_and_excluded() {
        let materials = [material("pla", 120.0)];
        let config = config();
        let mystery = OrderLineDraft {
            material_id: Some("resin".to_string()),
            ..vase_line()
        };

        let quote = quote_order(
            &[vase_line(), mystery],
            &materials,
            Some(&config),
            None,
            0.0,
            0.0,
        );

        assert!(quote.items[0].is_some());
        assert!(quote.items[1].is_none());
        assert_eq!(quote.unpriced_count(), 1);
        assert!((quote.totals.subtotal - 113.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_config_leaves_everything_unpriced() {
        let materials = [material("pla", 120.0)];
        let quote = quote_order(&[vase_line()], &materials, None, None, 0.0, 8.0);

        assert_eq!(quote.unpriced_count(), 1);
        assert_eq!(quote.totals.subtotal, 0.0);
        assert_eq!(quote.totals.total_revenue, 8.0);
    }

    #[test]
    fn test_normalization_defaults() {
        let line = OrderLineDraft {
            product_id: Some("  ".to_string()),
            qty: 0,
            time_h: f64::NAN,
            weight_g: f64::NAN,
            other_cost: f64::NAN,
            color: Some(" Azul ".to_string()),
            ..OrderLineDraft::default()
        }
        .normalized();

        assert_eq!(line.qty, 1);
        assert_eq!(line.time_h, 0.0);
        assert_eq!(line.weight_g, 0.0);
        assert_eq!(line.other_cost, 0.0);
        assert_eq!(line.product_id, None);
        assert_eq!(line.color.as_deref(), Some("Azul"));
    }

    #[test]
    fn test_line_from_product() {
        let product = Product {
            id: "p1".to_string(),
            tenant_id: "t1".to_string(),
            name: "Vaso Decorativo".to_string(),
            category: ProductCategory::Printing3d,
            default_material_id: Some("pla".to_string()),
            default_color: Some("Branco".to_string()),
            avg_time_h: Some(2.5),
            avg_weight_g: Some(150.0),
            fixed_price: None,
            notes: None,
            created_at: Utc::now(),
        };

        let line = OrderLineDraft::from_product(&product);
        assert_eq!(line.product_id.as_deref(), Some("p1"));
        assert_eq!(line.material_id.as_deref(), Some("pla"));
        assert_eq!(line.qty, 1);
        assert_eq!(line.time_h, 2.5);
        assert_eq!(line.weight_g, 150.0);
    }

    #[test]
    fn test_new_order_quote_uses_city_and_adjustments() {
        let materials = [material("pla", 120.0)];
        let config = config();
        let order = NewOrder {
            client_id: "c1".to_string(),
            order_date: NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            status: None,
            payment_method: Some("pix".to_string()),
            delivery_method: None,
            city: Some("fortaleza".to_string()),
            discount: 10.0,
            freight: f64::NAN,
            notes: None,
            lines: vec![vase_line()],
        };

        let quote = order.quote(&materials, Some(&config));
        assert!(quote.is_fortaleza);
        assert!((quote.totals.total_revenue - 98.0).abs() < 1e-9);
        assert_eq!(quote.totals.freight, 0.0);
    }

    #[test]
    fn test_non_zero() {
        assert_eq!(non_zero(0.0), None);
        assert_eq!(non_zero(f64::NAN), None);
        assert_eq!(non_zero(2.5), Some(2.5));
    }
}
