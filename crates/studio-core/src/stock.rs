//! # Stock Rules
//!
//! The pure half of the stock ledger: which delivered lines draw down
//! filament, by how much, and how manual adjustments are signed. The
//! database half (read-modify-write + movement append) lives in
//! `studio-db::reconcile`.
//!
//! ## Delivery Eligibility
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order line on delivery                                                 │
//! │       │                                                                 │
//! │       ├── product not "Impressão 3D"?  → skip (NotPrinting)             │
//! │       ├── no material?                 → skip (NoMaterial)              │
//! │       ├── no / blank color?            → skip (NoColor)                 │
//! │       ├── weight_g missing or ≤ 0?     → skip (NoWeight)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StockKey { material_id, color }  +  delta = −(weight_g × qty)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Skips are business policy, not errors: delivering an order is never
//! blocked by inventory bookkeeping.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::types::{OrderItem, ProductCategory, StockMovement};

// =============================================================================
// Stock Key
// =============================================================================

/// Identifies a stock row within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub material_id: String,
    pub color: String,
}

// =============================================================================
// Skip Reasons
// =============================================================================

/// Why a delivered line did not move stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The product is not a 3D print (or the line has no product).
    NotPrinting,
    NoMaterial,
    NoColor,
    NoWeight,
    /// Nothing on hand is tracked for this material and color.
    NoStockRow,
    /// Already decremented for this order line (idempotent mode only).
    AlreadyReconciled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NotPrinting => "not a 3D printing product",
            SkipReason::NoMaterial => "no material",
            SkipReason::NoColor => "no color",
            SkipReason::NoWeight => "no weight",
            SkipReason::NoStockRow => "no stock row for material and color",
            SkipReason::AlreadyReconciled => "already reconciled",
        };
        f.write_str(text)
    }
}

// =============================================================================
// Delivery
// =============================================================================

/// A delivered line that will draw down stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDraw {
    pub key: StockKey,
    /// Signed grams, never positive.
    pub delta_g: f64,
}

/// Decides whether a delivered line moves stock, and by how much.
///
/// `category` is the category of the line's product, if it has one.
pub fn delivery_draw(
    category: Option<ProductCategory>,
    item: &OrderItem,
) -> Result<StockDraw, SkipReason> {
    if !category.map(|c| c.consumes_stock()).unwrap_or(false) {
        return Err(SkipReason::NotPrinting);
    }

    let material_id = item
        .material_id
        .as_deref()
        .filter(|m| !m.is_empty())
        .ok_or(SkipReason::NoMaterial)?;

    let color = item
        .color
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(SkipReason::NoColor)?;

    let weight_g = item
        .weight_g
        .filter(|w| *w > 0.0)
        .ok_or(SkipReason::NoWeight)?;

    Ok(StockDraw {
        key: StockKey {
            material_id: material_id.to_string(),
            color: color.to_string(),
        },
        delta_g: stock_delta(weight_g, item.qty),
    })
}

/// Grams consumed by a delivered line, as a signed delta.
///
/// ## Example
/// ```rust
/// use studio_core::stock::stock_delta;
///
/// assert_eq!(stock_delta(150.0, 2), -300.0);
/// ```
#[inline]
pub fn stock_delta(weight_g: f64, qty: i64) -> f64 {
    -(weight_g * qty as f64)
}

// =============================================================================
// Manual Adjustments
// =============================================================================

/// Direction of a manual stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentDirection {
    /// Purchase / restock ("entrada").
    Inbound,
    /// Loss, test prints, samples ("saída").
    Outbound,
}

impl AdjustmentDirection {
    /// Signs a positive quantity for this direction.
    pub fn signed(&self, qty_g: f64) -> f64 {
        match self {
            AdjustmentDirection::Inbound => qty_g,
            AdjustmentDirection::Outbound => -qty_g,
        }
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Sum of movement deltas starting from zero, in the given order.
///
/// For a row created empty, this equals its current quantity.
pub fn ledger_balance(movements: &[StockMovement]) -> f64 {
    movements.iter().fold(0.0, |sum, m| sum + m.qty_delta_g)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn printed_line() -> OrderItem {
        OrderItem {
            id: "i1".to_string(),
            tenant_id: "t1".to_string(),
            order_id: "o1".to_string(),
            position: 0,
            product_id: Some("p1".to_string()),
            material_id: Some("pla".to_string()),
            color: Some("Preto".to_string()),
            qty: 2,
            time_h: Some(2.5),
            weight_g: Some(150.0),
            fixed_price: None,
            other_cost: 0.0,
            calculated: None,
        }
    }

    #[test]
    fn test_eligible_line_draws_weight_times_qty() {
        let draw = delivery_draw(Some(ProductCategory::Printing3d), &printed_line()).unwrap();

        assert_eq!(draw.key.material_id, "pla");
        assert_eq!(draw.key.color, "Preto");
        assert_eq!(draw.delta_g, -300.0);
    }

    #[test]
    fn test_laser_and_productless_lines_skip() {
        let line = printed_line();
        assert_eq!(
            delivery_draw(Some(ProductCategory::Laser), &line),
            Err(SkipReason::NotPrinting)
        );
        assert_eq!(delivery_draw(None, &line), Err(SkipReason::NotPrinting));
    }

    #[test]
    fn test_missing_fields_skip() {
        let category = Some(ProductCategory::Printing3d);

        let mut line = printed_line();
        line.material_id = None;
        assert_eq!(delivery_draw(category, &line), Err(SkipReason::NoMaterial));

        let mut line = printed_line();
        line.color = Some(String::new());
        assert_eq!(delivery_draw(category, &line), Err(SkipReason::NoColor));

        let mut line = printed_line();
        line.color = None;
        assert_eq!(delivery_draw(category, &line), Err(SkipReason::NoColor));

        let mut line = printed_line();
        line.weight_g = Some(0.0);
        assert_eq!(delivery_draw(category, &line), Err(SkipReason::NoWeight));

        let mut line = printed_line();
        line.weight_g = None;
        assert_eq!(delivery_draw(category, &line), Err(SkipReason::NoWeight));
    }

    #[test]
    fn test_adjustment_sign() {
        assert_eq!(AdjustmentDirection::Inbound.signed(250.0), 250.0);
        assert_eq!(AdjustmentDirection::Outbound.signed(250.0), -250.0);
    }

    #[test]
    fn test_ledger_balance() {
        let movement = |delta: f64| StockMovement {
            id: "m".to_string(),
            tenant_id: "t1".to_string(),
            material_id: "pla".to_string(),
            color: "Preto".to_string(),
            qty_delta_g: delta,
            reason: "Compra".to_string(),
            ref_type: None,
            ref_id: None,
            ref_item_id: None,
            created_by: None,
            created_at: Utc::now(),
        };

        assert_eq!(ledger_balance(&[]), 0.0);
        assert_eq!(
            ledger_balance(&[movement(1000.0), movement(-300.0), movement(50.0)]),
            750.0
        );
    }
}
