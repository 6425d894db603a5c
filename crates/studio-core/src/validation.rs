//! # Validation Module
//!
//! Input validation for Studio Manager command handlers.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Order / stock forms                                          │
//! │  └── Line defaults (qty 0 → 1, NaN → 0), see quote::OrderLineDraft     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: studio-db::service command handler                           │
//! │  └── THIS MODULE: business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE (tenant, material, color) on stock                         │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use studio_core::validation::{validate_color, validate_adjustment_qty};
//!
//! validate_color("Preto").unwrap();
//! validate_adjustment_qty(250.0).unwrap();
//! ```

use crate::error::ValidationError;
use crate::quote::NewOrder;
use crate::types::{Product, TenantConfig};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_COLOR_LEN: usize = 50;
const MAX_NAME_LEN: usize = 200;
const MAX_REASON_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a filament / sheet color.
///
/// ## Example
/// ```rust
/// use studio_core::validation::validate_color;
///
/// assert!(validate_color("Azul Royal").is_ok());
/// assert!(validate_color("  ").is_err());
/// ```
pub fn validate_color(color: &str) -> ValidationResult<()> {
    required_text("color", color, MAX_COLOR_LEN)
}

/// Validates a material name.
pub fn validate_material_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, MAX_NAME_LEN)
}

/// Validates a client name.
pub fn validate_client_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, MAX_NAME_LEN)
}

/// Validates the operator's reason for a manual stock adjustment.
pub fn validate_adjustment_reason(reason: &str) -> ValidationResult<()> {
    required_text("reason", reason, MAX_REASON_LEN)
}

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity (after form defaults are applied).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "qty".to_string(),
        });
    }

    Ok(())
}

/// Validates a material price per kilogram.
///
/// ## Example
/// ```rust
/// use studio_core::validation::validate_price_per_kg;
///
/// assert!(validate_price_per_kg(120.0).is_ok());
/// assert!(validate_price_per_kg(0.0).is_ok());
/// assert!(validate_price_per_kg(-1.0).is_err());
/// assert!(validate_price_per_kg(f64::NAN).is_err());
/// ```
pub fn validate_price_per_kg(price: f64) -> ValidationResult<()> {
    non_negative("price_per_kg", price)
}

/// Validates every value set on a cost configuration row.
///
/// Unset values are fine; they fall back to the defaults.
pub fn validate_cost_config(config: &TenantConfig) -> ValidationResult<()> {
    for (field, value) in config.values() {
        if let Some(value) = value {
            non_negative(field, value)?;
        }
    }

    Ok(())
}

/// Validates the low-stock threshold of a stock row.
pub fn validate_min_stock(min_g: f64) -> ValidationResult<()> {
    non_negative("min_g", min_g)
}

/// Validates the grams of a manual stock adjustment.
///
/// The direction carries the sign, so the quantity itself must be positive.
pub fn validate_adjustment_qty(qty_g: f64) -> ValidationResult<()> {
    if qty_g.is_nan() {
        return Err(nan("qty_g"));
    }

    if qty_g <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "qty_g".to_string(),
        });
    }

    Ok(())
}

fn non_negative(field: &str, value: f64) -> ValidationResult<()> {
    if value.is_nan() {
        return Err(nan(field));
    }

    if value < 0.0 {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

fn nan(field: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a number".to_string(),
    }
}

/// Validates a catalog product: a name, and no negative averages or price.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    required_text("name", &product.name, MAX_NAME_LEN)?;

    for (field, value) in [
        ("avg_time_h", product.avg_time_h),
        ("avg_weight_g", product.avg_weight_g),
        ("fixed_price", product.fixed_price),
    ] {
        if let Some(value) = value {
            non_negative(field, value)?;
        }
    }

    Ok(())
}

// =============================================================================
// Order Validators
// =============================================================================

/// Validates an order form before it is priced and saved.
///
/// ## Rules
/// - A client is required
/// - At least one line
/// - Line quantities positive once defaults are applied
pub fn validate_new_order(order: &NewOrder) -> ValidationResult<()> {
    if order.client_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "client_id".to_string(),
        });
    }

    if order.lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    for line in &order.lines {
        validate_quantity(line.normalized().qty)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::OrderLineDraft;
    use chrono::NaiveDate;

    fn new_order(client_id: &str, lines: Vec<OrderLineDraft>) -> NewOrder {
        NewOrder {
            client_id: client_id.to_string(),
            order_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            status: None,
            payment_method: None,
            delivery_method: None,
            city: None,
            discount: 0.0,
            freight: 0.0,
            notes: None,
            lines,
        }
    }

    #[test]
    fn test_validate_color() {
        assert!(validate_color("Preto").is_ok());
        assert!(validate_color("").is_err());
        assert!(validate_color(&"A".repeat(51)).is_err());
        assert!(validate_color(&"Ã".repeat(50)).is_ok());
    }

    #[test]
    fn test_validate_material_name() {
        assert!(validate_material_name("PLA Silk").is_ok());
        assert!(matches!(
            validate_material_name(" "),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_material_name(&"x".repeat(201)),
            Err(ValidationError::TooLong { max: 200, .. })
        ));
    }

    #[test]
    fn test_validate_client_name() {
        assert!(validate_client_name("Ana Souza").is_ok());
        assert!(matches!(
            validate_client_name("   "),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_product() {
        let mut product = Product {
            id: "p1".to_string(),
            tenant_id: "t1".to_string(),
            name: "Vaso".to_string(),
            category: Default::default(),
            default_material_id: None,
            default_color: None,
            avg_time_h: Some(2.0),
            avg_weight_g: None,
            fixed_price: None,
            notes: None,
            created_at: chrono::Utc::now(),
        };
        assert!(validate_product(&product).is_ok());

        product.avg_weight_g = Some(-5.0);
        assert!(matches!(
            validate_product(&product),
            Err(ValidationError::MustBeNonNegative { field }) if field == "avg_weight_g"
        ));

        product.avg_weight_g = None;
        product.name = String::new();
        assert!(matches!(
            validate_product(&product),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_validate_adjustment_qty() {
        assert!(validate_adjustment_qty(0.5).is_ok());
        assert!(validate_adjustment_qty(0.0).is_err());
        assert!(validate_adjustment_qty(-10.0).is_err());
        assert!(matches!(
            validate_adjustment_qty(f64::NAN),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_cost_config() {
        let mut config = TenantConfig::empty("t1");
        assert!(validate_cost_config(&config).is_ok());

        config.markup_material = Some(3.0);
        config.min_order_price = Some(0.0);
        assert!(validate_cost_config(&config).is_ok());

        config.base_fee = Some(-1.0);
        match validate_cost_config(&config) {
            Err(ValidationError::MustBeNonNegative { field }) => assert_eq!(field, "base_fee"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_validate_new_order() {
        assert!(validate_new_order(&new_order("c1", vec![OrderLineDraft::default()])).is_ok());

        // qty 0 defaults to 1
        let zero_qty = OrderLineDraft {
            qty: 0,
            ..OrderLineDraft::default()
        };
        assert!(validate_new_order(&new_order("c1", vec![zero_qty])).is_ok());

        let negative = OrderLineDraft {
            qty: -2,
            ..OrderLineDraft::default()
        };
        assert!(validate_new_order(&new_order("c1", vec![negative])).is_err());

        assert!(validate_new_order(&new_order("", vec![OrderLineDraft::default()])).is_err());
        assert!(validate_new_order(&new_order("c1", vec![])).is_err());
    }
}
