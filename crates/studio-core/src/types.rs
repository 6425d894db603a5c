//! # Domain Types
//!
//! Core domain types used throughout Studio Manager.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Material     │   │  TenantConfig   │   │    Product      │       │
//! │  │  price_per_kg   │   │  → CostConfig   │   │  category       │       │
//! │  └────────┬────────┘   └────────┬────────┘   │  defaults       │       │
//! │           │                     │            └────────┬────────┘       │
//! │           ▼                     ▼                     ▼                │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │   Order ──< OrderItem (calculated: CalculationResult)       │       │
//! │  │   totals: OrderTotals        status: OrderStatus            │       │
//! │  └──────────────────────────────┬──────────────────────────────┘       │
//! │                                 │ Delivered                             │
//! │                                 ▼                                       │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │    StockRow     │◄──│  StockMovement  │  (append-only ledger)       │
//! │  │ (material,color)│   │  qty_delta_g    │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity carries a `tenant_id`; all lookups are tenant-scoped.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::pricing::CalculationResult;
use crate::totals::OrderTotals;
use crate::DEFAULT_MARKUP_MATERIAL;

// =============================================================================
// Materials
// =============================================================================

/// A printable / cuttable material (PLA, PETG, MDF sheet, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Material {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// Price per kilogram.
    pub price_per_kg: f64,
    /// Inactive materials stay referenced by old orders but are not offered.
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Material {
    /// The slice of the material the pricing engine needs.
    #[inline]
    pub fn cost(&self) -> MaterialCost {
        MaterialCost::new(self.price_per_kg)
    }
}

/// Material price as seen by the pricing engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialCost {
    pub price_per_kg: f64,
}

impl MaterialCost {
    #[inline]
    pub const fn new(price_per_kg: f64) -> Self {
        MaterialCost { price_per_kg }
    }

    /// Cost of a single gram.
    #[inline]
    pub fn cost_per_g(&self) -> f64 {
        self.price_per_kg / 1000.0
    }
}

impl From<&Material> for MaterialCost {
    fn from(material: &Material) -> Self {
        material.cost()
    }
}

// =============================================================================
// Cost Configuration
// =============================================================================

/// The tenant's cost parameters, with every value resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CostConfig {
    /// Electricity per hour of machine time.
    pub energy_per_h: f64,
    /// Operator labor per hour of machine time.
    pub labor_per_h: f64,
    /// Multiplier applied to the filament cost (typically ≥ 1).
    pub markup_material: f64,
    /// Market rate charged per hour of printing.
    pub print_price_per_h: f64,
    /// Fixed fee added to the variable price.
    pub base_fee: f64,
    /// Floor for the final price of a line.
    pub min_order_price: f64,
    /// Fixed amount taken off lines of orders shipped to the discount city.
    pub fortaleza_discount: f64,
}

impl Default for CostConfig {
    /// Every parameter zero except the markup, which defaults to 1.5.
    fn default() -> Self {
        CostConfig {
            energy_per_h: 0.0,
            labor_per_h: 0.0,
            markup_material: DEFAULT_MARKUP_MATERIAL,
            print_price_per_h: 0.0,
            base_fee: 0.0,
            min_order_price: 0.0,
            fortaleza_discount: 0.0,
        }
    }
}

/// The persisted per-tenant configuration row.
///
/// Columns are nullable because operators fill the settings screen
/// gradually. Use [`TenantConfig::cost_config`] to get resolved values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TenantConfig {
    pub tenant_id: String,
    pub energy_per_h: Option<f64>,
    pub labor_per_h: Option<f64>,
    pub markup_material: Option<f64>,
    pub print_price_per_h: Option<f64>,
    pub base_fee: Option<f64>,
    pub min_order_price: Option<f64>,
    pub fortaleza_discount: Option<f64>,
    /// Default packaging cost suggested on new order lines.
    pub packaging_default: Option<f64>,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl TenantConfig {
    /// An empty configuration row for a tenant.
    pub fn empty(tenant_id: impl Into<String>) -> Self {
        TenantConfig {
            tenant_id: tenant_id.into(),
            energy_per_h: None,
            labor_per_h: None,
            markup_material: None,
            print_price_per_h: None,
            base_fee: None,
            min_order_price: None,
            fortaleza_discount: None,
            packaging_default: None,
            updated_at: None,
            updated_by: None,
        }
    }

    /// Resolves missing values: markup falls back to 1.5, the rest to 0.
    pub fn cost_config(&self) -> CostConfig {
        let defaults = CostConfig::default();
        CostConfig {
            energy_per_h: self.energy_per_h.unwrap_or(defaults.energy_per_h),
            labor_per_h: self.labor_per_h.unwrap_or(defaults.labor_per_h),
            markup_material: self.markup_material.unwrap_or(defaults.markup_material),
            print_price_per_h: self
                .print_price_per_h
                .unwrap_or(defaults.print_price_per_h),
            base_fee: self.base_fee.unwrap_or(defaults.base_fee),
            min_order_price: self.min_order_price.unwrap_or(defaults.min_order_price),
            fortaleza_discount: self
                .fortaleza_discount
                .unwrap_or(defaults.fortaleza_discount),
        }
    }

    /// Iterates over the configured numeric values with their column names.
    pub fn values(&self) -> impl Iterator<Item = (&'static str, Option<f64>)> {
        [
            ("energy_per_h", self.energy_per_h),
            ("labor_per_h", self.labor_per_h),
            ("markup_material", self.markup_material),
            ("print_price_per_h", self.print_price_per_h),
            ("base_fee", self.base_fee),
            ("min_order_price", self.min_order_price),
            ("fortaleza_discount", self.fortaleza_discount),
            ("packaging_default", self.packaging_default),
        ]
        .into_iter()
    }
}

// =============================================================================
// Products
// =============================================================================

/// What kind of job a product is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    /// FDM printing. The only category that consumes filament stock.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "printing_3d"))]
    #[serde(rename = "printing_3d")]
    Printing3d,
    /// Laser cutting / engraving.
    Laser,
}

impl ProductCategory {
    /// Label shown on screens and exports.
    pub const fn label(&self) -> &'static str {
        match self {
            ProductCategory::Printing3d => "Impressão 3D",
            ProductCategory::Laser => "Laser",
        }
    }

    /// Whether delivering this kind of product draws down filament stock.
    #[inline]
    pub const fn consumes_stock(&self) -> bool {
        matches!(self, ProductCategory::Printing3d)
    }
}

impl Default for ProductCategory {
    fn default() -> Self {
        ProductCategory::Printing3d
    }
}

/// A catalog product. Its averages pre-fill new order lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub category: ProductCategory,
    pub default_material_id: Option<String>,
    pub default_color: Option<String>,
    pub avg_time_h: Option<f64>,
    pub avg_weight_g: Option<f64>,
    pub fixed_price: Option<f64>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Clients
// =============================================================================

/// Someone the studio sells to. Every order belongs to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub whatsapp: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    /// How the client found the studio (Instagram, referral, ...).
    pub channel: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Orders
// =============================================================================

/// Order workflow status.
///
/// Any status can be set from any other; only `Delivered` has a side effect
/// (the stock reconciler).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Quote sent, not yet approved.
    Quoted,
    Approved,
    Producing,
    Ready,
    /// Handed to the client. Triggers the stock reconciler.
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in workflow order.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Quoted,
        OrderStatus::Approved,
        OrderStatus::Producing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Label shown on screens and exports.
    pub const fn label(&self) -> &'static str {
        match self {
            OrderStatus::Quoted => "Orçado",
            OrderStatus::Approved => "Aprovado",
            OrderStatus::Producing => "Produzindo",
            OrderStatus::Ready => "Pronto",
            OrderStatus::Delivered => "Entregue",
            OrderStatus::Cancelled => "Cancelado",
        }
    }

    /// Stored / wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Quoted => "quoted",
            OrderStatus::Approved => "approved",
            OrderStatus::Producing => "producing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    #[inline]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Quoted
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A client order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub tenant_id: String,
    pub client_id: String,
    #[ts(as = "String")]
    pub order_date: NaiveDate,
    pub status: OrderStatus,
    pub payment_method: Option<String>,
    pub delivery_method: Option<String>,
    pub city: Option<String>,
    pub discount: f64,
    pub freight: f64,
    pub notes: Option<String>,
    /// Totals computed when the order was saved.
    pub totals: Option<OrderTotals>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A line of an order, with the inputs it was priced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub tenant_id: String,
    pub order_id: String,
    /// Persisted line order (0-based).
    pub position: i64,
    pub product_id: Option<String>,
    pub material_id: Option<String>,
    pub color: Option<String>,
    pub qty: i64,
    pub time_h: Option<f64>,
    pub weight_g: Option<f64>,
    pub fixed_price: Option<f64>,
    pub other_cost: f64,
    /// Breakdown computed when the order was saved; `None` if unpriced.
    pub calculated: Option<CalculationResult>,
}

// =============================================================================
// Stock
// =============================================================================

/// On-hand quantity of one material in one color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockRow {
    pub id: String,
    pub tenant_id: String,
    pub material_id: String,
    pub color: String,
    /// Grams on hand. `None` until the first movement.
    pub qty_g: Option<f64>,
    /// Threshold at or below which the row is low.
    pub min_g: Option<f64>,
    /// Bumped on every quantity change.
    pub version: i64,
}

impl StockRow {
    /// Grams on hand, treating an unset quantity as zero.
    #[inline]
    pub fn quantity(&self) -> f64 {
        self.qty_g.unwrap_or(0.0)
    }

    /// Whether the row is at or below its minimum.
    pub fn is_low(&self) -> bool {
        self.quantity() <= self.min_g.unwrap_or(0.0)
    }
}

/// An immutable ledger entry recording a signed change to a stock row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub tenant_id: String,
    pub material_id: String,
    pub color: String,
    /// Signed change in grams (negative for consumption).
    pub qty_delta_g: f64,
    pub reason: String,
    /// `"order"` when the movement comes from a delivery.
    pub ref_type: Option<String>,
    /// Originating order.
    pub ref_id: Option<String>,
    /// Originating order line.
    pub ref_item_id: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Whether this movement was produced by an order delivery.
    pub fn is_order_delivery(&self) -> bool {
        self.ref_type.as_deref() == Some(crate::ORDER_REF_TYPE)
            && self.reason == crate::ORDER_DELIVERED_REASON
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
