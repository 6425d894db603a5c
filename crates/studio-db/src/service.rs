//! # Command Handlers
//!
//! [`StudioService`] is the entry point the screens call. Every handler takes
//! the caller's [`Capabilities`] explicitly; its `tenant_id` scopes every read
//! and write, and its roles gate the writes.
//!
//! ```text
//! Handler              Needs        Side effects
//! ───────────────────  ───────────  ──────────────────────────────────────
//! quote_order          -            none
//! create_order         edit         order + lines (one transaction)
//! save_client          edit         client
//! list_clients         -            none
//! change_status        edit         status; Delivered → stock reconciler
//! create_stock_row     edit         stock row
//! adjust_stock         edit         stock row + movement (one transaction)
//! save_cost_config     admin        config row
//! save_material        admin        material
//! save_product         edit         product
//! period_report        -            none
//! dashboard            -            none
//! low_stock            -            none
//! ```

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ServiceResult;
use crate::pool::Database;
use crate::reconcile::{ReconcileReport, ReconcilerSettings, StockReconciler};
use crate::repository::client::generate_client_id;
use crate::repository::material::generate_material_id;
use crate::repository::order::generate_order_id;
use crate::repository::product::generate_product_id;
use crate::repository::stock::generate_stock_id;
use studio_core::quote::non_zero;
use studio_core::validation::{
    validate_adjustment_qty, validate_adjustment_reason, validate_client_name, validate_color,
    validate_cost_config, validate_material_name, validate_min_stock, validate_new_order,
    validate_price_per_kg, validate_product,
};
use studio_core::{
    dashboard_metrics, summarize_orders, AdjustmentDirection, Capabilities, Client, CoreError,
    DashboardMetrics, Material, NewOrder, Order, OrderItem, OrderQuote, OrderStatus,
    OrderSummary, Product, StockMovement, StockRow, TenantConfig,
};

// =============================================================================
// Responses
// =============================================================================

/// A saved order with its lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// Lines saved without a price breakdown.
    pub unpriced_count: usize,
}

/// Result of a status change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResponse {
    pub order_id: String,
    pub status: OrderStatus,
    /// Present when the new status is Delivered.
    pub reconcile: Option<ReconcileReport>,
}

/// Orders of a period and their sums.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodReport {
    pub orders: Vec<Order>,
    pub summary: OrderSummary,
}

// =============================================================================
// Service
// =============================================================================

/// Capability-gated command handlers over a [`Database`].
#[derive(Debug, Clone)]
pub struct StudioService {
    db: Database,
    reconciler: StockReconciler,
}

impl StudioService {
    /// Creates a service with reconciler settings from the environment.
    pub fn new(db: Database) -> Self {
        StudioService::with_settings(db, ReconcilerSettings::from_env())
    }

    pub fn with_settings(db: Database, settings: ReconcilerSettings) -> Self {
        let reconciler = StockReconciler::new(db.pool().clone(), settings);
        StudioService { db, reconciler }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Prices an order form without saving it.
    pub async fn quote_order(
        &self,
        caps: &Capabilities,
        order: &NewOrder,
    ) -> ServiceResult<OrderQuote> {
        let config = self.db.config().get(&caps.tenant_id).await?;
        let materials = self.db.materials().list_active(&caps.tenant_id).await?;

        let cost_config = config.as_ref().map(TenantConfig::cost_config);
        Ok(order.quote(&materials, cost_config.as_ref()))
    }

    /// Validates, prices and saves a new order with all its lines.
    ///
    /// The client must exist in the caller's tenant. Lines that cannot be
    /// priced (unknown material, no cost configuration) are saved without a
    /// breakdown and left out of the totals.
    pub async fn create_order(
        &self,
        caps: &Capabilities,
        new_order: NewOrder,
    ) -> ServiceResult<CreateOrderResponse> {
        caps.require_edit("create orders")?;
        validate_new_order(&new_order)?;

        let client_id = new_order.client_id.trim();
        let client = self
            .db
            .clients()
            .get_by_id(&caps.tenant_id, client_id)
            .await?
            .ok_or_else(|| CoreError::ClientNotFound(client_id.to_string()))?;

        let quote = self.quote_order(caps, &new_order).await?;
        let now = Utc::now();

        let order = Order {
            id: generate_order_id(),
            tenant_id: caps.tenant_id.clone(),
            client_id: client.id,
            order_date: new_order.order_date,
            status: new_order.status.unwrap_or_default(),
            payment_method: new_order.payment_method,
            delivery_method: new_order.delivery_method,
            city: new_order.city,
            discount: quote.totals.discount,
            freight: quote.totals.freight,
            notes: new_order.notes,
            totals: Some(quote.totals),
            created_at: now,
            updated_at: now,
        };

        let items: Vec<OrderItem> = quote
            .lines
            .iter()
            .zip(&quote.items)
            .enumerate()
            .map(|(position, (line, calculated))| OrderItem {
                id: generate_order_id(),
                tenant_id: caps.tenant_id.clone(),
                order_id: order.id.clone(),
                position: position as i64,
                product_id: line.product_id.clone(),
                material_id: line.material_id.clone(),
                color: line.color.clone(),
                qty: line.qty,
                time_h: non_zero(line.time_h),
                weight_g: non_zero(line.weight_g),
                fixed_price: line.fixed_price,
                other_cost: line.other_cost,
                calculated: *calculated,
            })
            .collect();

        self.db.orders().insert(&order, &items).await?;

        info!(
            order_id = %order.id,
            user_id = %caps.user_id,
            lines = items.len(),
            unpriced = quote.unpriced_count(),
            total_revenue = quote.totals.total_revenue,
            "Order created"
        );

        Ok(CreateOrderResponse {
            order,
            items,
            unpriced_count: quote.unpriced_count(),
        })
    }

    /// Sets an order's status. Moving into Delivered (from any status,
    /// Delivered included) runs a stock reconciliation pass.
    pub async fn change_status(
        &self,
        caps: &Capabilities,
        order_id: &str,
        status: OrderStatus,
    ) -> ServiceResult<StatusChangeResponse> {
        caps.require_edit("change order status")?;

        let order = self
            .db
            .orders()
            .get_by_id(&caps.tenant_id, order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

        self.db
            .orders()
            .update_status(&caps.tenant_id, &order.id, status)
            .await?;

        info!(
            order_id = %order.id,
            from = %order.status.as_str(),
            to = %status.as_str(),
            user_id = %caps.user_id,
            "Order status changed"
        );

        let reconcile = if status.is_delivered() {
            let report = self
                .reconciler
                .reconcile_delivery(&caps.tenant_id, &order.id, Some(&caps.user_id))
                .await?;
            Some(report)
        } else {
            None
        };

        Ok(StatusChangeResponse {
            order_id: order.id,
            status,
            reconcile,
        })
    }

    /// Orders dated within `[from, to]` and their sums.
    pub async fn period_report(
        &self,
        caps: &Capabilities,
        from: NaiveDate,
        to: NaiveDate,
        status: Option<OrderStatus>,
    ) -> ServiceResult<PeriodReport> {
        let orders = self
            .db
            .orders()
            .list_in_period(&caps.tenant_id, from, to, status)
            .await?;
        let summary = summarize_orders(&orders);

        Ok(PeriodReport { orders, summary })
    }

    /// Dashboard figures for orders dated within `[from, to]`.
    pub async fn dashboard(
        &self,
        caps: &Capabilities,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ServiceResult<DashboardMetrics> {
        let orders = self
            .db
            .orders()
            .list_in_period(&caps.tenant_id, from, to, None)
            .await?;

        Ok(dashboard_metrics(&orders))
    }

    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------

    /// Creates a client, or updates it when the id already exists in the
    /// tenant. A blank id means a new client.
    pub async fn save_client(&self, caps: &Capabilities, client: Client) -> ServiceResult<Client> {
        caps.require_edit("edit clients")?;
        validate_client_name(&client.name)?;

        let mut client = Client {
            tenant_id: caps.tenant_id.clone(),
            name: client.name.trim().to_string(),
            ..client
        };

        let existing = if client.id.trim().is_empty() {
            None
        } else {
            self.db.clients().get_by_id(&caps.tenant_id, &client.id).await?
        };

        match existing {
            Some(existing) => {
                client.created_at = existing.created_at;
                self.db.clients().update(&client).await?;
                info!(client_id = %client.id, user_id = %caps.user_id, "Client updated");
                Ok(client)
            }
            None => {
                if client.id.trim().is_empty() {
                    client.id = generate_client_id();
                }
                client.created_at = Utc::now();
                let client = self.db.clients().insert(&client).await?;
                info!(client_id = %client.id, user_id = %caps.user_id, "Client created");
                Ok(client)
            }
        }
    }

    /// Clients by name, filtered by a name fragment when one is given.
    pub async fn list_clients(
        &self,
        caps: &Capabilities,
        search: Option<&str>,
    ) -> ServiceResult<Vec<Client>> {
        Ok(self.db.clients().list(&caps.tenant_id, search).await?)
    }

    // -------------------------------------------------------------------------
    // Stock
    // -------------------------------------------------------------------------

    /// Starts tracking a material in a color. The row starts with no
    /// quantity; stock arrives through [`StudioService::adjust_stock`].
    pub async fn create_stock_row(
        &self,
        caps: &Capabilities,
        material_id: &str,
        color: &str,
        min_g: Option<f64>,
    ) -> ServiceResult<StockRow> {
        caps.require_edit("create stock rows")?;
        validate_color(color)?;
        if let Some(min_g) = min_g {
            validate_min_stock(min_g)?;
        }

        self.db
            .materials()
            .get_by_id(&caps.tenant_id, material_id)
            .await?
            .ok_or_else(|| CoreError::MaterialNotFound(material_id.to_string()))?;

        let row = StockRow {
            id: generate_stock_id(),
            tenant_id: caps.tenant_id.clone(),
            material_id: material_id.to_string(),
            color: color.trim().to_string(),
            qty_g: None,
            min_g,
            version: 0,
        };

        let row = self.db.stock().create(&row).await?;
        info!(stock_id = %row.id, material_id = %row.material_id, color = %row.color, "Stock row created");
        Ok(row)
    }

    /// Manual inbound / outbound adjustment with the operator's reason.
    pub async fn adjust_stock(
        &self,
        caps: &Capabilities,
        stock_id: &str,
        direction: AdjustmentDirection,
        qty_g: f64,
        reason: &str,
    ) -> ServiceResult<(StockRow, StockMovement)> {
        caps.require_edit("adjust stock")?;
        validate_adjustment_qty(qty_g)?;
        validate_adjustment_reason(reason)?;

        self.db
            .stock()
            .get_by_id(&caps.tenant_id, stock_id)
            .await?
            .ok_or_else(|| CoreError::StockRowNotFound(stock_id.to_string()))?;

        debug!(stock_id = %stock_id, ?direction, qty_g, "Adjusting stock");

        let adjusted = self
            .db
            .stock()
            .adjust(
                &caps.tenant_id,
                stock_id,
                direction.signed(qty_g),
                reason.trim(),
                Some(&caps.user_id),
            )
            .await?;

        Ok(adjusted)
    }

    /// Rows at or below their minimum.
    pub async fn low_stock(&self, caps: &Capabilities) -> ServiceResult<Vec<StockRow>> {
        Ok(self.db.stock().list_low(&caps.tenant_id).await?)
    }

    // -------------------------------------------------------------------------
    // Administration
    // -------------------------------------------------------------------------

    /// Saves the tenant's cost configuration.
    pub async fn save_cost_config(
        &self,
        caps: &Capabilities,
        config: TenantConfig,
    ) -> ServiceResult<TenantConfig> {
        caps.require_admin("change cost config")?;
        validate_cost_config(&config)?;

        let config = TenantConfig {
            tenant_id: caps.tenant_id.clone(),
            updated_at: Some(Utc::now()),
            updated_by: Some(caps.user_id.clone()),
            ..config
        };

        self.db.config().upsert(&config).await?;
        info!(tenant_id = %config.tenant_id, user_id = %caps.user_id, "Cost configuration saved");
        Ok(config)
    }

    /// Creates a catalog product, or updates it when the id already exists in
    /// the tenant. A blank id means a new product. A default material, when
    /// set, must exist in the tenant.
    pub async fn save_product(
        &self,
        caps: &Capabilities,
        product: Product,
    ) -> ServiceResult<Product> {
        caps.require_edit("edit products")?;
        validate_product(&product)?;
        if let Some(color) = &product.default_color {
            validate_color(color)?;
        }

        let mut product = Product {
            tenant_id: caps.tenant_id.clone(),
            name: product.name.trim().to_string(),
            default_material_id: product
                .default_material_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            ..product
        };

        if let Some(material_id) = &product.default_material_id {
            self.db
                .materials()
                .get_by_id(&caps.tenant_id, material_id)
                .await?
                .ok_or_else(|| CoreError::MaterialNotFound(material_id.clone()))?;
        }

        let existing = if product.id.trim().is_empty() {
            None
        } else {
            self.db.products().get_by_id(&caps.tenant_id, &product.id).await?
        };

        match existing {
            Some(existing) => {
                product.created_at = existing.created_at;
                self.db.products().update(&product).await?;
                info!(product_id = %product.id, user_id = %caps.user_id, "Product updated");
                Ok(product)
            }
            None => {
                if product.id.trim().is_empty() {
                    product.id = generate_product_id();
                }
                product.created_at = Utc::now();
                let product = self.db.products().insert(&product).await?;
                info!(product_id = %product.id, user_id = %caps.user_id, "Product created");
                Ok(product)
            }
        }
    }

    /// Creates a material, or updates it when the id already exists in the
    /// tenant. A blank id means a new material.
    pub async fn save_material(
        &self,
        caps: &Capabilities,
        material: Material,
    ) -> ServiceResult<Material> {
        caps.require_admin("edit materials")?;
        validate_material_name(&material.name)?;
        validate_price_per_kg(material.price_per_kg)?;

        let mut material = Material {
            tenant_id: caps.tenant_id.clone(),
            name: material.name.trim().to_string(),
            ..material
        };

        let existing = if material.id.trim().is_empty() {
            None
        } else {
            self.db
                .materials()
                .get_by_id(&caps.tenant_id, &material.id)
                .await?
        };

        match existing {
            Some(existing) => {
                material.created_at = existing.created_at;
                self.db.materials().update(&material).await?;
                info!(material_id = %material.id, "Material updated");
                Ok(material)
            }
            None => {
                if material.id.trim().is_empty() {
                    material.id = generate_material_id();
                }
                material.created_at = Utc::now();
                let material = self.db.materials().insert(&material).await?;
                info!(material_id = %material.id, "Material created");
                Ok(material)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
