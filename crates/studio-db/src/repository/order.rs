//! # Order Repository
//!
//! Orders and their lines. The pricing breakdown of each line and the order
//! totals are stored as JSON text next to the inputs they were computed from.
//!
//! ## Storage
//! ```text
//! orders                              order_items
//! ┌──────────────────────────┐        ┌──────────────────────────────────┐
//! │ id, status, city, ...    │◄───────│ order_id, position               │
//! │ discount, freight        │   1:N  │ qty, time_h, weight_g, ...       │
//! │ totals_json (OrderTotals)│        │ calculated_json (CalcResult)     │
//! └──────────────────────────┘        └──────────────────────────────────┘
//! ```
//!
//! An order and its lines are written in one transaction.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use studio_core::{CalculationResult, Order, OrderItem, OrderStatus, OrderTotals, ProductCategory};

const ORDER_COLUMNS: &str = "id, tenant_id, client_id, order_date, status, payment_method, \
     delivery_method, city, discount, freight, notes, totals_json, created_at, updated_at";

const ITEM_COLUMNS: &str = "i.id AS id, i.tenant_id AS tenant_id, i.order_id AS order_id, \
     i.position AS position, i.product_id AS product_id, i.material_id AS material_id, \
     i.color AS color, i.qty AS qty, i.time_h AS time_h, i.weight_g AS weight_g, \
     i.fixed_price AS fixed_price, i.other_cost AS other_cost, \
     i.calculated_json AS calculated_json";

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    tenant_id: String,
    client_id: String,
    order_date: NaiveDate,
    status: OrderStatus,
    payment_method: Option<String>,
    delivery_method: Option<String>,
    city: Option<String>,
    discount: f64,
    freight: f64,
    notes: Option<String>,
    totals_json: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> DbResult<Order> {
        let totals = self
            .totals_json
            .as_deref()
            .map(serde_json::from_str::<OrderTotals>)
            .transpose()?;

        Ok(Order {
            id: self.id,
            tenant_id: self.tenant_id,
            client_id: self.client_id,
            order_date: self.order_date,
            status: self.status,
            payment_method: self.payment_method,
            delivery_method: self.delivery_method,
            city: self.city,
            discount: self.discount,
            freight: self.freight,
            notes: self.notes,
            totals,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: String,
    tenant_id: String,
    order_id: String,
    position: i64,
    product_id: Option<String>,
    material_id: Option<String>,
    color: Option<String>,
    qty: i64,
    time_h: Option<f64>,
    weight_g: Option<f64>,
    fixed_price: Option<f64>,
    other_cost: f64,
    calculated_json: Option<String>,
}

impl OrderItemRow {
    fn into_item(self) -> DbResult<OrderItem> {
        let calculated = self
            .calculated_json
            .as_deref()
            .map(serde_json::from_str::<CalculationResult>)
            .transpose()?;

        Ok(OrderItem {
            id: self.id,
            tenant_id: self.tenant_id,
            order_id: self.order_id,
            position: self.position,
            product_id: self.product_id,
            material_id: self.material_id,
            color: self.color,
            qty: self.qty,
            time_h: self.time_h,
            weight_g: self.weight_g,
            fixed_price: self.fixed_price,
            other_cost: self.other_cost,
            calculated,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeliveryLineRow {
    #[sqlx(flatten)]
    item: OrderItemRow,
    category: Option<ProductCategory>,
}

/// An order line together with the category of its product.
///
/// `category` is `None` when the line has no product or the product is gone.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryLine {
    pub item: OrderItem,
    pub category: Option<ProductCategory>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts an order and all its lines atomically.
    pub async fn insert(&self, order: &Order, items: &[OrderItem]) -> DbResult<()> {
        debug!(id = %order.id, lines = items.len(), "Inserting order");

        let totals_json = order.totals.as_ref().map(serde_json::to_string).transpose()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, tenant_id, client_id, order_date, status, payment_method,
                delivery_method, city, discount, freight, notes, totals_json,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&order.id)
        .bind(&order.tenant_id)
        .bind(&order.client_id)
        .bind(order.order_date)
        .bind(order.status)
        .bind(&order.payment_method)
        .bind(&order.delivery_method)
        .bind(&order.city)
        .bind(order.discount)
        .bind(order.freight)
        .bind(&order.notes)
        .bind(totals_json)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            let calculated_json = item
                .calculated
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, tenant_id, order_id, position, product_id, material_id,
                    color, qty, time_h, weight_g, fixed_price, other_cost,
                    calculated_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )
            .bind(&item.id)
            .bind(&item.tenant_id)
            .bind(&order.id)
            .bind(item.position)
            .bind(&item.product_id)
            .bind(&item.material_id)
            .bind(&item.color)
            .bind(item.qty)
            .bind(item.time_h)
            .bind(item.weight_g)
            .bind(item.fixed_price)
            .bind(item.other_cost)
            .bind(calculated_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(id = %order.id, lines = items.len(), "Order saved");
        Ok(())
    }

    /// Gets an order by id within a tenant.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Order>> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1 AND tenant_id = ?2");

        let row = sqlx::query_as::<_, OrderRow>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(OrderRow::into_order).transpose()
    }

    /// Gets the lines of an order in persisted order.
    pub async fn get_items(&self, tenant_id: &str, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM order_items i \
             WHERE i.order_id = ?1 AND i.tenant_id = ?2 \
             ORDER BY i.position"
        );

        let rows = sqlx::query_as::<_, OrderItemRow>(&query)
            .bind(order_id)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(OrderItemRow::into_item).collect()
    }

    /// Gets the lines of an order with their product categories, in
    /// persisted order.
    pub async fn delivery_lines(
        &self,
        tenant_id: &str,
        order_id: &str,
    ) -> DbResult<Vec<DeliveryLine>> {
        let query = format!(
            "SELECT {ITEM_COLUMNS}, p.category AS category \
             FROM order_items i \
             LEFT JOIN products p ON p.id = i.product_id AND p.tenant_id = i.tenant_id \
             WHERE i.order_id = ?1 AND i.tenant_id = ?2 \
             ORDER BY i.position"
        );

        let rows = sqlx::query_as::<_, DeliveryLineRow>(&query)
            .bind(order_id)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(DeliveryLine {
                    item: row.item.into_item()?,
                    category: row.category,
                })
            })
            .collect()
    }

    /// Sets the status of an order.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such order in the tenant
    pub async fn update_status(
        &self,
        tenant_id: &str,
        id: &str,
        status: OrderStatus,
    ) -> DbResult<()> {
        debug!(id = %id, status = %status.as_str(), "Updating order status");

        let result = sqlx::query(
            r#"
            UPDATE orders SET status = ?3, updated_at = ?4
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    /// Lists orders dated within `[from, to]`, newest first, optionally
    /// filtered by status.
    pub async fn list_in_period(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        status: Option<OrderStatus>,
    ) -> DbResult<Vec<Order>> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE tenant_id = ?1 AND order_date >= ?2 AND order_date <= ?3 \
             AND (?4 IS NULL OR status = ?4) \
             ORDER BY order_date DESC, created_at DESC"
        );

        let rows = sqlx::query_as::<_, OrderRow>(&query)
            .bind(tenant_id)
            .bind(from)
            .bind(to)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), %from, %to, "Listed orders in period");
        rows.into_iter().map(OrderRow::into_order).collect()
    }
}

/// Generates a new order or order line id.
pub fn generate_order_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
