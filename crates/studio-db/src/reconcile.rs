//! # Stock Reconciler
//!
//! Draws filament stock down when an order is delivered.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  change_status(order, Delivered)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load lines + product category (persisted order)   ── error → Err      │
//! │       │                                                                 │
//! │       ▼  for each line, independently                                   │
//! │  studio_core::stock::delivery_draw ── not eligible → skipped           │
//! │       │                                                                 │
//! │       ▼  BEGIN IMMEDIATE                                                │
//! │  (idempotent?) movement exists for line ── yes → skipped               │
//! │  find stock row (material, color)       ── none → skipped              │
//! │  UPDATE qty_g = COALESCE(qty_g,0) + Δ                                   │
//! │  INSERT movement "Pedido entregue" (ref = order, line)                  │
//! │       │  COMMIT                                                         │
//! │       ▼                                                                 │
//! │  applied / skipped / failed → ReconcileReport                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failing line rolls back only its own transaction; the lines before and
//! after it are unaffected and nothing is retried.
//!
//! ## Repeated Deliveries
//! Every transition into Delivered runs a pass, including Delivered →
//! Delivered. By default each pass decrements again. With
//! [`ReconcilerSettings::idempotent`] a line that already has a delivery
//! movement is skipped.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::order::{DeliveryLine, OrderRepository};
use crate::repository::stock::{
    apply_delta_tx, begin_write, delivery_recorded_tx, find_row_tx, generate_stock_id,
    insert_movement_tx,
};
use studio_core::stock::{delivery_draw, StockDraw};
use studio_core::{SkipReason, StockMovement, ORDER_DELIVERED_REASON, ORDER_REF_TYPE};

/// Environment variable that turns on idempotent reconciliation.
pub const IDEMPOTENT_ENV: &str = "STUDIO_RECONCILE_IDEMPOTENT";

// =============================================================================
// Settings
// =============================================================================

/// Reconciler behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcilerSettings {
    /// Skip lines already decremented by an earlier delivery of the same
    /// order. Default: false
    pub idempotent: bool,
}

impl ReconcilerSettings {
    /// Defaults, overridden by `STUDIO_RECONCILE_IDEMPOTENT`.
    pub fn from_env() -> Self {
        let mut settings = ReconcilerSettings::default();

        if let Ok(value) = std::env::var(IDEMPOTENT_ENV) {
            match parse_flag(&value) {
                Some(flag) => {
                    debug!(idempotent = flag, "Overriding reconciler mode from environment");
                    settings.idempotent = flag;
                }
                None => warn!(value = %value, "Ignoring invalid {}", IDEMPOTENT_ENV),
            }
        }

        settings
    }

    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Report
// =============================================================================

/// A line that moved stock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedMovement {
    pub item_id: String,
    pub stock_id: String,
    pub movement_id: String,
    pub delta_g: f64,
    /// Quantity on the row after this movement.
    pub qty_after_g: f64,
}

/// A line that did not move stock, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItem {
    pub item_id: String,
    pub reason: SkipReason,
}

/// A line whose transaction failed and was rolled back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedItem {
    pub item_id: String,
    pub error: String,
}

/// Outcome of one reconciliation pass, line by line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub order_id: String,
    pub applied: Vec<AppliedMovement>,
    pub skipped: Vec<SkippedItem>,
    pub failed: Vec<FailedItem>,
}

impl ReconcileReport {
    fn new(order_id: &str) -> Self {
        ReconcileReport {
            order_id: order_id.to_string(),
            ..ReconcileReport::default()
        }
    }

    /// True when no line failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Net grams moved by this pass.
    pub fn total_delta_g(&self) -> f64 {
        self.applied.iter().fold(0.0, |sum, a| sum + a.delta_g)
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Applies delivery draws to the stock ledger.
#[derive(Debug, Clone)]
pub struct StockReconciler {
    pool: SqlitePool,
    settings: ReconcilerSettings,
}

impl StockReconciler {
    pub fn new(pool: SqlitePool, settings: ReconcilerSettings) -> Self {
        StockReconciler { pool, settings }
    }

    pub fn settings(&self) -> ReconcilerSettings {
        self.settings
    }

    /// Runs one pass over the lines of a delivered order.
    ///
    /// `actor_id` is recorded as `created_by` on every movement.
    ///
    /// ## Returns
    /// * `Ok(report)` - Every line was applied, skipped or failed
    /// * `Err(DbError)` - The order's lines could not be loaded
    pub async fn reconcile_delivery(
        &self,
        tenant_id: &str,
        order_id: &str,
        actor_id: Option<&str>,
    ) -> DbResult<ReconcileReport> {
        let lines = OrderRepository::new(self.pool.clone())
            .delivery_lines(tenant_id, order_id)
            .await?;

        debug!(
            order_id = %order_id,
            lines = lines.len(),
            idempotent = self.settings.idempotent,
            "Reconciling delivered order"
        );

        let mut report = ReconcileReport::new(order_id);

        for line in &lines {
            let item_id = line.item.id.clone();

            let draw = match delivery_draw(line.category, &line.item) {
                Ok(draw) => draw,
                Err(reason) => {
                    debug!(item_id = %item_id, %reason, "Line does not move stock");
                    report.skipped.push(SkippedItem { item_id, reason });
                    continue;
                }
            };

            match self.apply_draw(tenant_id, order_id, line, &draw, actor_id).await {
                Ok(Ok(applied)) => report.applied.push(applied),
                Ok(Err(reason)) => {
                    debug!(item_id = %item_id, %reason, "Line skipped");
                    report.skipped.push(SkippedItem { item_id, reason });
                }
                Err(err) => {
                    warn!(item_id = %item_id, error = %err, "Stock movement failed");
                    report.failed.push(FailedItem {
                        item_id,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            order_id = %order_id,
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Delivery reconciled"
        );
        Ok(report)
    }

    /// Moves stock for one line in its own transaction.
    async fn apply_draw(
        &self,
        tenant_id: &str,
        order_id: &str,
        line: &DeliveryLine,
        draw: &StockDraw,
        actor_id: Option<&str>,
    ) -> DbResult<Result<AppliedMovement, SkipReason>> {
        let mut tx = begin_write(&self.pool).await?;

        if self.settings.idempotent
            && delivery_recorded_tx(&mut *tx, tenant_id, order_id, &line.item.id).await?
        {
            return Ok(Err(SkipReason::AlreadyReconciled));
        }

        let row = match find_row_tx(
            &mut *tx,
            tenant_id,
            &draw.key.material_id,
            &draw.key.color,
        )
        .await?
        {
            Some(row) => row,
            None => return Ok(Err(SkipReason::NoStockRow)),
        };

        let qty_after_g = apply_delta_tx(&mut *tx, tenant_id, &row.id, draw.delta_g).await?;

        let movement = StockMovement {
            id: generate_stock_id(),
            tenant_id: tenant_id.to_string(),
            material_id: draw.key.material_id.clone(),
            color: draw.key.color.clone(),
            qty_delta_g: draw.delta_g,
            reason: ORDER_DELIVERED_REASON.to_string(),
            ref_type: Some(ORDER_REF_TYPE.to_string()),
            ref_id: Some(order_id.to_string()),
            ref_item_id: Some(line.item.id.clone()),
            created_by: actor_id.map(str::to_string),
            created_at: Utc::now(),
        };
        insert_movement_tx(&mut *tx, &movement).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(
            item_id = %line.item.id,
            stock_id = %row.id,
            delta_g = draw.delta_g,
            qty_after_g,
            "Stock drawn for delivered line"
        );

        Ok(Ok(AppliedMovement {
            item_id: line.item.id.clone(),
            stock_id: row.id,
            movement_id: movement.id,
            delta_g: draw.delta_g,
            qty_after_g,
        }))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use studio_core::{
        Client, Material, Order, OrderItem, OrderStatus, Product, ProductCategory, StockRow,
    };

    const TENANT: &str = "t1";

    struct Fixture {
        db: Database,
        stock_id: String,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        fixture_on(db, 1000.0).await
    }

    /// Client "c1", PLA, a printed vase, a laser sign and a black PLA row
    /// holding `start_g`.
    async fn fixture_on(db: Database, start_g: f64) -> Fixture {
        let now = Utc::now();

        db.clients()
            .insert(&Client {
                id: "c1".to_string(),
                tenant_id: TENANT.to_string(),
                name: "Ana".to_string(),
                whatsapp: None,
                city: None,
                neighborhood: None,
                channel: None,
                notes: None,
                created_at: now,
            })
            .await
            .unwrap();

        db.materials()
            .insert(&Material {
                id: "pla".to_string(),
                tenant_id: TENANT.to_string(),
                name: "PLA".to_string(),
                price_per_kg: 120.0,
                active: true,
                created_at: now,
            })
            .await
            .unwrap();

        for (id, category) in [
            ("vase", ProductCategory::Printing3d),
            ("sign", ProductCategory::Laser),
        ] {
            db.products()
                .insert(&Product {
                    id: id.to_string(),
                    tenant_id: TENANT.to_string(),
                    name: id.to_string(),
                    category,
                    default_material_id: None,
                    default_color: None,
                    avg_time_h: None,
                    avg_weight_g: None,
                    fixed_price: None,
                    notes: None,
                    created_at: now,
                })
                .await
                .unwrap();
        }

        let row = db
            .stock()
            .create(&StockRow {
                id: generate_stock_id(),
                tenant_id: TENANT.to_string(),
                material_id: "pla".to_string(),
                color: "Preto".to_string(),
                qty_g: Some(start_g),
                min_g: Some(100.0),
                version: 0,
            })
            .await
            .unwrap();

        Fixture {
            db,
            stock_id: row.id,
        }
    }

    fn line(id: &str, product_id: &str, color: &str, position: i64) -> OrderItem {
        OrderItem {
            id: id.to_string(),
            tenant_id: TENANT.to_string(),
            order_id: "o1".to_string(),
            position,
            product_id: Some(product_id.to_string()),
            material_id: Some("pla".to_string()),
            color: Some(color.to_string()),
            qty: 2,
            time_h: Some(2.5),
            weight_g: Some(150.0),
            fixed_price: None,
            other_cost: 0.0,
            calculated: None,
        }
    }

    async fn save_order(db: &Database, items: &[OrderItem]) {
        save_order_as(db, "o1", items).await;
    }

    async fn save_order_as(db: &Database, order_id: &str, items: &[OrderItem]) {
        let now = Utc::now();
        let order = Order {
            id: order_id.to_string(),
            tenant_id: TENANT.to_string(),
            client_id: "c1".to_string(),
            order_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            status: OrderStatus::Delivered,
            payment_method: None,
            delivery_method: None,
            city: None,
            discount: 0.0,
            freight: 0.0,
            notes: None,
            totals: None,
            created_at: now,
            updated_at: now,
        };
        db.orders().insert(&order, items).await.unwrap();
    }

    fn reconciler(db: &Database, idempotent: bool) -> StockReconciler {
        StockReconciler::new(
            db.pool().clone(),
            ReconcilerSettings::default().idempotent(idempotent),
        )
    }

    async fn qty(f: &Fixture) -> Option<f64> {
        f.db.stock()
            .get_by_id(TENANT, &f.stock_id)
            .await
            .unwrap()
            .unwrap()
            .qty_g
    }

    #[tokio::test]
    async fn test_delivery_draws_weight_times_qty() {
        let f = fixture().await;
        save_order(&f.db, &[line("i1", "vase", "Preto", 0)]).await;

        let report = reconciler(&f.db, false)
            .reconcile_delivery(TENANT, "o1", Some("u1"))
            .await
            .unwrap();

        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.applied[0].delta_g, -300.0);
        assert_eq!(report.applied[0].qty_after_g, 700.0);
        assert!(report.is_complete());
        assert_eq!(qty(&f).await, Some(700.0));

        let movements = f.db.stock().movements_for_order(TENANT, "o1").await.unwrap();
        assert_eq!(movements.len(), 1);
        let m = &movements[0];
        assert_eq!(m.qty_delta_g, -300.0);
        assert_eq!(m.reason, ORDER_DELIVERED_REASON);
        assert_eq!(m.ref_type.as_deref(), Some(ORDER_REF_TYPE));
        assert_eq!(m.ref_id.as_deref(), Some("o1"));
        assert_eq!(m.ref_item_id.as_deref(), Some("i1"));
        assert_eq!(m.created_by.as_deref(), Some("u1"));
        assert!(m.is_order_delivery());
    }

    #[tokio::test]
    async fn test_missing_row_and_ineligible_lines_are_skipped() {
        let f = fixture().await;
        let mut no_weight = line("i4", "vase", "Preto", 3);
        no_weight.weight_g = None;
        save_order(
            &f.db,
            &[
                line("i1", "vase", "Verde", 0),
                line("i2", "sign", "Preto", 1),
                line("i3", "vase", "Preto", 2),
                no_weight,
            ],
        )
        .await;

        let report = reconciler(&f.db, false)
            .reconcile_delivery(TENANT, "o1", None)
            .await
            .unwrap();

        assert_eq!(
            report.skipped,
            vec![
                SkippedItem {
                    item_id: "i1".to_string(),
                    reason: SkipReason::NoStockRow
                },
                SkippedItem {
                    item_id: "i2".to_string(),
                    reason: SkipReason::NotPrinting
                },
                SkippedItem {
                    item_id: "i4".to_string(),
                    reason: SkipReason::NoWeight
                },
            ]
        );
        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.applied[0].item_id, "i3");
        assert_eq!(qty(&f).await, Some(700.0));
        assert_eq!(
            f.db.stock().movements_for_order(TENANT, "o1").await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_lines_are_applied_in_sequence() {
        let f = fixture().await;
        save_order(
            &f.db,
            &[line("i1", "vase", "Preto", 0), line("i2", "vase", "Preto", 1)],
        )
        .await;

        let report = reconciler(&f.db, false)
            .reconcile_delivery(TENANT, "o1", None)
            .await
            .unwrap();

        let after: Vec<f64> = report.applied.iter().map(|a| a.qty_after_g).collect();
        assert_eq!(after, vec![700.0, 400.0]);
        assert_eq!(report.total_delta_g(), -600.0);
        assert_eq!(qty(&f).await, Some(400.0));
    }

    #[tokio::test]
    async fn test_repeated_delivery_decrements_again_by_default() {
        let f = fixture().await;
        save_order(&f.db, &[line("i1", "vase", "Preto", 0)]).await;
        let reconciler = reconciler(&f.db, false);

        reconciler.reconcile_delivery(TENANT, "o1", None).await.unwrap();
        reconciler.reconcile_delivery(TENANT, "o1", None).await.unwrap();

        assert_eq!(qty(&f).await, Some(400.0));
        assert_eq!(
            f.db.stock().movements_for_order(TENANT, "o1").await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_idempotent_mode_skips_reconciled_lines() {
        let f = fixture().await;
        save_order(&f.db, &[line("i1", "vase", "Preto", 0)]).await;
        let reconciler = reconciler(&f.db, true);

        reconciler.reconcile_delivery(TENANT, "o1", None).await.unwrap();
        let second = reconciler.reconcile_delivery(TENANT, "o1", None).await.unwrap();

        assert!(second.applied.is_empty());
        assert_eq!(second.skipped[0].reason, SkipReason::AlreadyReconciled);
        assert_eq!(qty(&f).await, Some(700.0));
    }

    #[tokio::test]
    async fn test_failed_line_rolls_back_its_own_update() {
        let f = fixture().await;
        save_order(&f.db, &[line("i1", "vase", "Preto", 0)]).await;

        sqlx::query("DROP TABLE stock_movements")
            .execute(f.db.pool())
            .await
            .unwrap();

        let report = reconciler(&f.db, false)
            .reconcile_delivery(TENANT, "o1", None)
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].item_id, "i1");
        assert!(!report.is_complete());
        assert_eq!(qty(&f).await, Some(1000.0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deliveries_on_one_row_all_apply() {
        const ORDERS: usize = 16;

        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("studio.db")).max_connections(8);
        let db = Database::new(config).await.unwrap();
        let f = fixture_on(db, 100_000.0).await;

        for n in 0..ORDERS {
            let order_id = format!("o{n}");
            let mut item = line(&format!("i{n}"), "vase", "Preto", 0);
            item.order_id = order_id.clone();
            item.qty = 1;
            item.weight_g = Some(10.0);
            save_order_as(&f.db, &order_id, &[item]).await;
        }

        let reconciler = reconciler(&f.db, false);
        let handles: Vec<_> = (0..ORDERS)
            .map(|n| {
                let reconciler = reconciler.clone();
                tokio::spawn(async move {
                    reconciler
                        .reconcile_delivery(TENANT, &format!("o{n}"), None)
                        .await
                })
            })
            .collect();

        let mut total_delta_g = 0.0;
        for handle in handles {
            let report = handle.await.unwrap().unwrap();
            assert!(report.is_complete(), "failed lines: {:?}", report.failed);
            assert_eq!(report.applied.len(), 1);
            total_delta_g += report.total_delta_g();
        }

        assert_eq!(total_delta_g, -160.0);
        assert_eq!(qty(&f).await, Some(100_000.0 + total_delta_g));
        assert_eq!(qty(&f).await, Some(99_840.0));

        let movements = f.db.stock().movements(TENANT, "pla", "Preto").await.unwrap();
        assert_eq!(movements.len(), ORDERS);
    }

    #[tokio::test]
    async fn test_unknown_order_has_nothing_to_do() {
        let f = fixture().await;
        let report = reconciler(&f.db, false)
            .reconcile_delivery(TENANT, "missing", None)
            .await
            .unwrap();
        assert_eq!(report, ReconcileReport::new("missing"));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("yes"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
        assert!(!ReconcilerSettings::default().idempotent);
    }
}
