//! # Stock Repository
//!
//! Stock rows (grams on hand per material and color) and the append-only
//! movement ledger behind them.
//!
//! ## Delta Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                            │
//! │                                                                     │
//! │  ❌ Read qty, compute, write back (two deliveries can lose one)     │
//! │     UPDATE stock SET qty_g = 700 WHERE id = ?                       │
//! │                                                                     │
//! │  ✅ Relative update inside the movement's transaction               │
//! │     UPDATE stock SET qty_g = COALESCE(qty_g, 0) - 300 ...           │
//! │     INSERT INTO stock_movements (... -300 ...)                      │
//! │     COMMIT                                                          │
//! │                                                                     │
//! │  The row and its movement change together or not at all.           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `*_tx` functions run on a caller-owned connection so the reconciler
//! and manual adjustments can share one transaction per movement.

use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use studio_core::{StockMovement, StockRow, ORDER_DELIVERED_REASON, ORDER_REF_TYPE};

const STOCK_COLUMNS: &str = "id, tenant_id, material_id, color, qty_g, min_g, version";

const MOVEMENT_COLUMNS: &str = "id, tenant_id, material_id, color, qty_delta_g, reason, \
     ref_type, ref_id, ref_item_id, created_by, created_at";

/// Repository for stock rows and movements.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Inserts a new stock row.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - The tenant already tracks this material and color
    /// * `Err(DbError::ForeignKeyViolation)` - Material doesn't exist
    pub async fn create(&self, row: &StockRow) -> DbResult<StockRow> {
        debug!(material_id = %row.material_id, color = %row.color, "Creating stock row");

        sqlx::query(
            r#"
            INSERT INTO stock (id, tenant_id, material_id, color, qty_g, min_g, version, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&row.id)
        .bind(&row.tenant_id)
        .bind(&row.material_id)
        .bind(&row.color)
        .bind(row.qty_g)
        .bind(row.min_g)
        .bind(row.version)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(row.clone())
    }

    /// Gets a stock row by id within a tenant.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<StockRow>> {
        let query = format!("SELECT {STOCK_COLUMNS} FROM stock WHERE id = ?1 AND tenant_id = ?2");

        let row = sqlx::query_as::<_, StockRow>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    /// Finds the row tracking a material and color.
    pub async fn find(
        &self,
        tenant_id: &str,
        material_id: &str,
        color: &str,
    ) -> DbResult<Option<StockRow>> {
        let mut conn = self.pool.acquire().await?;
        find_row_tx(&mut *conn, tenant_id, material_id, color).await
    }

    /// Lists every stock row of a tenant.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<StockRow>> {
        let query = format!(
            "SELECT {STOCK_COLUMNS} FROM stock WHERE tenant_id = ?1 ORDER BY material_id, color"
        );

        let rows = sqlx::query_as::<_, StockRow>(&query)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Lists rows at or below their minimum (unset values count as zero).
    pub async fn list_low(&self, tenant_id: &str) -> DbResult<Vec<StockRow>> {
        let query = format!(
            "SELECT {STOCK_COLUMNS} FROM stock \
             WHERE tenant_id = ?1 AND COALESCE(qty_g, 0) <= COALESCE(min_g, 0) \
             ORDER BY material_id, color"
        );

        let rows = sqlx::query_as::<_, StockRow>(&query)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Listed low stock rows");
        Ok(rows)
    }

    /// Applies a signed manual adjustment to a row and records it.
    ///
    /// The quantity update and the movement are committed together.
    ///
    /// ## Returns
    /// The updated row and the recorded movement.
    pub async fn adjust(
        &self,
        tenant_id: &str,
        stock_id: &str,
        delta_g: f64,
        reason: &str,
        created_by: Option<&str>,
    ) -> DbResult<(StockRow, StockMovement)> {
        let mut tx = begin_write(&self.pool).await?;

        let query = format!("SELECT {STOCK_COLUMNS} FROM stock WHERE id = ?1 AND tenant_id = ?2");
        let mut row = sqlx::query_as::<_, StockRow>(&query)
            .bind(stock_id)
            .bind(tenant_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Stock", stock_id))?;

        let qty_g = apply_delta_tx(&mut *tx, tenant_id, &row.id, delta_g).await?;

        let movement = StockMovement {
            id: generate_stock_id(),
            tenant_id: tenant_id.to_string(),
            material_id: row.material_id.clone(),
            color: row.color.clone(),
            qty_delta_g: delta_g,
            reason: reason.to_string(),
            ref_type: None,
            ref_id: None,
            ref_item_id: None,
            created_by: created_by.map(str::to_string),
            created_at: Utc::now(),
        };
        insert_movement_tx(&mut *tx, &movement).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        row.qty_g = Some(qty_g);
        row.version += 1;

        info!(
            stock_id = %row.id,
            delta_g,
            qty_g,
            reason = %movement.reason,
            "Stock adjusted"
        );
        Ok((row, movement))
    }

    /// Movements of one material and color, oldest first.
    pub async fn movements(
        &self,
        tenant_id: &str,
        material_id: &str,
        color: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let query = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE tenant_id = ?1 AND material_id = ?2 AND color = ?3 \
             ORDER BY created_at, rowid"
        );

        let movements = sqlx::query_as::<_, StockMovement>(&query)
            .bind(tenant_id)
            .bind(material_id)
            .bind(color)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Movements created by deliveries of an order, oldest first.
    pub async fn movements_for_order(
        &self,
        tenant_id: &str,
        order_id: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let query = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE tenant_id = ?1 AND ref_type = ?2 AND ref_id = ?3 \
             ORDER BY created_at, rowid"
        );

        let movements = sqlx::query_as::<_, StockMovement>(&query)
            .bind(tenant_id)
            .bind(ORDER_REF_TYPE)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Opens a transaction that holds the write lock from its first statement.
///
/// A deferred transaction that reads before writing cannot upgrade once
/// another writer has committed; SQLite fails it with SQLITE_BUSY without
/// consulting `busy_timeout`. `BEGIN IMMEDIATE` waits for the lock instead.
pub async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}

/// Finds the row tracking a material and color on the given connection.
pub async fn find_row_tx(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    material_id: &str,
    color: &str,
) -> DbResult<Option<StockRow>> {
    let query = format!(
        "SELECT {STOCK_COLUMNS} FROM stock \
         WHERE tenant_id = ?1 AND material_id = ?2 AND color = ?3"
    );

    let row = sqlx::query_as::<_, StockRow>(&query)
        .bind(tenant_id)
        .bind(material_id)
        .bind(color)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}

/// Adds `delta_g` to a row's quantity (unset counts as zero) and bumps its
/// version. Returns the new quantity.
pub async fn apply_delta_tx(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    stock_id: &str,
    delta_g: f64,
) -> DbResult<f64> {
    let qty_g: Option<f64> = sqlx::query_scalar(
        r#"
        UPDATE stock
        SET
            qty_g = COALESCE(qty_g, 0) + ?3,
            version = version + 1,
            updated_at = ?4
        WHERE id = ?1 AND tenant_id = ?2
        RETURNING qty_g
        "#,
    )
    .bind(stock_id)
    .bind(tenant_id)
    .bind(delta_g)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    qty_g.ok_or_else(|| DbError::not_found("Stock", stock_id))
}

/// Appends a movement to the ledger.
pub async fn insert_movement_tx(
    conn: &mut SqliteConnection,
    movement: &StockMovement,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, tenant_id, material_id, color, qty_delta_g, reason,
            ref_type, ref_id, ref_item_id, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.tenant_id)
    .bind(&movement.material_id)
    .bind(&movement.color)
    .bind(movement.qty_delta_g)
    .bind(&movement.reason)
    .bind(&movement.ref_type)
    .bind(&movement.ref_id)
    .bind(&movement.ref_item_id)
    .bind(&movement.created_by)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Whether a delivery movement already exists for an order line.
pub async fn delivery_recorded_tx(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    order_id: &str,
    item_id: &str,
) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM stock_movements
        WHERE tenant_id = ?1 AND ref_type = ?2 AND ref_id = ?3
          AND ref_item_id = ?4 AND reason = ?5
        "#,
    )
    .bind(tenant_id)
    .bind(ORDER_REF_TYPE)
    .bind(order_id)
    .bind(item_id)
    .bind(ORDER_DELIVERED_REASON)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count > 0)
}

/// Generates a new stock row or movement id.
pub fn generate_stock_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
