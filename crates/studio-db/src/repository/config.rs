//! # Cost Configuration Repository
//!
//! The per-tenant `config` row. A tenant without a row has no cost
//! configuration at all, and its order lines stay unpriced.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use studio_core::TenantConfig;

/// Repository for the tenant cost configuration.
#[derive(Debug, Clone)]
pub struct ConfigRepository {
    pool: SqlitePool,
}

impl ConfigRepository {
    /// Creates a new ConfigRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ConfigRepository { pool }
    }

    /// Gets the configuration row of a tenant.
    ///
    /// ## Returns
    /// * `Ok(Some(TenantConfig))` - Row exists (values may still be unset)
    /// * `Ok(None)` - Tenant never saved a configuration
    pub async fn get(&self, tenant_id: &str) -> DbResult<Option<TenantConfig>> {
        let config = sqlx::query_as::<_, TenantConfig>(
            r#"
            SELECT
                tenant_id,
                energy_per_h,
                labor_per_h,
                markup_material,
                print_price_per_h,
                base_fee,
                min_order_price,
                fortaleza_discount,
                packaging_default,
                updated_at,
                updated_by
            FROM config
            WHERE tenant_id = ?1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    /// Inserts or replaces the configuration row of `config.tenant_id`.
    pub async fn upsert(&self, config: &TenantConfig) -> DbResult<()> {
        debug!(tenant_id = %config.tenant_id, "Saving cost configuration");

        sqlx::query(
            r#"
            INSERT INTO config (
                tenant_id, energy_per_h, labor_per_h, markup_material,
                print_price_per_h, base_fee, min_order_price,
                fortaleza_discount, packaging_default, updated_at, updated_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT (tenant_id) DO UPDATE SET
                energy_per_h = excluded.energy_per_h,
                labor_per_h = excluded.labor_per_h,
                markup_material = excluded.markup_material,
                print_price_per_h = excluded.print_price_per_h,
                base_fee = excluded.base_fee,
                min_order_price = excluded.min_order_price,
                fortaleza_discount = excluded.fortaleza_discount,
                packaging_default = excluded.packaging_default,
                updated_at = excluded.updated_at,
                updated_by = excluded.updated_by
            "#,
        )
        .bind(&config.tenant_id)
        .bind(config.energy_per_h)
        .bind(config.labor_per_h)
        .bind(config.markup_material)
        .bind(config.print_price_per_h)
        .bind(config.base_fee)
        .bind(config.min_order_price)
        .bind(config.fortaleza_discount)
        .bind(config.packaging_default)
        .bind(config.updated_at)
        .bind(&config.updated_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
