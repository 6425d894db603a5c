//! # Material Repository
//!
//! Database operations for materials. Materials are never deleted; old
//! orders keep referring to them, so retiring one means `active = 0`.

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use studio_core::Material;

const MATERIAL_COLUMNS: &str = "id, tenant_id, name, price_per_kg, active, created_at";

/// Repository for material database operations.
#[derive(Debug, Clone)]
pub struct MaterialRepository {
    pool: SqlitePool,
}

impl MaterialRepository {
    /// Creates a new MaterialRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MaterialRepository { pool }
    }

    /// Inserts a new material.
    pub async fn insert(&self, material: &Material) -> DbResult<Material> {
        debug!(name = %material.name, "Inserting material");

        sqlx::query(
            r#"
            INSERT INTO materials (id, tenant_id, name, price_per_kg, active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&material.id)
        .bind(&material.tenant_id)
        .bind(&material.name)
        .bind(material.price_per_kg)
        .bind(material.active)
        .bind(material.created_at)
        .execute(&self.pool)
        .await?;

        Ok(material.clone())
    }

    /// Updates name, price and active flag of an existing material.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such material in the tenant
    pub async fn update(&self, material: &Material) -> DbResult<()> {
        debug!(id = %material.id, "Updating material");

        let result = sqlx::query(
            r#"
            UPDATE materials SET
                name = ?3,
                price_per_kg = ?4,
                active = ?5
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(&material.id)
        .bind(&material.tenant_id)
        .bind(&material.name)
        .bind(material.price_per_kg)
        .bind(material.active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Material", &material.id));
        }

        Ok(())
    }

    /// Gets a material by id within a tenant.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Material>> {
        let query = format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = ?1 AND tenant_id = ?2"
        );

        let material = sqlx::query_as::<_, Material>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(material)
    }

    /// Lists the materials offered on new orders, by name.
    pub async fn list_active(&self, tenant_id: &str) -> DbResult<Vec<Material>> {
        let query = format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials \
             WHERE tenant_id = ?1 AND active = 1 ORDER BY name"
        );

        let materials = sqlx::query_as::<_, Material>(&query)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = materials.len(), "Listed active materials");
        Ok(materials)
    }
}

/// Generates a new material id.
pub fn generate_material_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    fn material(tenant_id: &str, name: &str, active: bool) -> Material {
        Material {
            id: generate_material_id(),
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            price_per_kg: 120.0,
            active,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_get_update() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.materials();

        let mut pla = repo.insert(&material("t1", "PLA", true)).await.unwrap();
        let found = repo.get_by_id("t1", &pla.id).await.unwrap().unwrap();
        assert_eq!(found.name, "PLA");
        assert_eq!(found.price_per_kg, 120.0);

        // other tenants can't see it
        assert!(repo.get_by_id("t2", &pla.id).await.unwrap().is_none());

        pla.price_per_kg = 135.5;
        repo.update(&pla).await.unwrap();
        let found = repo.get_by_id("t1", &pla.id).await.unwrap().unwrap();
        assert_eq!(found.price_per_kg, 135.5);
    }

    #[tokio::test]
    async fn test_update_missing_material() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .materials()
            .update(&material("t1", "Ghost", true))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_active_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.materials();

        repo.insert(&material("t1", "PETG", true)).await.unwrap();
        repo.insert(&material("t1", "ABS", false)).await.unwrap();
        repo.insert(&material("t1", "Acrílico", true)).await.unwrap();
        repo.insert(&material("t2", "PLA", true)).await.unwrap();

        let names: Vec<String> = repo
            .list_active("t1")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Acrílico", "PETG"]);
    }
}
