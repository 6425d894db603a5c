//! # Product Repository
//!
//! The product catalog. Products pre-fill order lines and decide which
//! delivered lines consume stock (see [`studio_core::ProductCategory`]).

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use studio_core::Product;

const PRODUCT_COLUMNS: &str = "id, tenant_id, name, category, default_material_id, \
     default_color, avg_time_h, avg_weight_g, fixed_price, notes, created_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - Default material doesn't exist
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(name = %product.name, category = ?product.category, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, name, category, default_material_id,
                default_color, avg_time_h, avg_weight_g, fixed_price,
                notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.name)
        .bind(product.category)
        .bind(&product.default_material_id)
        .bind(&product.default_color)
        .bind(product.avg_time_h)
        .bind(product.avg_weight_g)
        .bind(product.fixed_price)
        .bind(&product.notes)
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Overwrites every editable field of an existing product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such product in the tenant
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?3,
                category = ?4,
                default_material_id = ?5,
                default_color = ?6,
                avg_time_h = ?7,
                avg_weight_g = ?8,
                fixed_price = ?9,
                notes = ?10
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.name)
        .bind(product.category)
        .bind(&product.default_material_id)
        .bind(&product.default_color)
        .bind(product.avg_time_h)
        .bind(product.avg_weight_g)
        .bind(product.fixed_price)
        .bind(&product.notes)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Gets a product by id within a tenant.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Product>> {
        let query =
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND tenant_id = ?2");

        let product = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists a tenant's catalog by name.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<Product>> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = ?1 ORDER BY name");

        let products = sqlx::query_as::<_, Product>(&query)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }
}

/// Generates a new product id.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}
