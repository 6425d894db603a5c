//! # Client Repository
//!
//! Database operations for clients. Orders reference clients by id, so a
//! client with orders cannot be removed; there is no delete.

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use studio_core::Client;

const CLIENT_COLUMNS: &str =
    "id, tenant_id, name, whatsapp, city, neighborhood, channel, notes, created_at";

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Inserts a new client.
    pub async fn insert(&self, client: &Client) -> DbResult<Client> {
        debug!(name = %client.name, "Inserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (
                id, tenant_id, name, whatsapp, city, neighborhood, channel, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&client.id)
        .bind(&client.tenant_id)
        .bind(&client.name)
        .bind(&client.whatsapp)
        .bind(&client.city)
        .bind(&client.neighborhood)
        .bind(&client.channel)
        .bind(&client.notes)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;

        Ok(client.clone())
    }

    /// Overwrites every editable field of an existing client.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such client in the tenant
    pub async fn update(&self, client: &Client) -> DbResult<()> {
        debug!(id = %client.id, "Updating client");

        let result = sqlx::query(
            r#"
            UPDATE clients SET
                name = ?3,
                whatsapp = ?4,
                city = ?5,
                neighborhood = ?6,
                channel = ?7,
                notes = ?8
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(&client.id)
        .bind(&client.tenant_id)
        .bind(&client.name)
        .bind(&client.whatsapp)
        .bind(&client.city)
        .bind(&client.neighborhood)
        .bind(&client.channel)
        .bind(&client.notes)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", &client.id));
        }

        Ok(())
    }

    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Client>> {
        let query =
            format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1 AND tenant_id = ?2");

        let client = sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    /// Lists clients by name, optionally only those whose name contains
    /// `search` (case-insensitive for ASCII).
    pub async fn list(&self, tenant_id: &str, search: Option<&str>) -> DbResult<Vec<Client>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        let query = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients \
             WHERE tenant_id = ?1 AND (?2 IS NULL OR name LIKE ?2) \
             ORDER BY name"
        );

        let clients = sqlx::query_as::<_, Client>(&query)
            .bind(tenant_id)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = clients.len(), "Listed clients");
        Ok(clients)
    }
}

/// Generates a new client id.
pub fn generate_client_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    fn client(tenant_id: &str, name: &str) -> Client {
        Client {
            id: generate_client_id(),
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            whatsapp: Some("85 99999-0000".to_string()),
            city: Some("Fortaleza".to_string()),
            neighborhood: None,
            channel: Some("Instagram".to_string()),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_get_update() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.clients();

        let mut ana = repo.insert(&client("t1", "Ana")).await.unwrap();
        let found = repo.get_by_id("t1", &ana.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Ana");
        assert_eq!(found.city.as_deref(), Some("Fortaleza"));
        assert!(repo.get_by_id("t2", &ana.id).await.unwrap().is_none());

        ana.neighborhood = Some("Aldeota".to_string());
        ana.whatsapp = None;
        repo.update(&ana).await.unwrap();
        let found = repo.get_by_id("t1", &ana.id).await.unwrap().unwrap();
        assert_eq!(found.neighborhood.as_deref(), Some("Aldeota"));
        assert!(found.whatsapp.is_none());
    }

    #[tokio::test]
    async fn test_update_missing_client() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.clients().update(&client("t1", "Ghost")).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_by_name_with_search() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.clients();

        repo.insert(&client("t1", "Bruno")).await.unwrap();
        repo.insert(&client("t1", "Ana")).await.unwrap();
        repo.insert(&client("t1", "Mariana")).await.unwrap();
        repo.insert(&client("t2", "Anabel")).await.unwrap();

        let names = |clients: Vec<Client>| -> Vec<String> {
            clients.into_iter().map(|c| c.name).collect()
        };

        assert_eq!(
            names(repo.list("t1", None).await.unwrap()),
            vec!["Ana", "Bruno", "Mariana"]
        );
        assert_eq!(
            names(repo.list("t1", Some("ana")).await.unwrap()),
            vec!["Ana", "Mariana"]
        );
        assert_eq!(names(repo.list("t1", Some("  ")).await.unwrap()).len(), 3);
    }
}
