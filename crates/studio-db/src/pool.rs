//! # Database Pool
//!
//! Opens the SQLite pool every repository, the reconciler and the service
//! share.
//!
//! ```text
//! DbConfig::from_env()          STUDIO_DB_PATH, STUDIO_DB_MAX_CONNECTIONS
//!       │
//!       ▼
//! Database::new(config)         foreign_keys=ON, busy_timeout, WAL (files)
//!       │                       migrations (embedded)
//!       ▼
//! db.orders() / db.stock() / db.reconciler()
//! ```
//!
//! Stock writers serialize on SQLite's write lock. `busy_timeout` only lets
//! a writer wait when its transaction asks for the lock up front
//! (`BEGIN IMMEDIATE`, see [`crate::repository::stock::begin_write`]); a
//! deferred transaction that reads first still fails with "database is
//! locked" once another writer commits.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::reconcile::{ReconcilerSettings, StockReconciler};
use crate::repository::client::ClientRepository;
use crate::repository::config::ConfigRepository;
use crate::repository::material::MaterialRepository;
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;
use crate::repository::stock::StockRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Environment variable holding the database file path.
pub const DB_PATH_ENV: &str = "STUDIO_DB_PATH";

/// Environment variable overriding the pool size.
pub const DB_MAX_CONNECTIONS_ENV: &str = "STUDIO_DB_MAX_CONNECTIONS";

const DEFAULT_DB_PATH: &str = "./studio.db";

/// Where the studio database lives and how the pool is sized.
///
/// ```rust,ignore
/// let config = DbConfig::from_env().max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    /// Default: 4
    pub max_connections: u32,
    /// How long a caller waits for a free connection. Default: 30 seconds
    pub acquire_timeout: Duration,
    /// How long SQLite waits on a locked database before failing a write.
    /// Default: 5 seconds
    pub busy_timeout: Duration,
    /// Apply pending migrations when the pool opens. Default: true
    pub migrate: bool,
}

impl DbConfig {
    /// Configuration for a database file, created if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: path.into(),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            migrate: true,
        }
    }

    /// Defaults, overridden by `STUDIO_DB_PATH` and
    /// `STUDIO_DB_MAX_CONNECTIONS`.
    pub fn from_env() -> Self {
        let mut config = match std::env::var(DB_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                debug!(path = %path, "Database path from environment");
                DbConfig::new(path)
            }
            _ => DbConfig::new(DEFAULT_DB_PATH),
        };

        if let Ok(value) = std::env::var(DB_MAX_CONNECTIONS_ENV) {
            match value.trim().parse::<u32>() {
                Ok(max) if max > 0 => {
                    debug!(max_connections = max, "Overriding pool size from environment");
                    config.max_connections = max;
                }
                _ => warn!(value = %value, "Ignoring invalid {}", DB_MAX_CONNECTIONS_ENV),
            }
        }

        config
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn migrate(mut self, migrate: bool) -> Self {
        self.migrate = migrate;
        self
    }

    /// A private in-memory database, for tests.
    ///
    /// One connection only: each connection to `:memory:` would see its own
    /// empty database. Inside an open transaction every query must therefore
    /// run on that transaction.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(":memory:")
        }
    }

    fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == ":memory:"
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the studio database. Cheap to clone; every repository it hands
/// out shares the same pool.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::from_env()).await?;
///
/// let low = db.stock().list_low(tenant_id).await?;
/// let report = db.reconciler().reconcile_delivery(tenant_id, order_id, Some(user_id)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and applies migrations (unless disabled).
    ///
    /// Every connection runs with foreign keys on. File databases use WAL
    /// with NORMAL synchronous.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.path.display(), "Opening studio database");

        let base = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };
        let options = base.foreign_keys(true).busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Pool ready");

        let db = Database { pool };
        if config.migrate {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Per-tenant cost configuration.
    pub fn config(&self) -> ConfigRepository {
        ConfigRepository::new(self.pool.clone())
    }

    pub fn clients(&self) -> ClientRepository {
        ClientRepository::new(self.pool.clone())
    }

    pub fn materials(&self) -> MaterialRepository {
        MaterialRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    /// Stock rows and the movement ledger.
    pub fn stock(&self) -> StockRepository {
        StockRepository::new(self.pool.clone())
    }

    /// A reconciler with settings from the environment.
    pub fn reconciler(&self) -> StockReconciler {
        StockReconciler::new(self.pool.clone(), ReconcilerSettings::from_env())
    }

    /// True when a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn close(&self) {
        info!("Closing studio database");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::migration_status;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);

        let (total, applied) = migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
        assert!(total >= 1);
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/studio-test.db")
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(2))
            .migrate(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(2));
        assert!(!config.migrate);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
