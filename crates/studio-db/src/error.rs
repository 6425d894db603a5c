//! # Database Error Types
//!
//! ```text
//! sqlx::Error ──┐
//! serde_json ───┴──► DbError ──┐
//!                              ├──► ServiceError ──► code() for the front end
//! CoreError ───────────────────┘
//! (validation, capabilities, lookups)
//! ```

use studio_core::{CoreError, ValidationError};
use thiserror::Error;

/// Storage errors, classified from `sqlx` and `serde_json` failures.
#[derive(Debug, Error)]
pub enum DbError {
    /// No such row in the caller's tenant.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write, e.g. a second stock row for the
    /// same material and color.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A stock row for an unknown material, an order for an unknown client,
    /// or a line for an unknown order.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Any other statement error reported by SQLite.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// BEGIN or COMMIT failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// `calculated_json` / `totals_json` or a column value could not be
    /// decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// ```text
/// RowNotFound                      → NotFound
/// Database "UNIQUE constraint"     → UniqueViolation (field = index columns)
/// Database "FOREIGN KEY"           → ForeignKeyViolation
/// Database (other)                 → QueryFailed
/// PoolTimedOut                     → PoolExhausted
/// ColumnDecode / Decode            → Serialization
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: stock.tenant_id, stock.material_id, stock.color"
                // "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DbError::Serialization(err.to_string())
            }

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Service Error
// =============================================================================

/// Error returned by [`crate::service::StudioService`] handlers.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Validation, permission or lookup failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Core(CoreError::Validation(err))
    }
}

impl ServiceError {
    /// Machine-readable code for the front end.
    ///
    /// ```text
    /// NOT_FOUND         Order/StockRow/Material/ClientNotFound, DbError::NotFound
    /// FORBIDDEN         Forbidden
    /// VALIDATION_ERROR  Validation, UniqueViolation, ForeignKeyViolation
    /// DATABASE_ERROR    everything else
    /// ```
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Core(CoreError::Forbidden { .. }) => "FORBIDDEN",
            ServiceError::Core(CoreError::Validation(_)) => "VALIDATION_ERROR",
            ServiceError::Core(_) => "NOT_FOUND",
            ServiceError::Db(DbError::NotFound { .. }) => "NOT_FOUND",
            ServiceError::Db(DbError::UniqueViolation { .. })
            | ServiceError::Db(DbError::ForeignKeyViolation { .. }) => "VALIDATION_ERROR",
            ServiceError::Db(_) => "DATABASE_ERROR",
        }
    }

    /// Whether the caller lacked the capability for the action.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ServiceError::Core(CoreError::Forbidden { .. }))
    }
}

/// Result type for command handlers.
pub type ServiceResult<T> = Result<T, ServiceError>;
