//! # Error Types
//!
//! Domain-specific error types for studio-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  studio-core errors (this file)                                        │
//! │  ├── CoreError        - Domain / permission errors                     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  studio-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── ServiceError     - What command handlers return                   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pricing engine and the totals aggregator never return errors: they
//! are total over their numeric inputs. Errors only come from the edges
//! (validation, permissions, lookups).

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Order cannot be found in the caller's tenant.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Stock row cannot be found in the caller's tenant.
    #[error("Stock row not found: {0}")]
    StockRowNotFound(String),

    /// Material cannot be found in the caller's tenant.
    #[error("Material not found: {0}")]
    MaterialNotFound(String),

    /// Client cannot be found in the caller's tenant.
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// The caller's capabilities do not allow the action.
    ///
    /// ## When This Occurs
    /// - A viewer tries to change an order status
    /// - An operator tries to change the cost configuration
    #[error("User {user_id} is not allowed to {action}")]
    Forbidden { user_id: String, action: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a Forbidden error for a user and the attempted action.
    pub fn forbidden(user_id: impl Into<String>, action: impl Into<String>) -> Self {
        CoreError::Forbidden {
            user_id: user_id.into(),
            action: action.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used by command handlers before anything is written.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (e.g. a NaN amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::forbidden("user-1", "change order status");
        assert_eq!(
            err.to_string(),
            "User user-1 is not allowed to change order status"
        );

        let err = CoreError::OrderNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Order not found: abc");

        let err = CoreError::ClientNotFound("cli-9".to_string());
        assert_eq!(err.to_string(), "Client not found: cli-9");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "client_id".to_string(),
        };
        assert_eq!(err.to_string(), "client_id is required");

        let err = ValidationError::MustBeNonNegative {
            field: "price_per_kg".to_string(),
        };
        assert_eq!(err.to_string(), "price_per_kg must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "color".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
