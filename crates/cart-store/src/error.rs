//! # Error Types
//!
//! Error types for storage operations and the cart store surface.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  KvError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├── at startup: recovered as "empty cart" (logged, not raised)   │
//! │       └── after a mutation: write is best-effort (logged, not raised)  │
//! │                                                                         │
//! │  StoreError::Detached ← the one error consumers DO see: commands       │
//! │  requested after the owning CartStore is gone. Fails loudly.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Storage Errors
// =============================================================================

/// Key-value storage errors.
///
/// These errors wrap sqlx errors and provide additional context. The cart
/// store recovers from all of them locally (empty cart on hydration failure,
/// in-memory state kept on write failure); they surface directly only from
/// explicit [`crate::KvStore`] calls.
#[derive(Debug, Error)]
pub enum KvError {
    /// Storage connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Pool closed or exhausted
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Internal storage error.
    #[error("Internal storage error: {0}")]
    Internal(String),
}

/// Convert sqlx errors to KvError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → KvError::QueryFailed (with driver message)
/// sqlx::Error::PoolTimedOut   → KvError::ConnectionFailed
/// sqlx::Error::PoolClosed     → KvError::ConnectionFailed
/// Other                       → KvError::Internal
/// ```
impl From<sqlx::Error> for KvError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => KvError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => {
                KvError::ConnectionFailed("Connection pool timed out".to_string())
            }
            sqlx::Error::PoolClosed => KvError::ConnectionFailed("Pool is closed".to_string()),
            _ => KvError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for KvError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        KvError::MigrationFailed(err.to_string())
    }
}

/// Result type for storage operations.
pub type KvResult<T> = Result<T, KvError>;

// =============================================================================
// Store Errors
// =============================================================================

/// Cart store surface errors.
///
/// Cart commands themselves never fail (unknown ids are defined as silent
/// no-ops, persistence is best-effort); the only error a consumer can hit is
/// using a [`crate::CartHandle`] whose owning [`crate::CartStore`] has been
/// dropped. That is a wiring mistake and must be surfaced immediately rather
/// than silently handing out a default empty cart.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Cart commands or reads requested outside an active `CartStore` scope.
    #[error("cart handle is detached: commands require the owning CartStore to be alive")]
    Detached,
}

/// Result type for cart store handle operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = KvError::ConnectionFailed("Pool is closed".to_string());
        assert_eq!(err.to_string(), "Connection failed: Pool is closed");

        let err = KvError::QueryFailed("no such table: kv_store".to_string());
        assert_eq!(err.to_string(), "Query failed: no such table: kv_store");
    }

    #[test]
    fn test_detached_is_descriptive() {
        let msg = StoreError::Detached.to_string();
        assert!(msg.contains("CartStore"));
    }
}
