//! Custom error types for the common library
//!
//! Store implementations report failures through [`DatabaseError`] so that
//! services can tell connectivity problems apart from constraint violations.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// PostgreSQL SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// A unique index rejected the write
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// Stored data could not be decoded into the expected shape
    #[error("Database decode error: {0}")]
    Decode(String),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl DatabaseError {
    /// Classify a query failure, lifting unique violations out of the
    /// generic `Query` bucket.
    pub fn from_query(error: SqlxError) -> Self {
        if let SqlxError::Database(db_error) = &error {
            if db_error.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return DatabaseError::UniqueViolation {
                    constraint: db_error.constraint().unwrap_or_default().to_string(),
                };
            }
        }

        DatabaseError::Query(error)
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
