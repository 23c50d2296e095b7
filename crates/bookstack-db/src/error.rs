//! Database error types.
//!
//! `DbError` wraps everything sqlx can throw and classifies SQLite constraint
//! failures into typed variants callers can match on. In the settlement error
//! taxonomy this whole family is the "retry later" category: a storage
//! failure says nothing about the order, the signature, or the stock.

use thiserror::Error;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// A row the caller named does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE constraint rejected the write (duplicate book title,
    /// second success payment for an order, ...).
    #[error("duplicate value violates {constraint}")]
    Duplicate { constraint: String },

    /// A FOREIGN KEY constraint rejected the write.
    #[error("foreign key violation: {constraint}")]
    ForeignKey { constraint: String },

    /// Could not open or talk to the database.
    #[error("database connection error: {0}")]
    Connection(String),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// A statement failed for a non-constraint reason.
    #[error("query error: {0}")]
    Query(String),

    /// No pool connection became available in time.
    #[error("timed out waiting for a database connection")]
    Timeout,

    /// Anything sqlx reports that fits none of the above.
    #[error("database error: {0}")]
    Other(String),
}

impl DbError {
    /// NotFound for a named entity.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Duplicate for a named constraint.
    pub fn duplicate(constraint: impl Into<String>) -> Self {
        DbError::Duplicate {
            constraint: constraint.into(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            // SQLite names the failing constraint in the message text, e.g.
            //   "UNIQUE constraint failed: books.title"
            //   "FOREIGN KEY constraint failed"
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                if let Some(constraint) = message.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::Duplicate {
                        constraint: constraint.to_string(),
                    }
                } else if message.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKey {
                        constraint: message,
                    }
                } else {
                    DbError::Query(message)
                }
            }

            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "row".to_string(),
                id: String::new(),
            },

            sqlx::Error::PoolTimedOut => DbError::Timeout,
            sqlx::Error::PoolClosed => DbError::Connection("connection pool is closed".to_string()),
            sqlx::Error::Io(io_err) => DbError::Connection(io_err.to_string()),

            other => DbError::Other(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let err = DbError::not_found("Book", "b-42");
        assert_eq!(err.to_string(), "Book not found: b-42");

        let err = DbError::duplicate("books.title");
        assert_eq!(err.to_string(), "duplicate value violates books.title");
    }

    #[test]
    fn pool_timeout_maps_to_timeout() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::Timeout));
    }
}
