// ABOUTME: Structured error type for storage repository operations
// ABOUTME: Provides domain-specific errors with context for per-item failure reporting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use thiserror::Error;

/// Errors raised by the storage repository
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DatabaseError {
    /// Requested row does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (activity, stream, ...)
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Query failed to execute
    #[error("query failed: {context}")]
    QueryError {
        /// Failure description
        context: String,
    },

    /// Stored value could not be converted to or from the domain type
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// Connection could not be established
    #[error("connection failed: {0}")]
    ConnectionError(String),
}

/// Result alias for repository operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::NotFound {
                entity: "row",
                id: String::new(),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::ConnectionError(error.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::SerializationError(error.to_string())
            }
            other => Self::QueryError {
                context: other.to_string(),
            },
        }
    }
}
