//! # Error Types
//!
//! Defines `StudentSeedError`, the unified error enum for every failure mode
//! in the load → derive → synthesize → insert pipeline. Store-facing variants
//! carry the sanitized connection string or a truncated SQL preview so a
//! failure can be debugged without digging through logs.

use thiserror::Error;

/// All errors that can occur in studentseed operations.
#[derive(Error, Debug)]
pub enum StudentSeedError {
    #[error("Database connection failed: {message}\n  Connection string: {connection_hint}\n  Cause: {source}")]
    Connection {
        message: String,
        connection_hint: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Loading reference rows failed on query '{query}': {source}")]
    Load {
        query: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Unexpected value '{value}' in column {column} of reference row {row_id}")]
    InvalidReferenceValue {
        column: String,
        value: String,
        row_id: i64,
    },

    #[error("Unsupported database scheme '{scheme}'. Supported: postgres://, sqlite://")]
    UnsupportedDatabase { scheme: String },

    #[error("Insert of {row_count} rows failed: {message}\n  SQL: {sql_preview}\n  DB error: {source}")]
    InsertFailed {
        row_count: usize,
        message: String,
        sql_preview: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StudentSeedError>;
