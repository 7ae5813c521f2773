//! Error types for lineage-graph

use std::fmt;
use thiserror::Error;

/// Lineage error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Event is missing a required field or has one of the wrong type
    MalformedEvent,
    /// Backing store cannot serve the request right now
    StoreUnavailable,
    /// Database errors (SQLite)
    Database,
    /// Serialization/deserialization errors
    Serialization,
    /// Edge refers to a run or dataset that was never upserted
    MissingNode,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedEvent => "malformed_event",
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
            ErrorKind::MissingNode => "missing_node",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lineage error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct LineageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl LineageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedEvent, message)
    }

    /// Required field absent (or empty) in an incoming event
    pub fn missing_field(path: &str) -> Self {
        Self::malformed(format!("missing required field '{}'", path))
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StoreUnavailable, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn missing_node(node: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::MissingNode,
            format!("Edge references unknown node: {}", node.into()),
        )
    }

    /// True when the caller may resend the same event unchanged.
    ///
    /// Ingestion is idempotent, so any store-side failure is safe to retry;
    /// a malformed event will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::StoreUnavailable | ErrorKind::Database
        )
    }
}

// SQLite error conversions
#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for LineageError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        let busy = matches!(
            err.sqlite_error_code(),
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen)
        );
        if busy {
            LineageError::store_unavailable(format!("SQLite unavailable: {}", err)).with_source(err)
        } else {
            LineageError::database(format!("SQLite error: {}", err)).with_source(err)
        }
    }
}

// JSON error conversions
impl From<serde_json::Error> for LineageError {
    fn from(err: serde_json::Error) -> Self {
        LineageError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, LineageError>;
