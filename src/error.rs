use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use thiserror::Error;

use crate::constants::DocumentStatus;

pub type StoreResult<T> = Result<T, StoreError>;

const MAX_MESSAGE_LEN: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Duplicate,
    Constraint,
    Connection,
    Query,
    Validation,
    InvalidTransition,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    Constraint(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("{0}")]
    Validation(String),
    #[error("transition from '{from}' to '{to}' is not permitted")]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Duplicate(_) => ErrorKind::Duplicate,
            StoreError::Constraint(_) => ErrorKind::Constraint,
            StoreError::Connection(_) => ErrorKind::Connection,
            StoreError::Query(_) => ErrorKind::Query,
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        StoreError::NotFound(message.into())
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        StoreError::Duplicate(message.into())
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        StoreError::Constraint(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation(message.into())
    }

    pub fn connection(message: impl Into<String>) -> Self {
        StoreError::Connection(sanitize(&message.into()))
    }

    pub fn query(message: impl Into<String>) -> Self {
        StoreError::Query(sanitize(&message.into()))
    }
}

pub(crate) fn sanitize(raw: &str) -> String {
    let first_line = raw.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() <= MAX_MESSAGE_LEN {
        return first_line.to_string();
    }
    let mut truncated: String = first_line.chars().take(MAX_MESSAGE_LEN).collect();
    truncated.push('…');
    truncated
}

impl From<DieselError> for StoreError {
    fn from(value: DieselError) -> Self {
        match value {
            DieselError::NotFound => StoreError::not_found("resource not found"),
            DieselError::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                tracing::warn!(error = %message, ?kind, "database rejected statement");
                match kind {
                    DatabaseErrorKind::UniqueViolation => {
                        StoreError::duplicate(sanitize(&message))
                    }
                    DatabaseErrorKind::ForeignKeyViolation
                    | DatabaseErrorKind::NotNullViolation
                    | DatabaseErrorKind::CheckViolation => {
                        StoreError::constraint(sanitize(&message))
                    }
                    DatabaseErrorKind::ClosedConnection => StoreError::connection(message),
                    _ => classify_message(&message),
                }
            }
            other => {
                tracing::error!(error = %other, "unexpected database failure");
                StoreError::query(other.to_string())
            }
        }
    }
}

// sqlite reports some constraint failures without an extended result code
fn classify_message(message: &str) -> StoreError {
    if message.contains("UNIQUE constraint failed") {
        StoreError::duplicate(sanitize(message))
    } else if message.contains("FOREIGN KEY constraint failed")
        || message.contains("CHECK constraint failed")
        || message.contains("NOT NULL constraint failed")
    {
        StoreError::constraint(sanitize(message))
    } else {
        StoreError::query(message)
    }
}

impl From<diesel::r2d2::PoolError> for StoreError {
    fn from(value: diesel::r2d2::PoolError) -> Self {
        StoreError::connection(format!("database pool error: {value}"))
    }
}

impl From<diesel::ConnectionError> for StoreError {
    fn from(value: diesel::ConnectionError) -> Self {
        StoreError::connection(value.to_string())
    }
}
