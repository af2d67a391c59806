//! Error types for mailcast.

use serde::Serialize;

/// Startup error type for the campaign service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while building a [`Table`](crate::campaign::Table) from uploaded records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("Row {row} has column \"{column}\" which is not in the declared column set")]
    UnknownColumn { row: usize, column: String },

    #[error("Column \"{0}\" is declared more than once")]
    DuplicateColumn(String),

    #[error("Column names must not be empty")]
    EmptyColumnName,

    #[error("Row {0} is not an object")]
    NotAnObject(usize),
}

/// Mail transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to build transport: {0}")]
    Build(String),

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Send task failed: {0}")]
    Join(String),
}

/// One structural problem found in a dispatch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dotted path to the offending field, e.g. `agents.0.recipients.2.to`.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Dispatch errors. Every variant is reported once to the caller; none are retried.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid campaign request ({} issue(s))", issues.len())]
    MalformedRequest { issues: Vec<ValidationIssue> },

    #[error("No sender address configured. {hint}")]
    MissingSenderIdentity { hint: String },

    #[error("Failed to send to {recipient}: {cause}")]
    SendFailure {
        recipient: String,
        #[source]
        cause: TransportError,
    },

    #[error("No agent matched any recipient with an email address")]
    EmptyRecipientSet,
}

/// Result type alias for mailcast.
pub type Result<T> = std::result::Result<T, Error>;
