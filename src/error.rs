//! Error types for configuration, connection and write failures.

use thiserror::Error;

/// Failure reported by a [`StoreConnection`](crate::store::StoreConnection).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    /// Failure raised by a non-Redis connection (the in-memory store).
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of a [`PublishError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    UnsupportedArtifact,
    Connection,
    Write,
}

/// Errors that abort a single post-process invocation.
#[derive(Debug, Error)]
pub enum PublishError {
    /// One or more required fields were missing or empty.
    #[error("missing required configuration: {}", format_missing(.missing))]
    Configuration { missing: Vec<String> },

    /// The builder id is not in the policy table.
    #[error("unsupported artifact type: {0}")]
    UnsupportedArtifact(String),

    #[error("error parsing store address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("error connecting to Redis at {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: StoreError,
    },

    #[error("error authenticating to Redis at {address}: {source}")]
    Authentication {
        address: String,
        #[source]
        source: StoreError,
    },

    /// A SET failed. Pairs written before it stay written.
    #[error("error setting key {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: StoreError,
    },
}

impl PublishError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PublishError::Configuration { .. } => ErrorKind::Configuration,
            PublishError::UnsupportedArtifact(_) => ErrorKind::UnsupportedArtifact,
            PublishError::InvalidAddress { .. }
            | PublishError::Connection { .. }
            | PublishError::Authentication { .. } => ErrorKind::Connection,
            PublishError::Write { .. } => ErrorKind::Write,
        }
    }
}

fn format_missing(missing: &[String]) -> String {
    missing
        .iter()
        .map(|field| format!("{field} must be set"))
        .collect::<Vec<_>>()
        .join(", ")
}
