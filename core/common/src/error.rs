//! Common error types for deskbridge.

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for helpdesk API operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP method outside GET/POST/PUT/PATCH/DELETE.
    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    /// Field is not on the resource's editable whitelist.
    #[error("Invalid field given for {resource}: {field}")]
    InvalidField {
        resource: &'static str,
        field: String,
    },

    /// An update call was given the wrong number of arguments.
    #[error("Invalid number of arguments for {method}: expected 1, got {given}")]
    InvalidNumberOfArguments { method: String, given: usize },

    /// Save was called with nothing staged on a resource that rejects it.
    #[error("No updated fields to save on {0}")]
    NoPendingChanges(&'static str),

    /// The server answered with a body of the wrong shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The server throttled the request (HTTP 429).
    #[error("Rate limited{}", retry_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// The API returned a structured error body.
    #[error("Server error {code}: {description}")]
    ServerReported { code: String, description: String },

    /// Network or HTTP failure without a structured error body.
    #[error("Transport error{}: {message}", status_suffix(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// No ticket exists under this ID.
    #[error("Ticket not found: {0}")]
    TicketNotFound(u64),

    /// No user exists under this username.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// No asset exists under this ID.
    #[error("Asset not found: {0}")]
    AssetNotFound(u64),

    /// No category matches this "Section \ Name" key.
    #[error("Unable to find matching category: {0}")]
    CategoryNotFound(String),

    /// Client configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether a caller may reasonably retry the failed call after a pause.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }

    /// Whether this is one of the per-resource not-found errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::TicketNotFound(_)
                | Error::UserNotFound(_)
                | Error::AssetNotFound(_)
                | Error::CategoryNotFound(_)
        )
    }
}

fn retry_suffix(retry_after: &Option<Duration>) -> String {
    retry_after
        .map(|d| format!(", retry after {}s", d.as_secs()))
        .unwrap_or_default()
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
