//! Error types for pulse-stream

/// Live channel failures. Recovered locally by closing the connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("Endpoint answered with HTTP status {0}")]
    Status(u16),

    #[error("Stream dropped: {0}")]
    Dropped(String),

    #[error("Connection refused: {0}")]
    Refused(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

/// A single payload could not be turned into an Event. The payload is dropped.
#[derive(Debug, thiserror::Error)]
pub enum MalformedEventError {
    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown event kind '{0}'")]
    UnknownKind(String),

    #[error("Invalid timestamp '{0}'")]
    Timestamp(String),
}

/// Rejected buffer configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferConfigError {
    #[error("max_items must be greater than zero (got {0})")]
    MaxItems(i64),
}
