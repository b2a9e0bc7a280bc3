use thiserror::Error;

/// Top-level error type for wasend.
#[derive(Debug, Error)]
pub enum WasendError {
    /// Error from the wrapped messaging client.
    #[error("client error: {0}")]
    Client(String),

    /// An operation needed a live session but there is none.
    #[error("WhatsApp not connected")]
    NotConnected,

    /// A recipient could not be turned into an address.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Request payload failed validation.
    #[error("{0}")]
    Validation(String),

    /// A record lookup by id found nothing.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// Persistence error.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
