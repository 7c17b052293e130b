use std::time::Duration;

use thiserror::Error;

/// Convenience result type for messaging operations.
pub type Result<T, E = MessagingError> = std::result::Result<T, E>;

/// Failures reported by a transport binding (broker client).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The broker URL could not be parsed or names an unsupported scheme.
    #[error("invalid broker url: {0}")]
    InvalidUrl(String),
    /// No broker is reachable at the given address.
    #[error("broker unreachable: {0}")]
    Unreachable(String),
    /// The connection (or the broker behind it) has been closed.
    #[error("connection closed")]
    ConnectionClosed,
    /// The consumer has been closed.
    #[error("consumer closed")]
    ConsumerClosed,
    /// A temporary destination no longer exists.
    #[error("destination not found: {0}")]
    DestinationNotFound(String),
    /// A transport lock was poisoned by a panicking thread.
    #[error("transport lock poisoned during {0}")]
    LockPoisoned(&'static str),
    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Caller-facing error type for the messaging core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagingError {
    /// A required argument or context field was missing. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The broker is unreachable or the connection failed.
    #[error("connection error: {0}")]
    Connection(#[source] TransportError),
    /// A destination could not be created or resolved.
    #[error("destination error: {0}")]
    Destination(#[source] TransportError),
    /// The transport rejected a send.
    #[error("send failed: {0}")]
    Send(String),
    /// An envelope could not be encoded to text.
    #[error("encode failed: {0}")]
    Encode(String),
    /// A payload could not be decoded to the expected envelope type.
    #[error("decode failed: {0}")]
    Decode(String),
    /// No response arrived within the wait bound. Not terminal.
    #[error("timed out after {0:?} waiting for a response")]
    Timeout(Duration),
    /// The response future was cancelled. Terminal.
    #[error("response future was cancelled")]
    Cancelled,
}

impl MessagingError {
    /// Classify a failed transport send.
    ///
    /// A closed connection is a connection-level failure; anything else is a
    /// rejected send.
    pub(crate) fn from_send(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionClosed => MessagingError::Connection(err),
            other => MessagingError::Send(other.to_string()),
        }
    }

    /// Classify a failure to create a destination or attach to one.
    ///
    /// A closed connection is a connection-level failure; anything else is a
    /// destination failure.
    pub(crate) fn from_destination(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionClosed => MessagingError::Connection(err),
            other => MessagingError::Destination(other),
        }
    }

    pub(crate) fn missing(what: &str) -> Self {
        MessagingError::InvalidArgument(format!("context had no {}", what))
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        MessagingError::Decode(err.to_string())
    }
}
