//! Unified error types for the hubbot core.
//!
//! Two families live here:
//! - [`TransportError`]: failures reported by a [`Transport`](crate::Transport)
//!   implementation (connect, invoke, socket loss).
//! - [`BotError`]: everything a caller of the [`Bot`](crate::Bot) API can see,
//!   including local argument mistakes and wrapped transport failures.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Connection closed while an operation was in flight.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// The transport has no open connection.
    #[error("transport is not connected")]
    NotConnected,

    /// Message send failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The hub did not answer an invocation in time.
    #[error("invocation of '{method}' timed out")]
    Timeout {
        /// The hub method that was invoked.
        method: String,
    },

    /// The hub answered an invocation with an error.
    #[error("hub rejected '{method}': {message}")]
    Remote {
        /// The hub method that was invoked.
        method: String,
        /// Error message returned by the hub.
        message: String,
    },

    /// The hub sent something that could not be understood.
    #[error("invalid response from hub: {0}")]
    InvalidResponse(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

// =============================================================================
// Bot Errors
// =============================================================================

/// Errors surfaced by the bot API.
#[derive(Debug, Clone, Error)]
pub enum BotError {
    /// A required argument was empty.
    #[error("required argument '{name}' is missing")]
    MissingArgument {
        /// Name of the missing argument.
        name: &'static str,
    },

    /// A chat message tried to smuggle a protocol command.
    #[error("chat text may not start with '/': {text}")]
    ForbiddenCommand {
        /// The rejected text.
        text: String,
    },

    /// An inbound event did not match its schema.
    #[error("malformed '{event}' payload: {reason}")]
    MalformedPayload {
        /// Name of the offending event.
        event: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Join failed and the identity registration that followed failed too.
    #[error("identity registration failed: {source}")]
    RegistrationFailed {
        /// The transport failure that ended registration.
        source: TransportError,
    },

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BotError {
    /// Creates a missing-argument error.
    pub fn missing(name: &'static str) -> Self {
        Self::MissingArgument { name }
    }

    /// Creates a malformed-payload error.
    pub fn malformed(event: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            event: event.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for bot operations.
pub type BotResult<T> = Result<T, BotError>;
