//! Client error taxonomy.
//!
//! Errors are cloneable because results flow through shared (coalesced)
//! futures: every caller awaiting the same in-flight fetch receives its own
//! copy of the outcome.

use thiserror::Error;

/// Errors surfaced by the client synchronization layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A required backend address is missing. Fatal at the point of first
    /// use; never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The login ceremony failed or was cancelled. The identity remains
    /// unauthenticated.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A remote call failed. The message is stored as the container's
    /// current error until superseded by a successful sync.
    #[error("remote call failed: {0}")]
    RemoteCall(String),

    /// A form-level validation failure, resolved entirely client-side.
    #[error("validation error: {0}")]
    Validation(String),
}

impl ClientError {
    /// Configuration error constructor.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Authentication error constructor.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    /// Remote-call error constructor. `message` is carried verbatim so the
    /// backend's own wording reaches the user.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteCall(message.into())
    }

    /// Validation error constructor.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error is fatal for the current operation chain.
    ///
    /// Configuration errors cannot be resolved by retrying; everything else
    /// is surfaced and left to an explicit user action.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Short label used in structured log events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Authentication(_) => "authentication",
            Self::RemoteCall(_) => "remote_call",
            Self::Validation(_) => "validation",
        }
    }
}
