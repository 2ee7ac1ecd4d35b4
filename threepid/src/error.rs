//! Unified error types for the 3PID workflow.

use std::fmt;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An external collaborator the flow depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    /// The homeserver REST client (association and token endpoints).
    HomeserverClient,
    /// The identity service (lookup and token submission).
    IdentityService,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HomeserverClient => f.write_str("homeserver client"),
            Self::IdentityService => f.write_str("identity service"),
        }
    }
}

/// Top-level error type for the 3PID workflow.
///
/// Errors produced by a [`Gateway`](crate::Gateway) are published to the
/// subscriber exactly as returned, so the enum is `Clone` and comparable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A call succeeded but its response lacked required data (e.g. no `sid`).
    #[error("unknown error")]
    Unknown,

    /// The homeserver or identity server rejected the request.
    #[error("{errcode}: {message}")]
    Server {
        /// Matrix error code, e.g. `M_THREEPID_IN_USE`.
        errcode: String,
        /// Human-readable server message.
        message: String,
    },

    /// Transport-level failure reported by the collaborator.
    #[error("network: {0}")]
    Network(String),

    /// A required collaborator is not configured on the session.
    #[error("{0} unavailable")]
    Unavailable(Collaborator),

    /// The requested path exists on the server side but is not supported here.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// An exclusive action was dispatched while a request was in flight.
    #[error("another request is already in progress")]
    AlreadyInProgress,

    /// A validation code was submitted with no pending phone request.
    #[error("no pending validation request")]
    NoPendingValidation,

    /// The flow already has a live subscriber.
    #[error("flow already has a subscriber")]
    AlreadySubscribed,

    /// An argument passed to the crate was invalid.
    #[error("{0}")]
    InvalidArgument(String),

    /// The system random source failed.
    #[error("rng: {0}")]
    Rng(String),

    /// Filesystem failure (profile store, log file).
    #[error("io: {0}")]
    Io(String),
}

impl Error {
    /// Shorthand for a Matrix-style server error.
    pub fn server(errcode: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            errcode: errcode.into(),
            message: message.into(),
        }
    }

    /// Whether this error was produced by the flow itself rather than a
    /// collaborator, i.e. it is a dispatch-level rejection.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::AlreadyInProgress | Self::NoPendingValidation | Self::AlreadySubscribed
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
