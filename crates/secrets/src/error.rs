//! Errors raised by backend sessions

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The backend call that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOperation {
    /// Session initialization and client construction
    Connect,
    /// Login / token adoption
    Authenticate,
    /// Versioned key/value read
    Read,
    /// Token time-to-live renewal
    Renew,
}

impl std::fmt::Display for BackendOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connect => "connect",
            Self::Authenticate => "authentication",
            Self::Read => "read",
            Self::Renew => "token renewal",
        };
        f.write_str(s)
    }
}

/// Classification of a backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    /// Static misconfiguration (empty or unparseable URL, bad path)
    Configuration,
    /// Transport failure or timeout
    Network,
    /// The requested path does not exist
    NotFound,
    /// The token lacks permission for the request
    PermissionDenied,
    /// The backend answered with something that could not be decoded
    Malformed,
    /// Any other refusal by the backend
    Rejected,
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Configuration => "configuration",
            Self::Network => "network",
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::Malformed => "malformed response",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Failure of a single backend call.
///
/// The `Display` output carries the operation, kind and the backend's own
/// message. The underlying error and its Rust type name are kept separately
/// so callers can decide how much detail reaches a build log.
#[derive(Debug, Error)]
#[error("Vault {operation} failed ({kind}): {message}")]
pub struct BackendError {
    /// Which call failed
    pub operation: BackendOperation,
    /// Failure classification
    pub kind: BackendErrorKind,
    /// Message reported by the backend (or transport)
    pub message: String,
    #[source]
    source: Option<BoxedSource>,
    source_type: Option<&'static str>,
}

impl BackendError {
    /// Create a new error without an underlying cause
    #[must_use]
    pub fn new(
        operation: BackendOperation,
        kind: BackendErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            source: None,
            source_type: None,
        }
    }

    /// Shorthand for a configuration error raised while connecting
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(
            BackendOperation::Connect,
            BackendErrorKind::Configuration,
            message,
        )
    }

    /// Attach the underlying error, recording its type name
    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source_type = Some(std::any::type_name::<E>());
        self.source = Some(Box::new(source));
        self
    }

    /// Rust type name of the underlying error, if one was attached
    #[must_use]
    pub const fn source_type(&self) -> Option<&'static str> {
        self.source_type
    }

    /// Whether this failure came from the renewal call
    #[must_use]
    pub fn is_renewal(&self) -> bool {
        self.operation == BackendOperation::Renew
    }
}
