//! Error type for step execution

use miette::Diagnostic;
use thiserror::Error;
use vaultstep_secrets::{BackendError, BackendErrorKind, BackendOperation};

/// Main error type for a step invocation
#[derive(Error, Debug, Diagnostic)]
pub enum StepError {
    /// Static misconfiguration, detected before any network call
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(vaultstep::configuration),
        help("Set vaultUrl / credentialsId on the step or in the global defaults file")
    )]
    Configuration {
        /// What is wrong
        message: String,
    },

    /// Authentication or read failure reported by the backend
    #[error(transparent)]
    #[diagnostic(code(vaultstep::backend))]
    Backend(BackendError),

    /// The secret was read but the token could not be kept alive
    #[error(transparent)]
    #[diagnostic(
        code(vaultstep::renewal),
        help("Check that the token is renewable or run the step with renew disabled")
    )]
    Renewal(BackendError),

    /// The requested key is absent and strict key lookup is enabled
    #[error("Key '{key}' not found in secret '{path}'")]
    #[diagnostic(code(vaultstep::missing_key))]
    MissingKey {
        /// Secret path that was read
        path: String,
        /// Key that was requested
        key: String,
    },
}

impl StepError {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// The backend error behind this failure, if any
    #[must_use]
    pub const fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::Backend(err) | Self::Renewal(err) => Some(err),
            Self::Configuration { .. } | Self::MissingKey { .. } => None,
        }
    }

    /// Whether this failure came from a backend call (renewal included)
    #[must_use]
    pub const fn is_backend(&self) -> bool {
        self.backend_error().is_some()
    }

    /// Coarse classification, kept when the error itself is summarized
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Configuration { .. } => FailureKind::Configuration,
            Self::Backend(_) => FailureKind::Backend,
            Self::Renewal(_) => FailureKind::Renewal,
            Self::MissingKey { .. } => FailureKind::MissingKey,
        }
    }
}

/// Category of a [`StepError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Static misconfiguration
    Configuration,
    /// Authentication or read failure
    Backend,
    /// Token renewal failure
    Renewal,
    /// Strict key lookup found nothing
    MissingKey,
}

/// Classify a backend failure.
///
/// - configuration problems found while connecting → `Configuration`
/// - any failure of the renewal call → `Renewal`
/// - everything else → `Backend`
impl From<BackendError> for StepError {
    fn from(err: BackendError) -> Self {
        if err.operation == BackendOperation::Connect && err.kind == BackendErrorKind::Configuration
        {
            Self::Configuration {
                message: err.message,
            }
        } else if err.is_renewal() {
            Self::Renewal(err)
        } else {
            Self::Backend(err)
        }
    }
}

/// Result type alias for step operations
pub type Result<T> = std::result::Result<T, StepError>;
