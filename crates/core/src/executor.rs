//! Orchestration of one secret read
//!
//! The executor walks a fixed, linear sequence of states:
//!
//! ```text
//! Created -> Resolving -> Authenticating -> Reading -> (Renewing) -> Succeeded | Failed
//! ```
//!
//! Nothing is retried. A failed invocation is reported once and the host
//! decides whether to run the step again.

use crate::Result;
use crate::context::StepContext;
use crate::defaults::DefaultsProvider;
use crate::error::{FailureKind, StepError};
use crate::selector::{ResolvedStep, resolve};
use crate::step::StepConfig;
use std::fmt;
use std::sync::Arc;
use vaultstep_secrets::{
    BackendConnector, BackendError, CredentialStore, JobScope, SecureSecret, SessionState,
    VaultCredential,
};

/// Phase of a step invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// Not started
    Created,
    /// Merging configuration with defaults
    Resolving,
    /// Connecting and authenticating
    Authenticating,
    /// Reading the secret
    Reading,
    /// Renewing the session token
    Renewing,
    /// Finished with a value (possibly absent)
    Succeeded,
    /// Finished with an error
    Failed,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Resolving => "resolving",
            Self::Authenticating => "authenticating",
            Self::Reading => "reading",
            Self::Renewing => "renewing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct Progress {
    state: StepState,
}

impl Progress {
    const fn new() -> Self {
        Self {
            state: StepState::Created,
        }
    }

    fn enter(&mut self, next: StepState) {
        tracing::debug!(from = %self.state, to = %next, "Step state changed");
        self.state = next;
    }
}

/// Failure as presented to the host.
///
/// `Detailed` keeps the structured error and renders its full cause chain.
/// `Summary` keeps only the top-level message.
#[derive(Debug)]
pub enum StepFailure {
    /// Full error, produced when stack traces are requested
    Detailed(StepError),
    /// Short message, produced by default
    Summary {
        /// Category of the underlying error
        kind: FailureKind,
        /// Top-level error message
        message: String,
    },
}

impl StepFailure {
    /// Present `err` with or without detail
    #[must_use]
    pub fn present(err: StepError, detailed: bool) -> Self {
        if detailed {
            Self::Detailed(err)
        } else {
            Self::Summary {
                kind: err.kind(),
                message: err.to_string(),
            }
        }
    }

    /// Category of the underlying error
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Detailed(err) => err.kind(),
            Self::Summary { kind, .. } => *kind,
        }
    }

    /// Structured error, when detail was requested
    #[must_use]
    pub const fn error(&self) -> Option<&StepError> {
        match self {
            Self::Detailed(err) => Some(err),
            Self::Summary { .. } => None,
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Summary { message, .. } => f.write_str(message),
            Self::Detailed(err) => {
                write!(f, "{err}")?;
                let backend = err.backend_error();
                if let Some(backend) = backend {
                    write!(
                        f,
                        "\n  operation: {}\n  kind: {}",
                        backend.operation, backend.kind
                    )?;
                }
                let mut source_type = backend.and_then(BackendError::source_type);
                let mut cause = std::error::Error::source(err);
                while let Some(current) = cause {
                    match source_type.take() {
                        Some(type_name) => write!(f, "\nCaused by: {type_name}: {current}")?,
                        None => write!(f, "\nCaused by: {current}")?,
                    }
                    cause = current.source();
                }
                Ok(())
            }
        }
    }
}

/// Host-side completion protocol
pub trait StepCallbacks {
    /// The step produced a value (`None` when the key was absent)
    fn on_success(&mut self, value: Option<SecureSecret>);
    /// The step failed
    fn on_failure(&mut self, failure: StepFailure);
}

/// Result of one invocation
#[derive(Debug)]
pub enum StepOutcome {
    /// Read (and renewal, if requested) succeeded
    Succeeded(Option<SecureSecret>),
    /// Any step of the sequence failed
    Failed(StepFailure),
}

impl StepOutcome {
    /// Whether the invocation succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Hand the outcome to the host. Exactly one callback fires.
    pub fn complete<C: StepCallbacks + ?Sized>(self, callbacks: &mut C) {
        match self {
            Self::Succeeded(value) => callbacks.on_success(value),
            Self::Failed(failure) => callbacks.on_failure(failure),
        }
    }
}

/// Runs vault read steps against injected collaborators.
///
/// The executor holds no per-invocation state and can serve concurrent runs.
#[derive(Clone)]
pub struct StepExecutor {
    defaults: Arc<dyn DefaultsProvider>,
    credentials: Arc<dyn CredentialStore>,
    connector: Arc<dyn BackendConnector>,
}

impl fmt::Debug for StepExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepExecutor").finish_non_exhaustive()
    }
}

impl StepExecutor {
    /// Create an executor
    #[must_use]
    pub fn new(
        defaults: Arc<dyn DefaultsProvider>,
        credentials: Arc<dyn CredentialStore>,
        connector: Arc<dyn BackendConnector>,
    ) -> Self {
        Self {
            defaults,
            credentials,
            connector,
        }
    }

    /// Run one step to completion
    #[tracing::instrument(skip_all, fields(job = %ctx.scope().job_name))]
    pub async fn run(&self, config: &StepConfig, ctx: &StepContext) -> StepOutcome {
        let mut progress = Progress::new();

        progress.enter(StepState::Resolving);
        let defaults = self.defaults.current_defaults();
        let resolved = resolve(config, ctx.env(), defaults.as_ref());

        match self.execute(&resolved, ctx, &mut progress).await {
            Ok(value) => {
                progress.enter(StepState::Succeeded);
                tracing::info!(path = %resolved.path, found = value.is_some(), "Vault read step succeeded");
                StepOutcome::Succeeded(value)
            }
            Err(err) => {
                progress.enter(StepState::Failed);
                tracing::warn!(path = %resolved.path, error = %err, "Vault read step failed");
                StepOutcome::Failed(StepFailure::present(err, resolved.print_stacktrace))
            }
        }
    }

    async fn execute(
        &self,
        resolved: &ResolvedStep,
        ctx: &StepContext,
        progress: &mut Progress,
    ) -> Result<Option<SecureSecret>> {
        ctx.log(&format!(
            "Using vault credentials \"{}\" and url \"{}\"",
            resolved.credential_id, resolved.vault_url
        ));
        validate(resolved)?;

        let credential = self.lookup_credential(&resolved.credential_id, ctx.scope());

        progress.enter(StepState::Authenticating);
        let state = SessionState::initialize(resolved.vault_url.as_str())?;
        let mut session = self.connector.connect(state, &resolved.session)?;
        session.authenticate(credential.as_ref()).await?;

        progress.enter(StepState::Reading);
        let mut secret = session
            .read(&resolved.path, resolved.engine_version)
            .await?;
        let value = secret.take(&resolved.key);
        if value.is_none() {
            if resolved.fail_on_missing_key {
                return Err(StepError::MissingKey {
                    path: resolved.path.clone(),
                    key: resolved.key.clone(),
                });
            }
            tracing::warn!(path = %resolved.path, key = %resolved.key, "Key not present in secret");
        }

        if resolved.renew {
            progress.enter(StepState::Renewing);
            ctx.log(&format!(
                "Renewing vault token for {} hours",
                resolved.renew_hours
            ));
            session
                .renew(resolved.renew_hours)
                .await
                .map_err(StepError::Renewal)?;
        }

        Ok(value)
    }

    fn lookup_credential(&self, id: &str, scope: &JobScope) -> Option<VaultCredential> {
        if id.is_empty() {
            tracing::debug!("No credential id resolved, continuing unauthenticated");
            return None;
        }
        let credential = self.credentials.find_credential_by_id(id, scope);
        match &credential {
            Some(found) => {
                tracing::debug!(credential_id = %id, method = found.method(), "Credential found");
            }
            None => {
                tracing::warn!(credential_id = %id, job = %scope.job_name, "Credential not found, continuing unauthenticated");
            }
        }
        credential
    }
}

fn validate(resolved: &ResolvedStep) -> Result<()> {
    if resolved.renew && resolved.renew_hours == 0 {
        return Err(StepError::configuration(
            "renewHours must be greater than zero when renew is enabled",
        ));
    }
    if !matches!(resolved.engine_version, 1 | 2) {
        return Err(StepError::configuration(format!(
            "unsupported KV engine version {}; expected 1 or 2",
            resolved.engine_version
        )));
    }
    Ok(())
}
