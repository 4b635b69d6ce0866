//! Core of the vault read step
//!
//! Turns a [`StepConfig`] into a secret value:
//! - [`macros`] expands `${VAR}` placeholders from the job environment
//! - [`selector`] merges the step with the [`GlobalDefaults`]
//! - [`executor`] drives the backend session and reports a [`StepOutcome`]
//!
//! Backends plug in through the traits in `vaultstep-secrets`.

pub mod context;
pub mod credentials;
pub mod defaults;
pub mod error;
pub mod executor;
pub mod macros;
pub mod selector;
pub mod step;

pub use context::{BufferSink, LogSink, StepContext, StepContextBuilder};
pub use credentials::{
    CREDENTIALS_ENV_VAR, discover_credential_store, load_credential_store, parse_credential_store,
};
pub use defaults::{DefaultsProvider, FileDefaults, GlobalDefaults, StaticDefaults};
pub use error::{FailureKind, Result, StepError};
pub use executor::{StepCallbacks, StepExecutor, StepFailure, StepOutcome, StepState};
pub use macros::expand;
pub use selector::{ResolvedStep, resolve};
pub use step::{StepConfig, StepConfigBuilder};
