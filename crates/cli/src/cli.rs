//! Command-line surface: arguments, exit codes and error rendering

use crate::logging::{LogFormat, LogLevel};
use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::{Diagnostic, Report};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;
use vaultstep_core::{FailureKind, StepConfig, StepError};

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CONFIG: i32 = 2;
/// Backend, renewal or missing-key error exit code
pub const EXIT_BACKEND: i32 = 3;
/// The key was absent and `--require-value` was given
pub const EXIT_ABSENT: i32 = 4;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("Configuration error: {message}")]
    #[diagnostic(code(vaultstep::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Runtime failure outside the step itself (exit code 3)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(vaultstep::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }
}

/// Configuration problems keep their message without the repeated prefix;
/// everything else is unexpected at this layer.
impl From<StepError> for CliError {
    fn from(err: StepError) -> Self {
        match err {
            StepError::Configuration { message } => Self::config_with_help(
                message,
                "Check the files passed with --defaults / --credentials",
            ),
            other => Self::other(other.to_string()),
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CONFIG,
        CliError::Other { .. } => EXIT_BACKEND,
    }
}

/// Map a failed step to an exit code
#[must_use]
pub const fn exit_code_for_failure(kind: FailureKind) -> i32 {
    match kind {
        FailureKind::Configuration => EXIT_CONFIG,
        FailureKind::Backend | FailureKind::Renewal | FailureKind::MissingKey => EXIT_BACKEND,
    }
}

/// Short machine-readable name of a failure kind
#[must_use]
pub const fn failure_code(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Configuration => "configuration",
        FailureKind::Backend => "backend",
        FailureKind::Renewal => "renewal",
        FailureKind::MissingKey => "missing_key",
    }
}

/// Render error appropriately based on the output format
pub fn render_error(err: &CliError, format: OutputFormat) {
    if format == OutputFormat::Json {
        let envelope = ErrorEnvelope::new(serde_json::json!({
            "code": match err {
                CliError::Config { .. } => "config",
                CliError::Other { .. } => "other",
            },
            "message": err.to_string()
        }));
        let mut stdout = io::stdout().lock();
        match serde_json::to_string(&envelope) {
            Ok(json) => {
                let _ = writeln!(stdout, "{json}");
            }
            Err(_) => {
                let _ = writeln!(io::stderr(), "Error serializing error response");
            }
        }
    } else {
        let report = Report::new(err.clone());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{report:?}");
        let _ = stderr.flush();
    }
}

/// Output format for command results
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum, Default)]
pub enum OutputFormat {
    /// The bare value on stdout
    #[default]
    Text,
    /// JSON envelope on stdout
    Json,
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Read secrets from HashiCorp Vault inside CI jobs.
#[derive(Parser, Debug)]
#[command(name = "vaultstep")]
#[command(about = "Read secrets from HashiCorp Vault inside CI jobs")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Diagnostic log format.
    #[arg(
        long,
        global = true,
        help = "Diagnostic log format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: LogFormat,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read one key of one secret.
    #[command(about = "Read one key of one secret")]
    Read(ReadArgs),
}

/// Arguments of `vaultstep read`.
///
/// Optional step fields stay unset unless given, so the global defaults can
/// fill them.
#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    /// Secret path, `<mount>/<path>`.
    #[arg(long, help = "Secret path, <mount>/<path> ($VAR expanded)")]
    pub path: String,

    /// Key to extract.
    #[arg(long, help = "Key to extract from the secret")]
    pub key: String,

    /// Credential id to authenticate with.
    #[arg(long, help = "Credential id (empty uses the default)")]
    pub credentials_id: Option<String>,

    /// Vault URL.
    #[arg(long, help = "Vault URL (empty uses the default)")]
    pub vault_url: Option<String>,

    /// Renew the token after reading.
    #[arg(long, value_name = "BOOL", help = "Renew the token after reading")]
    pub renew: Option<bool>,

    /// Renewal horizon in hours.
    #[arg(long, help = "Renewal horizon in hours")]
    pub renew_hours: Option<u32>,

    /// Print the full error chain on failure.
    #[arg(long, value_name = "BOOL", help = "Print the full error chain on failure")]
    pub print_stacktrace: Option<bool>,

    /// KV engine version.
    #[arg(long, help = "KV secrets engine version (1 or 2)")]
    pub engine_version: Option<u8>,

    /// Fail when the key is absent.
    #[arg(long, value_name = "BOOL", help = "Fail when the key is absent from the secret")]
    pub fail_on_missing_key: Option<bool>,

    /// Global defaults file.
    #[arg(long, value_name = "FILE", help = "Global defaults file (TOML)")]
    pub defaults: Option<PathBuf>,

    /// Credential store file.
    #[arg(long, value_name = "FILE", help = "Credential store file (TOML)")]
    pub credentials: Option<PathBuf>,

    /// Name of the running job.
    #[arg(long, env = "JOB_NAME", default_value = "local", help = "Name of the running job")]
    pub job: String,

    /// Id of this run of the job.
    #[arg(long, env = "BUILD_ID", default_value = "0", help = "Id of this run of the job")]
    pub run_id: String,

    /// Exit with code 4 when the key is absent.
    #[arg(long, help = "Exit with code 4 when the key is absent")]
    pub require_value: bool,

    /// Output format.
    #[arg(
        long = "output",
        short = 'o',
        help = "Output format",
        value_enum,
        default_value_t = OutputFormat::Text
    )]
    pub output_format: OutputFormat,
}

impl ReadArgs {
    /// The step these arguments describe
    #[must_use]
    pub fn step_config(&self) -> StepConfig {
        StepConfig::builder(self.path.clone(), self.key.clone())
            .credentials_id(self.credentials_id.clone())
            .vault_url(self.vault_url.clone())
            .renew(self.renew)
            .renew_hours(self.renew_hours)
            .print_stacktrace(self.print_stacktrace)
            .engine_version(self.engine_version)
            .fail_on_missing_key(self.fail_on_missing_key)
            .build()
    }
}

/// Parse command line arguments
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
