//! Adapts the step core to a command-line process

use crate::cli::{
    EXIT_ABSENT, EXIT_OK, ErrorEnvelope, OkEnvelope, OutputFormat, exit_code_for_failure,
    failure_code,
};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, Write};
use vaultstep_core::{LogSink, StepCallbacks, StepFailure};
use vaultstep_secrets::SecureSecret;

/// Build log on stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn println(&self, line: &str) {
        write_log_line(&mut io::stderr().lock(), line);
    }
}

fn write_log_line<W: Write>(out: &mut W, line: &str) {
    if let Err(e) = writeln!(out, "{line}") {
        tracing::error!(error = %e, "Failed to write build log line");
    }
}

/// Job environment of this process
#[must_use]
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[derive(Serialize)]
struct ReadResult<'a> {
    path: &'a str,
    key: &'a str,
    found: bool,
    value: Option<&'a str>,
}

/// Writes the step result and records the exit code
#[derive(Debug)]
pub struct CliCompletion<O, E> {
    stdout: O,
    stderr: E,
    format: OutputFormat,
    require_value: bool,
    path: String,
    key: String,
    exit_code: i32,
}

impl<O: Write, E: Write> CliCompletion<O, E> {
    /// Report the read of `key` in `path` to the given streams
    pub fn new(
        stdout: O,
        stderr: E,
        format: OutputFormat,
        require_value: bool,
        path: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            stdout,
            stderr,
            format,
            require_value,
            path: path.into(),
            key: key.into(),
            exit_code: EXIT_OK,
        }
    }

    /// Exit code for the process
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Streams, for inspection after completion
    pub fn into_streams(self) -> (O, E) {
        (self.stdout, self.stderr)
    }

    fn write_success(&mut self, value: Option<&SecureSecret>) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => {
                if let Some(value) = value {
                    writeln!(self.stdout, "{}", value.expose())?;
                }
            }
            OutputFormat::Json => {
                let envelope = OkEnvelope::new(ReadResult {
                    path: &self.path,
                    key: &self.key,
                    found: value.is_some(),
                    value: value.map(SecureSecret::expose),
                });
                let json = serde_json::to_string(&envelope).map_err(io::Error::other)?;
                writeln!(self.stdout, "{json}")?;
            }
        }
        if value.is_none() && self.require_value {
            writeln!(
                self.stderr,
                "error: key '{}' not present in secret '{}'",
                self.key, self.path
            )?;
        }
        self.stdout.flush()
    }

    fn write_failure(&mut self, failure: &StepFailure) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => writeln!(self.stderr, "error: {failure}")?,
            OutputFormat::Json => {
                let envelope = ErrorEnvelope::new(serde_json::json!({
                    "code": failure_code(failure.kind()),
                    "message": failure.to_string(),
                }));
                let json = serde_json::to_string(&envelope).map_err(io::Error::other)?;
                writeln!(self.stdout, "{json}")?;
            }
        }
        self.stderr.flush()
    }
}

impl<O: Write, E: Write> StepCallbacks for CliCompletion<O, E> {
    fn on_success(&mut self, value: Option<SecureSecret>) {
        if let Err(e) = self.write_success(value.as_ref()) {
            tracing::error!(error = %e, "Failed to write step result");
        }
        self.exit_code = if value.is_none() && self.require_value {
            EXIT_ABSENT
        } else {
            EXIT_OK
        };
    }

    fn on_failure(&mut self, failure: StepFailure) {
        if let Err(e) = self.write_failure(&failure) {
            tracing::error!(error = %e, "Failed to write step failure");
        }
        self.exit_code = exit_code_for_failure(failure.kind());
    }
}
