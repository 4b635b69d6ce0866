//! `vaultstep read`

use crate::cli::{CliError, ReadArgs};
use crate::host::{CliCompletion, StderrSink, process_env};
use std::io::Write;
use std::sync::Arc;
use vaultstep_core::{
    FileDefaults, StepContext, StepExecutor, discover_credential_store, expand,
};
use vaultstep_secrets::JobScope;
use vaultstep_vault::VaultConnector;

/// Run one read step and report it on the given streams.
///
/// Returns the process exit code for a step that ran (successfully or not).
///
/// # Errors
///
/// Fails before the step starts when the defaults or credentials file cannot
/// be loaded.
pub async fn execute<O: Write, E: Write>(
    args: &ReadArgs,
    stdout: O,
    stderr: E,
) -> Result<i32, CliError> {
    let defaults = FileDefaults::discover(args.defaults.as_deref())?;
    if let Some(path) = defaults.path() {
        tracing::info!(path = %path.display(), "Using global defaults");
    }
    let credentials = discover_credential_store(args.credentials.as_deref())?;

    let executor = StepExecutor::new(
        Arc::new(defaults),
        Arc::new(credentials),
        Arc::new(VaultConnector::new()),
    );
    let env = process_env();
    let path = expand(&args.path, &env);
    let key = expand(&args.key, &env);
    let ctx = StepContext::builder()
        .env(env)
        .scope(JobScope::new(args.job.clone(), args.run_id.clone()))
        .sink(Arc::new(StderrSink))
        .build()?;

    let outcome = executor.run(&args.step_config(), &ctx).await;

    let mut completion = CliCompletion::new(
        stdout,
        stderr,
        args.output_format,
        args.require_value,
        path,
        key,
    );
    outcome.complete(&mut completion);
    Ok(completion.exit_code())
}
