//! vaultstep CLI Application
//!
//! Reads a single key of a single Vault secret for the job that invokes it.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io;
use vaultstep::cli::{self, Cli, Commands, exit_code_for, render_error};
use vaultstep::logging::init_tracing;
use vaultstep::read;

/// Exit code for failures before any command ran
const EXIT_STARTUP: i32 = 1;

fn main() {
    // NOTE: Using eprintln! in panic hook is intentional - tracing infrastructure
    // may be corrupted during a panic, so we use the most reliable output method.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    if let Err(e) = init_tracing(cli.level, cli.log_format) {
        eprintln!("Warning: {e}");
    }

    let exit_code = run_with_tokio(cli);
    std::process::exit(exit_code);
}

/// Create tokio runtime and run async path
fn run_with_tokio(cli: Cli) -> i32 {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            return EXIT_STARTUP;
        }
    };

    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> i32 {
    match cli.command {
        Commands::Read(args) => {
            match read::execute(&args, io::stdout(), io::stderr()).await {
                Ok(code) => code,
                Err(err) => {
                    render_error(&err, args.output_format);
                    exit_code_for(&err)
                }
            }
        }
    }
}
