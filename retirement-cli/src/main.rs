//! Retirement CLI - validate plan inputs and run the retirement calculator.
//!
//! Commands:
//! - `retirement fields`: List the form's fields and their constraints
//! - `retirement check`: Validate plan inputs and show each field's verdict
//! - `retirement calculate`: Validate, submit to the calculator and show the plan
//!
//! Environment variables:
//! - RETIREMENT_BASE_URL: Override the calculator base URL
//! - RETIREMENT_CALCULATE_PATH: Override the calculate endpoint path
//! - RUST_LOG: Log filter when `--debug` is not given
//!
//! Exit codes:
//! - 0: Success
//! - 1: Invalid plan, failed calculation or other error

mod cli;
mod commands;
mod table;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

/// Map a command result to an exit code.
fn handle_result(result: anyhow::Result<bool>) -> i32 {
    match result {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("retirement=debug,retirement_form=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Commands::Fields { json } => handle_result(commands::run_fields(json).map(|()| true)),
        Commands::Check { plan } => handle_result(commands::run_check(&plan)),
        Commands::Calculate { plan, url } => handle_result(
            commands::run_calculate(&plan, cli.config.as_deref(), url.as_deref()).await,
        ),
    };

    std::process::exit(exit_code);
}
