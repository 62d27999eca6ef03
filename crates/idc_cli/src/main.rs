//! idcgen CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid configuration or arguments
//! - 3: Authentication failure
//! - 4: Template or render error
//! - 5: AWS API error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;

use commands::{Cli, Commands};
use config::{ConfigError, Verbosity};
use idc_fetch::FetchError;
use idc_iac::IacError;
use idc_model::{ModelError, ResolveError};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_CONFIG: u8 = 2;
    pub const AUTH_FAILURE: u8 = 3;
    pub const RENDER_ERROR: u8 = 4;
    pub const FETCH_ERROR: u8 = 5;
}

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive()));

    // Already initialized is fine.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            init_tracing(Verbosity::default());
            eprintln!("❌ Error: {}", e);
            return ExitCode::from(ExitCodes::INVALID_CONFIG);
        }
    };
    init_tracing(settings.verbosity);

    let result = match cli.command {
        None => commands::run::execute(&settings).await,
        Some(Commands::Fetch) => commands::fetch::execute(&settings).await.map(|_| ()),
        Some(Commands::Generate) => commands::generate::execute(&settings, None).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

/// Map the first recognised cause to an exit code.
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return ExitCodes::INVALID_CONFIG;
        }
        if let Some(err) = cause.downcast_ref::<FetchError>() {
            return if err.is_auth() {
                ExitCodes::AUTH_FAILURE
            } else {
                ExitCodes::FETCH_ERROR
            };
        }
        if let Some(err) = cause.downcast_ref::<IacError>() {
            return match err {
                IacError::InvalidConfiguration(_) => ExitCodes::INVALID_CONFIG,
                err if err.is_render_error() => ExitCodes::RENDER_ERROR,
                _ => ExitCodes::GENERAL_ERROR,
            };
        }
        if cause.downcast_ref::<ResolveError>().is_some() {
            return ExitCodes::RENDER_ERROR;
        }
        if let Some(ModelError::Invariant(_)) = cause.downcast_ref::<ModelError>() {
            return ExitCodes::RENDER_ERROR;
        }
    }
    ExitCodes::GENERAL_ERROR
}
