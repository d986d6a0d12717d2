mod audio;
mod cli;
mod command;
mod config;
mod engine;
mod error;
mod fingerprint;
mod recognize;
#[cfg(test)]
mod test_utils;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use command::Command;
use config::{Config, DEFAULT_CONFIG_FILE};
use engine::{Engine, LocalEngine};
use error::AppError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = cli::Args::parse();
    init_logging(&args);

    if let Err(err) = run(&args) {
        match err.downcast_ref::<AppError>() {
            Some(app_err) => eprintln!("Error: {}", app_err),
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(exit_code(&err));
    }
}

/// Exit status for a failed invocation.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<AppError>()
        .map(AppError::exit_code)
        .unwrap_or(1)
}

fn init_logging(args: &cli::Args) {
    let default_level = if args.verbose {
        "audiomark=debug"
    } else if args.quiet {
        "audiomark=warn"
    } else {
        "audiomark=info"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &cli::Args) -> Result<()> {
    execute(args, |config| LocalEngine::new(config).map_err(AppError::from))
}

/// Validate, then load config and build the engine once, then dispatch.
fn execute<E, F>(args: &cli::Args, make_engine: F) -> Result<()>
where
    E: Engine,
    F: FnOnce(Config) -> error::Result<E>,
{
    // Validate before touching config or storage
    let command = Command::from_args(args)?;

    if matches!(command, Command::None) {
        cli::Args::command()
            .print_help()
            .context("Failed to print help")?;
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = Config::load(&config_path)?;
    tracing::debug!(?config, "Configuration loaded");

    let workers = config.workers;
    let engine = make_engine(config)?;

    match command {
        Command::Fingerprint(fingerprint_args) => {
            fingerprint::run(&engine, &fingerprint_args, workers, args.quiet)?;
        }
        Command::Recognize(recognize_args) => {
            let report = recognize::run(&engine, &recognize_args, args.json)?;
            println!("{}", report);
        }
        Command::None => {}
    }

    Ok(())
}
