//! Cataloguer - organize photos and videos into deduplicated catalogues
//!
//! Scans directories, fingerprints files with BLAKE3, detects byte-identical
//! duplicates, and copies or moves media into a date-structured layout
//! derived from a naming template, never overwriting an existing file.
//!
//! The core lives in [`catalogue`] (the reactive index), [`duplicates`]
//! (the detection funnel), [`naming`] (templates and destination
//! resolution) and [`actions`] (planning and executing batches).

pub mod actions;
pub mod catalogue;
pub mod cli;
pub mod commands;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod media;
pub mod naming;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::actions::Operation;
use crate::cli::{Cli, Commands};
use crate::commands::Context;
use crate::config::Config;
use crate::error::ExitCode;
use crate::progress::Progress;

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for invalid configuration or arguments, and for
/// failures that stop a command before it processes any file.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref(), &cli.overrides())
        .context("Failed to load configuration")?;
    log::debug!("Configuration: {:?}", config);

    let shutdown = signal::install_handler()?;
    let mut ctx = Context::new(config, shutdown)
        .with_progress(Arc::new(Progress::new(cli.quiet)))
        .with_assume_yes(cli.yes)
        .with_rescan(cli.rescan);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Commands::Inspect(args) => commands::inspect(&mut ctx, args, &mut out),
        Commands::CreateCatalogue(args) => commands::create_catalogue(&mut ctx, args, &mut out),
        Commands::DeleteCatalogue(args) => commands::delete_catalogue(&mut ctx, args, &mut out),
        Commands::Copy(args) => commands::transfer(&mut ctx, Operation::Copy, args, &mut out),
        Commands::Move(args) => commands::transfer(&mut ctx, Operation::Move, args, &mut out),
        Commands::DeleteDuplicates(args) => commands::delete_duplicates(&mut ctx, args, &mut out),
    }
}
