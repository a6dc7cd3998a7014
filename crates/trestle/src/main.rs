//! `trestle` -- platform model to SQL Server DDL compiler.
//!
//! Parses CLI arguments with clap, resolves the runtime context, and
//! dispatches to command handlers. The first Ctrl+C requests a clean
//! cancellation (the write plan stops before its next file); the second
//! force-exits.

mod cli;
mod commands;
mod context;
mod output;

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use cli::{Cli, Commands};
use context::RuntimeContext;

/// Set by the signal handler; checked by the write plan before each file.
static CANCEL_REQUESTED: AtomicBool = AtomicBool::new(false);

fn main() {
    let _ = ctrlc::set_handler(|| {
        if CANCEL_REQUESTED.swap(true, Ordering::SeqCst) {
            // Second signal: force exit
            std::process::exit(1);
        }
    });

    let cli = Cli::parse();
    let ctx = RuntimeContext::from_global_args(&cli.global, &CANCEL_REQUESTED);

    if ctx.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("trestle=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Emit(args) => commands::emit::run(&ctx, &args),
        Commands::Seed(args) => commands::seed::run(&ctx, &args),
        Commands::Preflight(args) => commands::preflight::run(&ctx, &args),
    };

    match result {
        Ok(()) => {}
        Err(failure) => {
            output::report_failure(&failure);
            std::process::exit(1);
        }
    }
}
