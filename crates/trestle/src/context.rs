//! Runtime context for command execution.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext<'a> {
    /// Tightening configuration path, when given.
    pub config_path: Option<PathBuf>,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,

    /// Cancellation flag set by the Ctrl+C handler.
    pub cancel: &'a AtomicBool,
}

impl<'a> RuntimeContext<'a> {
    /// Builds a `RuntimeContext` from parsed global arguments.
    pub fn from_global_args(global: &GlobalArgs, cancel: &'a AtomicBool) -> Self {
        Self {
            config_path: global.config.clone(),
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
            cancel,
        }
    }
}
