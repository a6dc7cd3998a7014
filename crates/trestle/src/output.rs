//! Output helpers for the `trestle` CLI.

use trestle_core::error::EngineError;

/// A command failure: structured engine errors or a contextual I/O error.
#[derive(Debug)]
pub enum CommandFailure {
    Engine(Vec<EngineError>),
    Other(anyhow::Error),
}

impl From<Vec<EngineError>> for CommandFailure {
    fn from(errors: Vec<EngineError>) -> Self {
        Self::Engine(errors)
    }
}

impl From<EngineError> for CommandFailure {
    fn from(error: EngineError) -> Self {
        Self::Engine(vec![error])
    }
}

impl From<anyhow::Error> for CommandFailure {
    fn from(error: anyhow::Error) -> Self {
        Self::Other(error)
    }
}

/// Result alias for command handlers.
pub type CommandResult = Result<(), CommandFailure>;

/// Prints one line per error, `<code>: <message>`, to stderr.
pub fn report_failure(failure: &CommandFailure) {
    match failure {
        CommandFailure::Engine(errors) => {
            for error in errors {
                eprintln!("{}: {}", error.code(), error);
            }
        }
        CommandFailure::Other(error) => {
            eprintln!("error: {error:#}");
        }
    }
}

/// Reads a file with path context.
pub fn read_file(path: &std::path::Path) -> Result<String, CommandFailure> {
    std::fs::read_to_string(path).map_err(|e| {
        CommandFailure::Other(anyhow::anyhow!("failed to read {}: {e}", path.display()))
    })
}
