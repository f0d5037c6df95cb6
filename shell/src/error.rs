//! Error types shared by the input loop, the editor and the dispatcher.

use std::path::PathBuf;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ShellError>;

/// Everything that can go wrong while reading or running a line.
///
/// Only [`ShellError::is_fatal`] errors stop the shell; the rest are reported
/// and the loop carries on with the next prompt.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// The readiness wait of the asynchronous loop failed.
    #[error("select(): {0}")]
    Multiplex(#[source] nix::Error),

    /// Raw mode could not be enabled or restored.
    #[error("terminal setup failed: {0}")]
    Terminal(#[source] nix::Error),

    /// Reading from or writing to the terminal failed.
    #[error("terminal i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The synchronous line editor reported an error other than Ctrl-C/Ctrl-D.
    #[error("line editor: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    /// Could not create a child process at all.
    #[error("failed to fork: {0}")]
    Spawn(#[source] std::io::Error),

    /// The child could not start the requested program.
    #[error("|| Failed to execute '{program}': {reason} ||")]
    Exec { program: String, reason: std::io::Error },

    /// Waiting for a spawned child failed.
    #[error("failed to wait for '{program}': {reason}")]
    Wait { program: String, reason: std::io::Error },

    /// Line produced more arguments than an invocation accepts.
    #[error("too many arguments: {count} given, at most {max} allowed")]
    TooManyArguments { count: usize, max: usize },

    /// Program name does not fit in the executable path.
    #[error("program name too long: '{program}' (path limit is {max} bytes)")]
    ProgramNameTooLong { program: String, max: usize },

    /// History could not be written back to disk.
    #[error("cannot save history to {}: {reason}", path.display())]
    HistorySave { path: PathBuf, reason: std::io::Error },

    /// History could not be read at startup.
    #[error("cannot load history from {}: {reason}", path.display())]
    HistoryLoad { path: PathBuf, reason: std::io::Error },
}

impl ShellError {
    /// Whether this error must end the whole process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShellError::Multiplex(_) | ShellError::Terminal(_) | ShellError::Readline(_)
        )
    }
}
