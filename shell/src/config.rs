//! Command line flags and the runtime configuration derived from them.

use argh::{EarlyExit, FromArgs};
use std::path::PathBuf;
use std::time::Duration;

/// Prompt shown by both input paths.
pub const PROMPT: &str = "CCNShell >> ";

/// History file, relative to the working directory.
pub const HISTORY_FILE: &str = "history.txt";

/// Environment variable overriding [`HISTORY_FILE`].
pub const HISTORY_ENV: &str = "CCNSHELL_HISTORY";

/// Directory every external program is resolved in.
pub const PROGRAM_DIR: &str = "/usr/bin/";

#[derive(FromArgs, Debug, Default, PartialEq, Eq)]
/// Interactive command shell with a synchronous or multiplexed line editor.
pub struct Args {
    #[argh(switch)]
    /// edit lines across several terminal rows instead of scrolling horizontally.
    pub multiline: bool,

    #[argh(switch)]
    /// print the raw codes of pressed keys and exit.
    pub keycodes: bool,

    #[argh(switch, long = "async")]
    /// read lines with the multiplexed loop that interleaves timer output.
    pub async_mode: bool,
}

/// Ways argument parsing can end the process before the shell starts.
#[derive(Debug, PartialEq, Eq)]
pub enum CliExit {
    /// `--help` and friends: print to stdout, exit 0.
    Help(String),
    /// Unknown or malformed flag: print to stderr, exit 1.
    Usage(String),
}

impl CliExit {
    pub fn status(&self) -> i32 {
        match self {
            CliExit::Help(_) => 0,
            CliExit::Usage(_) => 1,
        }
    }
}

/// One-line usage text reported for bad flags.
pub fn usage(program: &str) -> String {
    format!("Usage: {program} [--multiline] [--keycodes] [--async]")
}

/// Parse flags given after the program name.
pub fn parse_args(program: &str, args: &[&str]) -> Result<Args, CliExit> {
    match Args::from_args(&[program], args) {
        Ok(parsed) => Ok(parsed),
        Err(EarlyExit { output, status: Ok(()) }) => Err(CliExit::Help(output)),
        Err(EarlyExit { status: Err(()), .. }) => Err(CliExit::Usage(usage(program))),
    }
}

/// Which input acquisition path the shell runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Sync,
    Async,
}

/// Runtime settings of the shell.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub prompt: String,
    pub history_path: PathBuf,
    /// Prefix joined with the first token of a line.
    pub program_dir: String,
    /// Longest executable path accepted, in bytes.
    pub max_program_path: usize,
    /// Most tokens a command line may have, program name included.
    pub max_args: usize,
    /// Capacity of the async editor buffer, in bytes.
    pub line_capacity: usize,
    /// Retained history entries until `/historylen` changes it.
    pub history_len: usize,
    /// Period of the simulated async output.
    pub tick_interval: Duration,
    pub mode: InputMode,
    pub multiline: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: PROMPT.to_string(),
            history_path: PathBuf::from(HISTORY_FILE),
            program_dir: PROGRAM_DIR.to_string(),
            max_program_path: 127,
            max_args: 32,
            line_capacity: 1023,
            history_len: 100,
            tick_interval: Duration::from_secs(1),
            mode: InputMode::Sync,
            multiline: false,
        }
    }
}

impl ShellConfig {
    /// Build the configuration from parsed flags and the process environment.
    pub fn from_args(args: &Args) -> Self {
        let mut config = Self {
            mode: if args.async_mode {
                InputMode::Async
            } else {
                InputMode::Sync
            },
            multiline: args.multiline,
            ..Self::default()
        };
        if let Some(path) = std::env::var_os(HISTORY_ENV).filter(|p| !p.is_empty()) {
            config.history_path = PathBuf::from(path);
        }
        config
    }
}
