use crate::error::{Result, ShellError};
use std::path::{Path, PathBuf};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Children killed by a signal are reported as `128 + signal`, the way POSIX
/// shells do.
pub type ExitCode = i32;

/// Status reported for a program that could not be executed.
pub const EXEC_FAILURE: ExitCode = 127;

/// Split a line on the space character.
///
/// Runs of spaces and leading or trailing spaces never produce empty tokens.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split(' ').filter(|token| !token.is_empty()).collect()
}

/// A fully resolved external command: what to run and with which argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable path, the program directory joined with the first token.
    pub path: PathBuf,
    /// Argument vector; `args[0]` is the program name as typed.
    pub args: Vec<String>,
}

impl Invocation {
    /// Build an invocation from a command line.
    ///
    /// Returns `Ok(None)` when the line holds no tokens at all.
    pub fn from_line(
        line: &str,
        program_dir: &str,
        max_args: usize,
        max_path: usize,
    ) -> Result<Option<Self>> {
        let tokens = tokenize(line);
        let Some(program) = tokens.first() else {
            return Ok(None);
        };
        if tokens.len() > max_args {
            return Err(ShellError::TooManyArguments {
                count: tokens.len(),
                max: max_args,
            });
        }
        let path = format!("{program_dir}{program}");
        if path.len() > max_path {
            return Err(ShellError::ProgramNameTooLong {
                program: program.to_string(),
                max: max_path,
            });
        }
        Ok(Some(Self {
            path: PathBuf::from(path),
            args: tokens.iter().map(|t| t.to_string()).collect(),
        }))
    }

    /// Program name as the user typed it.
    pub fn program(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Capability to run an invocation to completion.
///
/// The shell blocks inside [`Spawner::spawn_and_wait`] for the whole lifetime of
/// the child. Implementations report an [`ShellError::Exec`] when the program
/// cannot be started and [`ShellError::Spawn`] when no process could be created.
pub trait Spawner {
    fn spawn_and_wait(&mut self, invocation: &Invocation) -> Result<ExitCode>;
}

impl<T: Spawner + ?Sized> Spawner for Box<T> {
    fn spawn_and_wait(&mut self, invocation: &Invocation) -> Result<ExitCode> {
        (**self).spawn_and_wait(invocation)
    }
}
