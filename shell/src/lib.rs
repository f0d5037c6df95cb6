//! An interactive command shell with two ways of reading input.
//!
//! Lines come either from a blocking `rustyline` editor or from a readiness
//! loop that keeps an edit session open while printing periodic output around
//! it. Lines starting with `/` are shell directives (`/historylen<N>`, `/mask`,
//! `/unmask`); anything else runs as a program from `/usr/bin/` with an empty
//! environment.
//!
//! The main entry point is [`Interpreter`], which owns the history and editor
//! settings and dispatches lines produced by an [`input::LineSource`].

pub mod builtin;
pub mod command;
pub mod completion;
pub mod config;
pub mod editor;
pub mod error;
pub mod external;
pub mod history;
pub mod input;
pub mod interpreter;

/// Just a convenient re-export of the read-dispatch loop.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;

pub use error::{Result, ShellError};
