//! Input acquisition: one line per loop iteration, from one of two sources.
//!
//! [`sync::SyncInput`] blocks in `rustyline` until a line is entered.
//! [`async_loop::AsyncInput`] drives an edit session from a readiness loop
//! and prints a notice every time the wait times out.

use crate::editor::EditorSettings;
use crate::error::Result;
use crate::history::History;

pub mod async_loop;
pub mod sync;

pub use async_loop::{
    AsyncInput, AsyncLoop, EditState, Multiplexer, PollMultiplexer, SessionFactory,
    TerminalFactory, Wakeup,
};
pub use sync::{ShellHelper, SyncInput};

/// What a line source produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquired {
    /// A finished line, ready for dispatch.
    Line(String),
    /// The user ended input; leave the read loop and exit normally.
    EndOfInput,
    /// The user cancelled an asynchronous edit; the whole process stops.
    Terminate,
}

/// Shell state an editor needs while a line is being read.
#[derive(Debug, Clone, Copy)]
pub struct EditContext<'a> {
    pub history: &'a History,
    pub settings: EditorSettings,
}

/// Anything that can produce lines for the dispatcher.
pub trait LineSource {
    fn read_line(&mut self, ctx: &EditContext<'_>) -> Result<Acquired>;
}
