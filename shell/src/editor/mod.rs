//! Incremental line editor used by the asynchronous input loop.
//!
//! An [`EditSession`] is fed one key at a time by its owner, which decides
//! when to block. That lets a single thread interleave editing with other
//! output: hide the line, print, show the line again.

use std::os::fd::AsFd;

use crate::error::Result;

pub mod keycodes;
mod keys;
mod line;
mod render;
mod session;
mod terminal;

pub use keys::Key;
pub use line::LineBuffer;
pub use session::TerminalSession;
pub use terminal::{RawMode, columns};

/// Display options shared by both line editors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditorSettings {
    /// Render every typed character as `*`.
    pub mask: bool,
    /// Wrap long lines across rows instead of scrolling.
    pub multiline: bool,
}

/// Result of feeding one unit of input to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// The key was consumed; the line is not finished yet.
    More,
    /// Enter was pressed.
    Line(String),
    /// Ctrl-C, Ctrl-D on an empty line, or end of input.
    Cancelled,
}

/// One in-progress line edit.
///
/// The descriptor returned through [`AsFd`] is the one the owner waits on
/// before calling [`EditSession::feed`]. Dropping the session tears it down.
pub trait EditSession: AsFd {
    /// Consume exactly one key from the input descriptor.
    fn feed(&mut self) -> Result<Feed>;

    /// Erase the prompt and the edited text from the screen.
    fn hide(&mut self) -> Result<()>;

    /// Draw the prompt and the edited text again, cursor included.
    fn show(&mut self) -> Result<()>;
}
