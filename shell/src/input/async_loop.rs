use std::fs::File;
use std::io::{self, Write};
use std::os::fd::BorrowedFd;
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use tracing::{debug, trace};

use super::{Acquired, EditContext, LineSource};
use crate::config::ShellConfig;
use crate::editor::{EditSession, Feed, TerminalSession};
use crate::error::{Result, ShellError};

/// Why a readiness wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// The descriptor has input.
    Ready,
    /// The interval passed without input.
    Timeout,
    /// A signal interrupted the wait; nothing happened.
    Interrupted,
}

/// Readiness wait on a single descriptor.
pub trait Multiplexer {
    fn wait(&mut self, fd: BorrowedFd<'_>, timeout: Duration) -> Result<Wakeup>;
}

/// [`Multiplexer`] backed by `poll(2)`.
#[derive(Debug, Default)]
pub struct PollMultiplexer;

impl Multiplexer for PollMultiplexer {
    fn wait(&mut self, fd: BorrowedFd<'_>, timeout: Duration) -> Result<Wakeup> {
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        match poll(&mut fds, PollTimeout::from(millis)) {
            Ok(0) => Ok(Wakeup::Timeout),
            Ok(_) => Ok(Wakeup::Ready),
            Err(Errno::EINTR) => Ok(Wakeup::Interrupted),
            Err(e) => Err(ShellError::Multiplex(e)),
        }
    }
}

/// States of the asynchronous edit loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    /// Waiting for the next key or the next tick.
    Editing,
    /// A key was consumed but the line is not finished.
    MoreInputNeeded,
    /// Enter was pressed.
    LineReady(String),
    /// The user aborted the edit.
    Cancelled,
    /// A cancelled edit was torn down; no further sessions start.
    Terminated,
}

/// Single-threaded loop that feeds an edit session and prints a numbered
/// notice whenever the wait times out.
///
/// The notice counter lives here and survives from one session to the next.
pub struct AsyncLoop<M: Multiplexer> {
    mux: M,
    interval: Duration,
    counter: u64,
    state: EditState,
}

impl<M: Multiplexer> AsyncLoop<M> {
    pub fn new(mux: M, interval: Duration) -> Self {
        Self {
            mux,
            interval,
            counter: 0,
            state: EditState::Editing,
        }
    }

    /// Label of the next notice.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == EditState::Terminated
    }

    /// Wait once, then either feed one key or print one notice.
    pub fn tick<S: EditSession>(
        &mut self,
        session: &mut S,
        out: &mut impl Write,
    ) -> Result<EditState> {
        let next = match self.mux.wait(session.as_fd(), self.interval)? {
            Wakeup::Ready => match session.feed()? {
                Feed::More => EditState::MoreInputNeeded,
                Feed::Line(line) => EditState::LineReady(line),
                Feed::Cancelled => EditState::Cancelled,
            },
            Wakeup::Timeout => {
                notify(session, out, &mut self.counter)?;
                EditState::Editing
            }
            Wakeup::Interrupted => {
                trace!("wait interrupted");
                EditState::Editing
            }
        };
        self.state = next.clone();
        Ok(next)
    }

    /// Drive `session` until it yields a line or is cancelled.
    ///
    /// The session is consumed and dropped exactly once, on every exit path,
    /// errors included. After a cancellation the loop is
    /// [`EditState::Terminated`] and refuses to run again.
    pub fn run<S: EditSession>(
        &mut self,
        mut session: S,
        out: &mut impl Write,
    ) -> Result<EditState> {
        if self.is_terminated() {
            return Ok(EditState::Terminated);
        }
        self.state = EditState::Editing;
        let finished = loop {
            match self.tick(&mut session, out)? {
                EditState::Editing | EditState::MoreInputNeeded => continue,
                done => break done,
            }
        };
        drop(session);
        if finished == EditState::Cancelled {
            debug!("edit cancelled");
            self.state = EditState::Terminated;
        }
        Ok(finished)
    }
}

/// Hide the edited line, print the notice, bump the counter, draw the line again.
fn notify(session: &mut impl EditSession, out: &mut impl Write, counter: &mut u64) -> Result<()> {
    session.hide()?;
    let notice = format!("Async output {counter}.\n");
    out.write_all(notice.as_bytes())?;
    out.flush()?;
    *counter += 1;
    session.show()
}

/// Opens the edit session for the next line.
pub trait SessionFactory {
    type Session: EditSession;

    fn open(
        &mut self,
        prompt: &str,
        ctx: &EditContext<'_>,
        capacity: usize,
    ) -> Result<Self::Session>;
}

/// Edits on the process's own terminal.
#[derive(Debug, Default)]
pub struct TerminalFactory;

impl SessionFactory for TerminalFactory {
    type Session = TerminalSession<File, io::Stdout>;

    fn open(
        &mut self,
        prompt: &str,
        ctx: &EditContext<'_>,
        capacity: usize,
    ) -> Result<Self::Session> {
        TerminalSession::start(prompt, ctx.history, ctx.settings, capacity)
    }
}

/// [`LineSource`] that edits through an [`AsyncLoop`], one session per line.
pub struct AsyncInput<M: Multiplexer = PollMultiplexer, F: SessionFactory = TerminalFactory> {
    event_loop: AsyncLoop<M>,
    sessions: F,
    prompt: String,
    capacity: usize,
}

impl AsyncInput {
    pub fn new(config: &ShellConfig) -> Self {
        Self::with_parts(PollMultiplexer, TerminalFactory, config)
    }
}

impl<M: Multiplexer, F: SessionFactory> AsyncInput<M, F> {
    pub fn with_parts(mux: M, sessions: F, config: &ShellConfig) -> Self {
        Self {
            event_loop: AsyncLoop::new(mux, config.tick_interval),
            sessions,
            prompt: config.prompt.clone(),
            capacity: config.line_capacity,
        }
    }
}

impl<M: Multiplexer, F: SessionFactory> LineSource for AsyncInput<M, F> {
    fn read_line(&mut self, ctx: &EditContext<'_>) -> Result<Acquired> {
        if self.event_loop.is_terminated() {
            return Ok(Acquired::Terminate);
        }
        let session = self.sessions.open(&self.prompt, ctx, self.capacity)?;
        match self.event_loop.run(session, &mut io::stdout())? {
            EditState::LineReady(line) => Ok(Acquired::Line(line)),
            _ => Ok(Acquired::Terminate),
        }
    }
}
