use std::fs::File;
use std::io::{self, IsTerminal, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};

use tracing::{debug, warn};

use super::keys::{self, Key};
use super::line::LineBuffer;
use super::render::{self, Refresh, Rows, View};
use super::terminal::{self, RawMode};
use super::{EditSession, EditorSettings, Feed};
use crate::completion;
use crate::error::Result;
use crate::history::History;

/// Tab completion in progress: the candidates and the one on display.
///
/// `index == candidates.len()` shows the text as the user typed it.
struct Completion {
    candidates: Vec<String>,
    index: usize,
}

/// Line edit session on a terminal, fed one key at a time.
///
/// Created by [`TerminalSession::start`] for the process's own terminal, or by
/// [`TerminalSession::new`] for any descriptor pair. Dropping the session
/// restores the terminal and moves to a fresh line.
pub struct TerminalSession<R: Read + AsFd, W: Write> {
    input: R,
    output: W,
    prompt: String,
    line: LineBuffer,
    settings: EditorSettings,
    columns: usize,
    /// History snapshot, oldest first, with the line being edited at the end.
    history: Vec<String>,
    /// Distance from the newest entry while browsing history.
    history_index: usize,
    completion: Option<Completion>,
    rows: Rows,
    raw: Option<RawMode>,
}

impl TerminalSession<File, io::Stdout> {
    /// Start editing on standard input and output.
    ///
    /// Raw mode is enabled when standard input is a terminal; otherwise bytes
    /// are fed as they arrive.
    pub fn start(
        prompt: &str,
        history: &History,
        settings: EditorSettings,
        capacity: usize,
    ) -> Result<Self> {
        let stdin = io::stdin();
        let input = File::from(stdin.as_fd().try_clone_to_owned()?);
        let stdout = io::stdout();
        let (raw, columns) = if stdin.is_terminal() {
            (
                Some(RawMode::enable(stdin.as_fd())?),
                terminal::columns(&stdout),
            )
        } else {
            (None, terminal::DEFAULT_COLUMNS)
        };
        let mut session = Self::new(input, stdout, prompt, history, settings, capacity, columns);
        session.raw = raw;
        session.refresh(Refresh::FULL)?;
        Ok(session)
    }
}

impl<R: Read + AsFd, W: Write> TerminalSession<R, W> {
    /// Session over arbitrary descriptors; nothing is drawn until the first key
    /// or an explicit [`EditSession::show`].
    pub fn new(
        input: R,
        output: W,
        prompt: &str,
        history: &History,
        settings: EditorSettings,
        capacity: usize,
        columns: usize,
    ) -> Self {
        let mut snapshot: Vec<String> = history.iter().map(str::to_string).collect();
        snapshot.push(String::new());
        Self {
            input,
            output,
            prompt: prompt.to_string(),
            line: LineBuffer::new(capacity),
            settings,
            columns,
            history: snapshot,
            history_index: 0,
            completion: None,
            rows: Rows::default(),
            raw: None,
        }
    }

    /// Text typed so far.
    pub fn buffer(&self) -> String {
        self.line.to_string()
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    fn refresh(&mut self, refresh: Refresh) -> Result<()> {
        self.draw(refresh, true)
    }

    fn draw(&mut self, refresh: Refresh, with_hint: bool) -> Result<()> {
        let shown: Vec<char>;
        let (text, pos) = match &self.completion {
            Some(c) if c.index < c.candidates.len() => {
                shown = c.candidates[c.index].chars().collect();
                (&shown[..], shown.len())
            }
            _ => (self.line.chars(), self.line.pos()),
        };
        let hint = if with_hint {
            completion::hint(&text.iter().collect::<String>())
        } else {
            None
        };
        let view = View {
            prompt: &self.prompt,
            text,
            pos,
            mask: self.settings.mask,
            hint,
            columns: self.columns,
        };
        let frame = if self.settings.multiline {
            render::multi_line(&view, refresh, &mut self.rows)
        } else {
            render::single_line(&view, refresh)
        };
        self.output.write_all(frame.as_bytes())?;
        self.output.flush()?;
        Ok(())
    }

    fn beep(&mut self) -> Result<()> {
        self.output.write_all(b"\x07")?;
        self.output.flush()?;
        Ok(())
    }

    /// Step through history; `older` moves towards the oldest entry.
    fn browse_history(&mut self, older: bool) -> Result<()> {
        let len = self.history.len();
        if len <= 1 {
            return Ok(());
        }
        self.history[len - 1 - self.history_index] = self.line.to_string();
        let next = if older {
            self.history_index + 1
        } else {
            match self.history_index.checked_sub(1) {
                Some(i) => i,
                None => return Ok(()),
            }
        };
        if next >= len {
            return Ok(());
        }
        self.history_index = next;
        self.line.set(&self.history[len - 1 - next]);
        self.refresh(Refresh::FULL)
    }

    /// Handle a key while completion is active. Returns the key when it still
    /// has to be processed as a normal edit.
    fn complete_with(&mut self, key: Key) -> Result<Option<Key>> {
        if self.completion.is_none() {
            let candidates = completion::complete(&self.line.to_string());
            if candidates.is_empty() {
                self.beep()?;
                return Ok(None);
            }
            self.completion = Some(Completion {
                candidates,
                index: 0,
            });
            self.refresh(Refresh::FULL)?;
            return Ok(None);
        }

        let Some(mut state) = self.completion.take() else {
            return Ok(Some(key));
        };
        match key {
            Key::Tab => {
                state.index = (state.index + 1) % (state.candidates.len() + 1);
                let wrapped = state.index == state.candidates.len();
                self.completion = Some(state);
                if wrapped {
                    self.beep()?;
                }
                self.refresh(Refresh::FULL)?;
                Ok(None)
            }
            Key::Escape => {
                self.refresh(Refresh::FULL)?;
                Ok(None)
            }
            other => {
                if let Some(choice) = state.candidates.get(state.index) {
                    self.line.set(choice);
                }
                Ok(Some(other))
            }
        }
    }

    fn apply(&mut self, key: Key) -> Result<Feed> {
        let key = if key == Key::Tab || self.completion.is_some() {
            match self.complete_with(key)? {
                Some(key) => key,
                None => return Ok(Feed::More),
            }
        } else {
            key
        };

        let changed = match key {
            Key::Enter => {
                if self.settings.multiline {
                    self.line.move_end();
                }
                // Final frame without the hint so it does not linger on screen.
                self.draw(Refresh::FULL, false)?;
                return Ok(Feed::Line(self.line.to_string()));
            }
            Key::CtrlC => return Ok(Feed::Cancelled),
            Key::CtrlD if self.line.is_empty() => return Ok(Feed::Cancelled),
            Key::CtrlD | Key::Delete => self.line.delete(),
            Key::Backspace => self.line.backspace(),
            Key::Char(c) => self.line.insert(c),
            Key::Left | Key::CtrlB => self.line.move_left(),
            Key::Right | Key::CtrlF => self.line.move_right(),
            Key::Home | Key::CtrlA => self.line.move_home(),
            Key::End | Key::CtrlE => self.line.move_end(),
            Key::CtrlU => {
                self.line.kill_line();
                true
            }
            Key::CtrlK => {
                self.line.kill_to_end();
                true
            }
            Key::CtrlW => {
                self.line.delete_prev_word();
                true
            }
            Key::CtrlT => self.line.transpose(),
            Key::CtrlL => {
                self.output.write_all(b"\x1b[H\x1b[2J")?;
                true
            }
            Key::Up | Key::CtrlP => {
                self.browse_history(true)?;
                false
            }
            Key::Down | Key::CtrlN => {
                self.browse_history(false)?;
                false
            }
            Key::Tab | Key::Escape | Key::Unknown => false,
        };
        if changed {
            self.refresh(Refresh::FULL)?;
        }
        Ok(Feed::More)
    }
}

impl<R: Read + AsFd, W: Write> AsFd for TerminalSession<R, W> {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.input.as_fd()
    }
}

impl<R: Read + AsFd, W: Write> EditSession for TerminalSession<R, W> {
    fn feed(&mut self) -> Result<Feed> {
        match keys::read_key(&mut self.input)? {
            Some(key) => self.apply(key),
            None => {
                debug!("input closed while editing");
                Ok(Feed::Cancelled)
            }
        }
    }

    fn hide(&mut self) -> Result<()> {
        self.refresh(Refresh::CLEAN)
    }

    fn show(&mut self) -> Result<()> {
        self.refresh(Refresh::WRITE)
    }
}

impl<R: Read + AsFd, W: Write> Drop for TerminalSession<R, W> {
    fn drop(&mut self) {
        drop(self.raw.take());
        if let Err(e) = self
            .output
            .write_all(b"\n")
            .and_then(|()| self.output.flush())
        {
            warn!(error = %e, "cannot finish edited line");
        }
    }
}
