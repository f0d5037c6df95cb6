use std::borrow::Cow::{self, Borrowed, Owned};
use std::cell::RefCell;

use rustyline::completion::Completer;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::history::{DefaultHistory, History as _};
use rustyline::validate::Validator;
use rustyline::{ColorMode, CompletionType, Config, Context, Editor, Helper};
use tracing::debug;

use super::{Acquired, EditContext, LineSource};
use crate::completion::{self, Hint};
use crate::error::Result;

/// `rustyline` helper: completion, hints and password-style masking.
#[derive(Default)]
pub struct ShellHelper {
    pub masking: bool,
    /// Style of the hint on display; `highlight_hint` only gets its text.
    last_hint: RefCell<Option<Hint>>,
}

impl Completer for ShellHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok((0, completion::complete(line)))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let hint = (pos == line.len()).then(|| completion::hint(line)).flatten();
        let text = hint.as_ref().map(|h| h.text.to_string());
        *self.last_hint.borrow_mut() = hint;
        text
    }
}

impl Highlighter for ShellHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if self.masking {
            Owned("*".repeat(line.chars().count()))
        } else {
            Borrowed(line)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        match self.last_hint.borrow().as_ref() {
            Some(style) => Owned(style.styled(hint)),
            None => Borrowed(hint),
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        self.masking
    }
}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

/// Blocking line reader built on `rustyline`.
///
/// The shell's history store is the source of truth; the editor gets a copy
/// of it before every read so arrow keys browse the same entries.
pub struct SyncInput {
    editor: Editor<ShellHelper, DefaultHistory>,
    prompt: String,
}

impl SyncInput {
    pub fn new(prompt: &str) -> Result<Self> {
        let config = Config::builder()
            .auto_add_history(false)
            .completion_type(CompletionType::Circular)
            .build();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(ShellHelper::default()));
        Ok(Self {
            editor,
            prompt: prompt.to_string(),
        })
    }

    fn mirror(&mut self, ctx: &EditContext<'_>) -> Result<()> {
        self.editor.clear_history()?;
        self.editor
            .history_mut()
            .set_max_len(ctx.history.max_len())?;
        for entry in ctx.history.iter() {
            self.editor.add_history_entry(entry)?;
        }

        let masking = ctx.settings.mask;
        if let Some(helper) = self.editor.helper_mut() {
            helper.masking = masking;
        }
        self.editor.set_color_mode(if masking {
            ColorMode::Forced
        } else {
            ColorMode::Enabled
        });
        Ok(())
    }
}

impl LineSource for SyncInput {
    fn read_line(&mut self, ctx: &EditContext<'_>) -> Result<Acquired> {
        self.mirror(ctx)?;
        match self.editor.readline(&self.prompt) {
            Ok(line) => Ok(Acquired::Line(line)),
            Err(ReadlineError::Interrupted) => {
                debug!("interrupted");
                Ok(Acquired::EndOfInput)
            }
            Err(ReadlineError::Eof) => {
                debug!("end of input");
                Ok(Acquired::EndOfInput)
            }
            Err(err) => Err(err.into()),
        }
    }
}
