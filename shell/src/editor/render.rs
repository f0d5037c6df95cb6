//! Escape sequences that redraw the edited line.
//!
//! Rendering is a pure function of the line state, so the exact bytes sent to
//! the terminal can be checked without one.

use crate::completion::Hint;

/// What a redraw does: erase the old line, draw the new one, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refresh {
    pub clean: bool,
    pub write: bool,
}

impl Refresh {
    pub const FULL: Refresh = Refresh {
        clean: true,
        write: true,
    };
    pub const CLEAN: Refresh = Refresh {
        clean: true,
        write: false,
    };
    pub const WRITE: Refresh = Refresh {
        clean: false,
        write: true,
    };
}

/// Everything needed to draw one frame.
pub struct View<'a> {
    pub prompt: &'a str,
    pub text: &'a [char],
    pub pos: usize,
    pub mask: bool,
    pub hint: Option<Hint>,
    pub columns: usize,
}

impl View<'_> {
    fn prompt_len(&self) -> usize {
        self.prompt.chars().count()
    }

    fn push_text(&self, out: &mut String, range: std::ops::Range<usize>) {
        if self.mask {
            out.extend(std::iter::repeat_n('*', range.len()));
        } else {
            out.extend(&self.text[range]);
        }
    }

    /// Hint truncated to the columns left after the prompt and the text.
    fn push_hint(&self, out: &mut String) {
        let Some(hint) = &self.hint else {
            return;
        };
        let used = self.prompt_len() + self.text.len();
        if used >= self.columns {
            return;
        }
        let room = self.columns - used;
        let text: String = hint.text.chars().take(room).collect();
        out.push_str(&hint.styled(&text));
    }
}

/// Redraw a line that scrolls horizontally to keep the cursor visible.
pub fn single_line(view: &View<'_>, refresh: Refresh) -> String {
    let plen = view.prompt_len();
    let cols = view.columns.max(plen + 1);
    let mut start = 0;
    let mut len = view.text.len();
    let mut pos = view.pos;
    while plen + pos >= cols && pos > 0 {
        start += 1;
        len -= 1;
        pos -= 1;
    }
    while plen + len > cols && len > 0 {
        len -= 1;
    }

    let mut out = String::from("\r");
    if refresh.write {
        out.push_str(view.prompt);
        view.push_text(&mut out, start..start + len);
        view.push_hint(&mut out);
    }
    out.push_str("\x1b[0K");
    if refresh.write {
        move_to_column(&mut out, plen + pos);
    }
    out
}

/// Row bookkeeping of a line wrapped over several terminal rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rows {
    /// Most rows the line has ever used; all of them get erased.
    pub max_rows: usize,
    /// Cursor position at the end of the previous redraw.
    pub old_pos: usize,
}

/// Redraw a line that wraps across rows.
pub fn multi_line(view: &View<'_>, refresh: Refresh, state: &mut Rows) -> String {
    let plen = view.prompt_len();
    let cols = view.columns.max(1);
    let len = view.text.len();
    let pos = view.pos;
    let mut rows = (plen + len).div_ceil(cols);
    let cursor_row = (plen + state.old_pos + cols) / cols;
    let old_rows = state.max_rows;
    state.max_rows = state.max_rows.max(rows);

    let mut out = String::new();
    if refresh.clean {
        if old_rows > cursor_row {
            out.push_str(&format!("\x1b[{}B", old_rows - cursor_row));
        }
        for _ in 1..old_rows {
            out.push_str("\r\x1b[0K\x1b[1A");
        }
        out.push_str("\r\x1b[0K");
    }

    if refresh.write {
        out.push_str(view.prompt);
        view.push_text(&mut out, 0..len);
        view.push_hint(&mut out);

        // Cursor sits past the last column: open the next row ourselves.
        if pos > 0 && pos == len && (pos + plen) % cols == 0 {
            out.push_str("\n\r");
            rows += 1;
            state.max_rows = state.max_rows.max(rows);
        }

        let new_cursor_row = (plen + pos + cols) / cols;
        if rows > new_cursor_row {
            out.push_str(&format!("\x1b[{}A", rows - new_cursor_row));
        }
        move_to_column(&mut out, (plen + pos) % cols);
    }

    state.old_pos = pos;
    out
}

fn move_to_column(out: &mut String, column: usize) {
    out.push('\r');
    if column > 0 {
        out.push_str(&format!("\x1b[{column}C"));
    }
}
