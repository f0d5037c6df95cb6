//! Tab completion and inline hints, shared by both line editors.

/// Candidates offered when Tab is pressed on `line`.
pub fn complete(line: &str) -> Vec<String> {
    if line.starts_with('h') {
        vec!["hello".to_string(), "hello there".to_string()]
    } else {
        Vec::new()
    }
}

/// Text drawn after the cursor, with its ANSI color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub text: &'static str,
    pub color: u8,
    pub bold: bool,
}

impl Hint {
    /// The hint wrapped in SGR escapes.
    pub fn styled(&self, text: &str) -> String {
        format!(
            "\x1b[{};{};49m{}\x1b[0m",
            u8::from(self.bold),
            self.color,
            text
        )
    }
}

/// Hint to show for the current buffer, if any.
pub fn hint(line: &str) -> Option<Hint> {
    line.eq_ignore_ascii_case("hello").then_some(Hint {
        text: " World",
        color: 35,
        bold: false,
    })
}
