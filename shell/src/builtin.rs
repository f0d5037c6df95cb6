use regex::Regex;
use std::sync::LazyLock;

/// Directives interpreted by the shell itself, written with a leading `/`.
///
/// Directives are matched by literal prefix, so `/masked` is still `/mask`
/// and `/historylen 20` sets the length to 20.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Change how many history entries are retained.
    HistoryLen(i64),
    /// Show `*` instead of the typed characters.
    Mask,
    /// Echo typed characters again.
    Unmask,
    /// Anything else starting with `/`, kept verbatim for the notice.
    Unknown(String),
}

type DirectiveParser = fn(&str) -> Directive;

/// Recognised prefixes, tried in order.
const TABLE: &[(&str, DirectiveParser)] = &[
    ("/historylen", history_len),
    ("/mask", mask),
    ("/unmask", unmask),
];

fn history_len(rest: &str) -> Directive {
    Directive::HistoryLen(parse_leading_int(rest))
}

fn mask(_: &str) -> Directive {
    Directive::Mask
}

fn unmask(_: &str) -> Directive {
    Directive::Unmask
}

impl Directive {
    /// Parse a line into a directive, or `None` if it does not start with `/`.
    pub fn parse(line: &str) -> Option<Self> {
        if !line.starts_with('/') {
            return None;
        }
        let directive = TABLE
            .iter()
            .find_map(|&(prefix, parse)| line.strip_prefix(prefix).map(parse))
            .unwrap_or_else(|| Directive::Unknown(line.to_string()));
        Some(directive)
    }

    /// Name of the directive, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Directive::HistoryLen(_) => "historylen",
            Directive::Mask => "mask",
            Directive::Unmask => "unmask",
            Directive::Unknown(_) => "unknown",
        }
    }
}

static LEADING_INT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t\n\r\x0b\x0c]*([+-]?[0-9]+)").expect("leading integer pattern is valid")
});

/// Integer at the start of `text`, C `atoi` style: leading whitespace and a
/// sign are accepted, parsing stops at the first non-digit, and text without
/// digits reads as zero.
pub fn parse_leading_int(text: &str) -> i64 {
    LEADING_INT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|digits| {
            let s = digits.as_str();
            s.parse::<i64>().unwrap_or_else(|_| {
                if s.starts_with('-') {
                    i64::MIN
                } else {
                    i64::MAX
                }
            })
        })
        .unwrap_or(0)
}
