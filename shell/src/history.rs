//! Bounded command history persisted as a plain newline-delimited file.

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, ShellError};

/// In-memory history with a maximum length; the oldest entry goes first.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    max_len: usize,
}

impl History {
    pub fn new(max_len: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_len,
        }
    }

    /// Append a line.
    ///
    /// Returns `false` when the line was not stored: history is disabled or
    /// the line repeats the most recent entry.
    pub fn add(&mut self, line: &str) -> bool {
        if self.max_len == 0 {
            return false;
        }
        if self.entries.back().is_some_and(|last| last == line) {
            return false;
        }
        if self.entries.len() == self.max_len {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
        true
    }

    /// Change the retention limit, dropping the oldest entries that no longer fit.
    ///
    /// A limit below one is rejected and leaves the history untouched.
    pub fn set_max_len(&mut self, max_len: usize) -> bool {
        if max_len < 1 {
            debug!(max_len, "rejecting history length");
            return false;
        }
        while self.entries.len() > max_len {
            self.entries.pop_front();
        }
        self.max_len = max_len;
        true
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Load entries from `path`, one per line. A missing file is not an error.
    ///
    /// Bytes that are not valid UTF-8 are replaced line by line, so one
    /// damaged entry never costs the rest of the file.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no history file yet");
                return Ok(());
            }
            Err(reason) => {
                return Err(ShellError::HistoryLoad {
                    path: path.to_path_buf(),
                    reason,
                });
            }
        };
        let body = contents.strip_suffix(b"\n").unwrap_or(&contents[..]);
        if body.is_empty() {
            return Ok(());
        }
        for raw in body.split(|&b| b == b'\n') {
            let line = raw.split(|&b| b == b'\r').next().unwrap_or_default();
            self.add(&String::from_utf8_lossy(line));
        }
        debug!(path = %path.display(), entries = self.len(), "history loaded");
        Ok(())
    }

    /// Write every entry to `path`, readable by the owner only.
    pub fn save(&self, path: &Path) -> Result<()> {
        let to_err = |reason| ShellError::HistorySave {
            path: path.to_path_buf(),
            reason,
        };
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(to_err)?;
        let mut out = BufWriter::new(file);
        for entry in &self.entries {
            writeln!(out, "{entry}").map_err(to_err)?;
        }
        out.flush().map_err(to_err)
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn shrinking_limit_keeps_newest() {
        let mut history = History::default();
        assert!(history.set_max_len(5));
        for i in 0..10 {
            history.add(&format!("cmd {i}"));
        }
        let kept: Vec<_> = history.iter().collect();
        assert_eq!(kept, ["cmd 5", "cmd 6", "cmd 7", "cmd 8", "cmd 9"]);
    }

    #[test]
    fn shrinking_after_fill_truncates_oldest() {
        let mut history = History::new(10);
        for i in 0..10 {
            history.add(&i.to_string());
        }
        history.set_max_len(3);
        assert_eq!(history.iter().collect::<Vec<_>>(), ["7", "8", "9"]);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let mut history = History::new(4);
        history.add("ls");
        assert!(!history.set_max_len(0));
        assert_eq!(history.max_len(), 4);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn consecutive_duplicates_are_skipped() {
        let mut history = History::default();
        assert!(history.add("ls"));
        assert!(!history.add("ls"));
        assert!(history.add("pwd"));
        assert!(history.add("ls"));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn save_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.txt");

        let mut history = History::default();
        history.add("echo one");
        history.add("echo two");
        history.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "echo one\necho two\n");

        let mut loaded = History::default();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.iter().collect::<Vec<_>>(), ["echo one", "echo two"]);
    }

    #[test]
    fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.txt");
        History::default().save(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn load_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = History::default();
        history.load(&dir.path().join("absent.txt")).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn load_strips_carriage_returns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.txt");
        fs::write(&path, "ls -l\r\nuname\n").unwrap();
        let mut history = History::default();
        history.load(&path).unwrap();
        assert_eq!(history.iter().collect::<Vec<_>>(), ["ls -l", "uname"]);
    }

    #[test]
    fn invalid_utf8_line_keeps_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.txt");
        fs::write(&path, b"make all\ngit log\ncaf\xe9\nls -l\n").unwrap();

        let mut history = History::default();
        history.load(&path).unwrap();
        assert_eq!(
            history.iter().collect::<Vec<_>>(),
            ["make all", "git log", "caf\u{fffd}", "ls -l"]
        );

        history.add("echo hi");
        history.save(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("make all\ngit log\n"));
        assert!(text.ends_with("ls -l\necho hi\n"));
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("history.txt");
        let err = History::default().save(&path).unwrap_err();
        assert!(matches!(err, ShellError::HistorySave { .. }));
    }

    proptest! {
        #[test]
        fn never_exceeds_limit(limit in 1usize..20, lines in prop::collection::vec("[a-z]{1,6}", 0..60)) {
            let mut history = History::new(limit);
            for line in &lines {
                history.add(line);
                prop_assert!(history.len() <= limit);
            }
            if let Some(last) = lines.last() {
                prop_assert_eq!(history.iter().next_back(), Some(last.as_str()));
            }
        }
    }
}
