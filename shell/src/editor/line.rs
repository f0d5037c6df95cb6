/// Editable text with a cursor and a byte capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    chars: Vec<char>,
    pos: usize,
    capacity: usize,
}

impl LineBuffer {
    /// Empty buffer holding at most `capacity` bytes of UTF-8 text.
    pub fn new(capacity: usize) -> Self {
        Self {
            chars: Vec::new(),
            pos: 0,
            capacity,
        }
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Cursor position, in characters.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    fn byte_len(&self) -> usize {
        self.chars.iter().map(|c| c.len_utf8()).sum()
    }

    /// Insert at the cursor. Returns `false` when the buffer is full.
    pub fn insert(&mut self, c: char) -> bool {
        if self.byte_len() + c.len_utf8() > self.capacity {
            return false;
        }
        self.chars.insert(self.pos, c);
        self.pos += 1;
        true
    }

    /// Replace the whole text, cursor at the end. Text beyond the capacity is dropped.
    pub fn set(&mut self, text: &str) {
        self.chars.clear();
        self.pos = 0;
        for c in text.chars() {
            if !self.insert(c) {
                break;
            }
        }
    }

    pub fn backspace(&mut self) -> bool {
        if self.pos == 0 {
            return false;
        }
        self.pos -= 1;
        self.chars.remove(self.pos);
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.pos >= self.chars.len() {
            return false;
        }
        self.chars.remove(self.pos);
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.pos == 0 {
            return false;
        }
        self.pos -= 1;
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.pos >= self.chars.len() {
            return false;
        }
        self.pos += 1;
        true
    }

    pub fn move_home(&mut self) -> bool {
        let moved = self.pos != 0;
        self.pos = 0;
        moved
    }

    pub fn move_end(&mut self) -> bool {
        let moved = self.pos != self.chars.len();
        self.pos = self.chars.len();
        moved
    }

    /// Clear the whole line.
    pub fn kill_line(&mut self) {
        self.chars.clear();
        self.pos = 0;
    }

    /// Delete from the cursor to the end of the line.
    pub fn kill_to_end(&mut self) {
        self.chars.truncate(self.pos);
    }

    /// Delete the word before the cursor along with the spaces after it.
    pub fn delete_prev_word(&mut self) {
        let end = self.pos;
        let mut start = end;
        while start > 0 && self.chars[start - 1] == ' ' {
            start -= 1;
        }
        while start > 0 && self.chars[start - 1] != ' ' {
            start -= 1;
        }
        self.chars.drain(start..end);
        self.pos = start;
    }

    /// Swap the character before the cursor with the one under it.
    pub fn transpose(&mut self) -> bool {
        if self.pos == 0 || self.pos >= self.chars.len() {
            return false;
        }
        self.chars.swap(self.pos - 1, self.pos);
        if self.pos + 1 < self.chars.len() {
            self.pos += 1;
        }
        true
    }
}

impl std::fmt::Display for LineBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.chars.iter().try_for_each(|c| write!(f, "{c}"))
    }
}
