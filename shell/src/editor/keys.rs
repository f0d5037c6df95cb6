use std::io::{self, ErrorKind, Read};

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Escape,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    CtrlA,
    CtrlB,
    CtrlC,
    CtrlD,
    CtrlE,
    CtrlF,
    CtrlK,
    CtrlL,
    CtrlN,
    CtrlP,
    CtrlT,
    CtrlU,
    CtrlW,
    /// Anything the editor has no binding for.
    Unknown,
}

fn read_byte(input: &mut impl Read) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Read one key from `input`. Returns `None` at end of input.
///
/// Escape sequences and multi-byte characters are read whole, so a single
/// call may consume several bytes.
pub fn read_key(input: &mut impl Read) -> io::Result<Option<Key>> {
    let Some(byte) = read_byte(input)? else {
        return Ok(None);
    };
    let key = match byte {
        b'\r' | b'\n' => Key::Enter,
        b'\t' => Key::Tab,
        127 | 8 => Key::Backspace,
        1 => Key::CtrlA,
        2 => Key::CtrlB,
        3 => Key::CtrlC,
        4 => Key::CtrlD,
        5 => Key::CtrlE,
        6 => Key::CtrlF,
        11 => Key::CtrlK,
        12 => Key::CtrlL,
        14 => Key::CtrlN,
        16 => Key::CtrlP,
        20 => Key::CtrlT,
        21 => Key::CtrlU,
        23 => Key::CtrlW,
        27 => read_escape(input)?,
        0..=31 => Key::Unknown,
        _ => read_char(byte, input)?,
    };
    Ok(Some(key))
}

fn read_escape(input: &mut impl Read) -> io::Result<Key> {
    let Some(first) = read_byte(input)? else {
        return Ok(Key::Escape);
    };
    let Some(second) = read_byte(input)? else {
        return Ok(Key::Escape);
    };
    let key = match (first, second) {
        (b'[', b'0'..=b'9') => match (second, read_byte(input)?) {
            (b'3', Some(b'~')) => Key::Delete,
            (b'1' | b'7', Some(b'~')) => Key::Home,
            (b'4' | b'8', Some(b'~')) => Key::End,
            _ => Key::Unknown,
        },
        (b'[', b'A') => Key::Up,
        (b'[', b'B') => Key::Down,
        (b'[', b'C') => Key::Right,
        (b'[', b'D') => Key::Left,
        (b'[' | b'O', b'H') => Key::Home,
        (b'[' | b'O', b'F') => Key::End,
        _ => Key::Unknown,
    };
    Ok(key)
}

fn read_char(lead: u8, input: &mut impl Read) -> io::Result<Key> {
    let width = match lead {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Ok(Key::Unknown),
    };
    let mut bytes = [lead, 0, 0, 0];
    for slot in bytes.iter_mut().take(width).skip(1) {
        match read_byte(input)? {
            Some(b) => *slot = b,
            None => return Ok(Key::Unknown),
        }
    }
    Ok(std::str::from_utf8(&bytes[..width])
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Key::Unknown, Key::Char))
}
