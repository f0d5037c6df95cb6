//! Key code debugging mode: echo the bytes each key press produces.

use std::io::{self, ErrorKind, IsTerminal, Read, Write};
use std::os::fd::AsFd;

use super::terminal::RawMode;
use crate::error::Result;

const BANNER: &str = "Key codes debugging mode.\n\
                      Press keys to see scan codes. Type 'quit' at any time to exit.\n";

/// Print every byte read from `input` until the last four spell `quit`.
pub fn print_key_codes(input: &mut impl Read, output: &mut impl Write) -> io::Result<()> {
    let mut window = *b"    ";
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(()),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
        let b = byte[0];
        window.rotate_left(1);
        window[3] = b;
        if &window == b"quit" {
            return Ok(());
        }
        let shown = if b.is_ascii_graphic() || b == b' ' {
            char::from(b)
        } else {
            '?'
        };
        write!(output, "'{shown}' {b:02x} ({b}) (type quit to exit)\n\r")?;
        output.flush()?;
    }
}

/// Run the debugging mode on the process's terminal.
pub fn run() -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    stdout.write_all(BANNER.as_bytes())?;
    stdout.flush()?;
    let _raw = if stdin.is_terminal() {
        Some(RawMode::enable(stdin.as_fd())?)
    } else {
        None
    };
    print_key_codes(&mut stdin.lock(), &mut stdout)?;
    Ok(())
}
