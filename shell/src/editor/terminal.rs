use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};

use nix::libc;
use nix::sys::termios::{
    self, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg, SpecialCharacterIndices,
    Termios,
};
use tracing::{debug, warn};

use crate::error::{Result, ShellError};

/// Width assumed when the terminal size cannot be queried.
pub const DEFAULT_COLUMNS: usize = 80;

/// Terminal switched to raw mode; the previous attributes come back on drop.
pub struct RawMode {
    fd: OwnedFd,
    original: Termios,
}

impl RawMode {
    /// Disable echo, canonical input, signal keys and output processing on `fd`.
    pub fn enable(fd: BorrowedFd<'_>) -> Result<Self> {
        let fd = fd.try_clone_to_owned()?;
        let original = termios::tcgetattr(&fd).map_err(ShellError::Terminal)?;

        let mut raw = original.clone();
        raw.input_flags.remove(
            InputFlags::BRKINT
                | InputFlags::ICRNL
                | InputFlags::INPCK
                | InputFlags::ISTRIP
                | InputFlags::IXON,
        );
        raw.output_flags.remove(OutputFlags::OPOST);
        raw.control_flags.insert(ControlFlags::CS8);
        raw.local_flags
            .remove(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::IEXTEN | LocalFlags::ISIG);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        termios::tcsetattr(&fd, SetArg::TCSAFLUSH, &raw).map_err(ShellError::Terminal)?;
        debug!(fd = fd.as_raw_fd(), "raw mode enabled");
        Ok(Self { fd, original })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        match termios::tcsetattr(&self.fd, SetArg::TCSAFLUSH, &self.original) {
            Ok(()) => debug!(fd = self.fd.as_raw_fd(), "raw mode disabled"),
            Err(e) => warn!(error = %e, "cannot restore terminal attributes"),
        }
    }
}

nix::ioctl_read_bad!(window_size, libc::TIOCGWINSZ, libc::winsize);

/// Number of columns of the terminal behind `fd`.
pub fn columns(fd: impl AsFd) -> usize {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    // SAFETY: TIOCGWINSZ writes a single winsize into the pointed-to value.
    match unsafe { window_size(fd.as_fd().as_raw_fd(), &mut size) } {
        Ok(_) if size.ws_col > 0 => usize::from(size.ws_col),
        _ => DEFAULT_COLUMNS,
    }
}
