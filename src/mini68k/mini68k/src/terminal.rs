use log::{debug, warn};
use mini68k_peripherals::{Console, ConsoleStatus};
use std::io::{self, Write};
use std::mem;
use std::ptr;

const STDIN: libc::c_int = 0;
const STDOUT: libc::c_int = 1;

/// Character-at-a-time input, no local echo, guest owns the control keys
fn raw_mode(saved: &libc::termios) -> libc::termios {
    let mut raw = *saved;
    raw.c_iflag &= !(libc::ICRNL | libc::IGNCR);
    raw.c_lflag &= !(libc::ICANON | libc::ECHO | libc::ECHOE | libc::ECHOK);
    raw.c_cc[libc::VMIN] = 1;
    raw.c_cc[libc::VTIME] = 0;
    raw.c_cc[libc::VINTR] = 0;
    raw.c_cc[libc::VSUSP] = 0;
    raw.c_cc[libc::VEOF] = 0;
    raw
}

/// Put a saved mode back on stdin. Also used from the signal path, where
/// the `Terminal` itself is out of reach.
pub fn restore_mode(saved: &libc::termios) -> io::Result<()> {
    if unsafe { libc::tcsetattr(STDIN, libc::TCSADRAIN, saved) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Host terminal mode. Raw mode leaves INTR, SUSP and EOF to the guest.
pub struct Terminal {
    saved: Option<libc::termios>,
}

impl Terminal {
    /// Put stdin in raw mode; a non-tty stdin is left alone
    pub fn setup() -> Self {
        match Self::enter_raw_mode() {
            Ok(saved) => Terminal { saved: Some(saved) },
            Err(e) => {
                warn!("terminal left in cooked mode: {}", e);
                Terminal::detached()
            }
        }
    }

    /// A terminal that was never changed, restore does nothing
    pub fn detached() -> Self {
        Terminal { saved: None }
    }

    fn enter_raw_mode() -> io::Result<libc::termios> {
        unsafe {
            if libc::isatty(STDIN) == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "stdin is not a tty"));
            }
            let mut saved: libc::termios = mem::zeroed();
            if libc::tcgetattr(STDIN, &mut saved) == -1 {
                return Err(io::Error::last_os_error());
            }
            let raw = raw_mode(&saved);
            if libc::tcsetattr(STDIN, libc::TCSADRAIN, &raw) == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(saved)
        }
    }

    pub fn is_raw(&self) -> bool {
        self.saved.is_some()
    }

    /// Mode to put back if the process has to leave in a hurry
    pub fn saved_mode(&self) -> Option<libc::termios> {
        self.saved
    }

    /// Put back the mode found at setup; safe to call more than once
    pub fn restore(&mut self) {
        if let Some(saved) = self.saved.take() {
            if let Err(e) = restore_mode(&saved) {
                warn!("failed to restore terminal: {}", e);
            }
        }
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        self.restore();
    }
}

/// The UART's host side: stdin and stdout
pub struct StdioConsole {
    eof: bool,
}

impl StdioConsole {
    pub fn new() -> Self {
        StdioConsole { eof: false }
    }
}

impl Console for StdioConsole {
    fn poll(&mut self) -> ConsoleStatus {
        unsafe {
            let mut readers: libc::fd_set = mem::zeroed();
            let mut writers: libc::fd_set = mem::zeroed();
            libc::FD_ZERO(&mut readers);
            libc::FD_ZERO(&mut writers);
            if !self.eof {
                libc::FD_SET(STDIN, &mut readers);
            }
            libc::FD_SET(STDOUT, &mut writers);
            let mut timeout = libc::timeval {
                tv_sec: 0,
                tv_usec: 0,
            };
            let ready = libc::select(
                STDOUT + 1,
                &mut readers,
                &mut writers,
                ptr::null_mut(),
                &mut timeout,
            );
            if ready == -1 {
                return ConsoleStatus::default();
            }
            ConsoleStatus {
                input: libc::FD_ISSET(STDIN, &readers),
                output: libc::FD_ISSET(STDOUT, &writers),
            }
        }
    }

    fn read_byte(&mut self) -> u8 {
        let mut byte = 0u8;
        let count = unsafe { libc::read(STDIN, &mut byte as *mut u8 as *mut libc::c_void, 1) };
        if count != 1 {
            // Stop reporting input once stdin is exhausted
            debug!("console input closed");
            self.eof = true;
        }
        byte
    }

    fn write_byte(&mut self, byte: u8) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if let Err(e) = out.write_all(&[byte]).and_then(|_| out.flush()) {
            debug!("console write failed: {}", e);
        }
    }
}

#[cfg(test)]
mod terminal_tests {
    use super::*;

    #[test]
    fn test_raw_mode_flags() {
        let mut cooked: libc::termios = unsafe { mem::zeroed() };
        cooked.c_iflag = libc::ICRNL | libc::IGNCR | libc::IXON;
        cooked.c_lflag = libc::ICANON | libc::ECHO | libc::ECHOE | libc::ECHOK | libc::ISIG;
        cooked.c_cc[libc::VINTR] = 0x03;
        cooked.c_cc[libc::VSUSP] = 0x1A;
        cooked.c_cc[libc::VEOF] = 0x04;

        let raw = raw_mode(&cooked);
        assert_eq!(raw.c_iflag, libc::IXON);
        assert_eq!(raw.c_lflag, libc::ISIG);
        assert_eq!(raw.c_cc[libc::VMIN], 1);
        assert_eq!(raw.c_cc[libc::VINTR], 0);
        assert_eq!(raw.c_cc[libc::VSUSP], 0);
        assert_eq!(raw.c_cc[libc::VEOF], 0);
    }

    #[test]
    fn test_detached_restore_is_noop() {
        let mut terminal = Terminal::detached();
        assert!(!terminal.is_raw());
        assert!(terminal.saved_mode().is_none());
        terminal.restore();
        terminal.restore();
        assert!(!terminal.is_raw());
    }
}
