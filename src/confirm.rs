use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use crossterm::terminal;
use tracing::{debug, warn};

use crate::actions::Safety;

pub const ESCAPE: u8 = 0x1b;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Cancelled,
}

/// Source of single confirmation keystrokes.
pub trait KeySource {
    fn read_key(&mut self) -> Result<u8>;
}

/// Switches the terminal in and out of raw mode.
pub trait TerminalMode {
    fn is_raw(&self) -> Result<bool>;
    fn enable_raw(&self) -> Result<()>;
    fn disable_raw(&self) -> Result<()>;
}

/// The process terminal, through crossterm.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrosstermMode;

impl TerminalMode for CrosstermMode {
    fn is_raw(&self) -> Result<bool> {
        terminal::is_raw_mode_enabled().context("Failed to query terminal mode")
    }

    fn enable_raw(&self) -> Result<()> {
        terminal::enable_raw_mode().context("Failed to enable raw terminal mode")
    }

    fn disable_raw(&self) -> Result<()> {
        terminal::disable_raw_mode().context("Failed to restore terminal mode")
    }
}

/// Reads one raw byte from the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn read_key(&mut self) -> Result<u8> {
        read_raw_byte(&CrosstermMode, &mut io::stdin().lock())
    }
}

/// Reads a single byte from `input` with `mode` held raw for the duration.
pub fn read_raw_byte<M: TerminalMode, R: Read>(mode: &M, input: &mut R) -> Result<u8> {
    let _raw = RawModeGuard::acquire(mode)?;
    let mut buf = [0u8; 1];
    input
        .read_exact(&mut buf)
        .context("Failed to read confirmation key")?;
    Ok(buf[0])
}

/// Raw mode for as long as the guard lives. Restores the previous mode on drop.
struct RawModeGuard<'a, M: TerminalMode> {
    mode: &'a M,
    was_raw: bool,
}

impl<'a, M: TerminalMode> RawModeGuard<'a, M> {
    fn acquire(mode: &'a M) -> Result<Self> {
        let was_raw = mode.is_raw()?;
        if !was_raw {
            mode.enable_raw()?;
        }
        Ok(Self { mode, was_raw })
    }
}

impl<M: TerminalMode> Drop for RawModeGuard<'_, M> {
    fn drop(&mut self) {
        if self.was_raw {
            return;
        }
        if let Err(err) = self.mode.disable_raw() {
            warn!(error = %format!("{err:#}"), "failed to restore terminal mode");
        }
    }
}

/// Shows pending actions and collects the accept/cancel keystroke.
pub struct ConfirmGate<K, W> {
    keys: K,
    out: W,
}

impl<K: KeySource, W: Write> ConfirmGate<K, W> {
    pub fn new(keys: K, out: W) -> Self {
        Self { keys, out }
    }

    /// Prints `prompt` and, unless the action is read-only, waits for one
    /// key. Escape cancels, anything else accepts.
    pub fn request(&mut self, prompt: &str, safety: Safety) -> Result<Decision> {
        if safety == Safety::ReadOnly {
            write!(self.out, "{prompt} ")?;
            self.out.flush()?;
            return Ok(Decision::Accepted);
        }

        write!(self.out, "{prompt} [Enter/Esc] ")?;
        self.out.flush()?;
        let key = self.keys.read_key()?;
        if key == ESCAPE {
            writeln!(self.out, "=> cancelled")?;
            self.out.flush()?;
            debug!("action cancelled at confirmation");
            return Ok(Decision::Cancelled);
        }
        debug!(key, "action accepted at confirmation");
        Ok(Decision::Accepted)
    }

    /// Rewrites the prompt line with the final status.
    pub fn settle(&mut self, prompt: &str, status: &str) -> Result<()> {
        writeln!(self.out, "\r{prompt} => {status}{}", " ".repeat(20))?;
        self.out.flush()?;
        Ok(())
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    pub fn output(&self) -> &W {
        &self.out
    }
}
