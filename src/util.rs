use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

/// Prints `label` and reads one line from stdin. `None` on end of input.
pub fn ask_or_eof(label: &str) -> Result<Option<String>> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    read_line_or_eof(&mut input, &mut io::stdout(), label)
}

pub fn read_line_or_eof<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    label: &str,
) -> Result<Option<String>> {
    write!(out, "{label}").context("Failed to write prompt")?;
    out.flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

pub fn truncate_preview(text: &str, max_len: usize) -> String {
    truncate_with_suffix(text, max_len, "...")
}

pub fn truncate_with_suffix(text: &str, max_chars: usize, suffix: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut_at, _)) => format!("{}{}", &text[..cut_at], suffix),
        None => text.to_string(),
    }
}

/// Ticking "(working ...)" line shown while blocked on the backend.
///
/// The ticker thread redraws once per second and stops as soon as the
/// status is finished or dropped.
pub struct WorkingStatus {
    stop: Option<mpsc::Sender<()>>,
    ticker: Option<thread::JoinHandle<usize>>,
}

impl WorkingStatus {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        let (stop, stopped) = mpsc::channel::<()>();
        let ticker = thread::spawn(move || {
            let start = Instant::now();
            let mut width = 0;
            loop {
                let line = working_line(&label, start.elapsed());
                width = width.max(line.chars().count());
                print!("\r{line}");
                let _ = io::stdout().flush();
                match stopped.recv_timeout(Duration::from_secs(1)) {
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                    _ => return width,
                }
            }
        });
        Self {
            stop: Some(stop),
            ticker: Some(ticker),
        }
    }

    /// Stops the ticker and blanks its line so the next output starts clean.
    pub fn finish(mut self) {
        let width = self.halt();
        print!("\r{}\r", " ".repeat(width));
        let _ = io::stdout().flush();
    }

    fn halt(&mut self) -> usize {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.ticker
            .take()
            .and_then(|t| t.join().ok())
            .unwrap_or_default()
    }
}

impl Drop for WorkingStatus {
    fn drop(&mut self) {
        // Unfinished: keep the last tick visible above whatever follows.
        if self.halt() > 0 {
            println!();
        }
    }
}

fn working_line(label: &str, elapsed: Duration) -> String {
    format!("(working {label} {}s)", elapsed.as_secs())
}
