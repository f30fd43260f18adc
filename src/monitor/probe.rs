//! Non-blocking operator signals.
//!
//! The monitor only sees [`CancellationProbe`]. [`ConsoleProbe`] is the
//! terminal implementation: Ctrl+C requests termination, and a line typed on
//! stdin pauses (`Enter` or `p`) or quits (`q`).

use anyhow::{Context, Result};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

/// Signal from the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeSignal {
    /// Stop watching and hand control to the menu.
    Pause,
    /// Stop for good.
    Terminate,
}

/// Checked once per tick by the monitor. Must not block.
#[cfg_attr(test, mockall::automock)]
pub trait CancellationProbe {
    fn poll(&mut self) -> Option<ProbeSignal>;
}

/// Map an operator input line to a signal.
pub fn interpret_line(line: &str) -> Option<ProbeSignal> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "p" | "pause" | "m" | "menu" => Some(ProbeSignal::Pause),
        "q" | "quit" | "exit" => Some(ProbeSignal::Terminate),
        _ => None,
    }
}

/// Terminal-backed probe.
///
/// A reader thread forwards stdin lines over a channel so `poll` can use
/// `try_recv`. Ctrl+C sets a flag through the `ctrlc` handler.
pub struct ConsoleProbe {
    lines: Receiver<String>,
    terminate: Arc<AtomicBool>,
}

impl ConsoleProbe {
    /// Install the Ctrl+C handler and start the stdin reader.
    ///
    /// Can only be called once per process; `ctrlc` allows a single handler.
    pub fn install() -> Result<Self> {
        let terminate = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&terminate);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl+C handler")?;

        let (tx, lines) = mpsc::channel();
        thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                tracing::debug!("stdin closed");
            })
            .context("Failed to spawn stdin reader thread")?;

        Ok(Self { lines, terminate })
    }

    /// Whether Ctrl+C has been pressed.
    pub fn terminate_requested(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    /// Block until the operator enters a line.
    ///
    /// Returns `None` on Ctrl+C or when stdin is closed.
    pub fn wait_for_line(&self) -> Option<String> {
        loop {
            if self.terminate_requested() {
                return None;
            }
            match self.lines.recv_timeout(Duration::from_millis(200)) {
                Ok(line) => return Some(line),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

impl CancellationProbe for ConsoleProbe {
    fn poll(&mut self) -> Option<ProbeSignal> {
        if self.terminate_requested() {
            return Some(ProbeSignal::Terminate);
        }
        match self.lines.try_recv() {
            Ok(line) => interpret_line(&line),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}
