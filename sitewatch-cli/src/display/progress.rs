//! Round progress bar with tracing integration.
//!
//! While a round is running, log lines are printed through the bar so they
//! don't tear its display.

use indicatif::{ProgressBar, ProgressStyle};
use sitewatch_core::ProgressCallback;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

/// The bar of the round in flight, if any.
static ROUND_PROGRESS_BAR: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn active_bar() -> MutexGuard<'static, Option<ProgressBar>> {
    ROUND_PROGRESS_BAR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn current_bar() -> Option<ProgressBar> {
    active_bar().clone()
}

/// Progress bar for one monitoring round.
///
/// Registers itself as the tracing output target on creation and
/// unregisters when dropped.
pub struct RoundProgress {
    bar: ProgressBar,
}

impl RoundProgress {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        *active_bar() = Some(bar.clone());
        Self { bar }
    }

    /// Callback handed to the round runner; advances the bar per site.
    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Box::new(move |completed: usize, _total: usize, name: &str| {
            bar.set_position(completed as u64);
            bar.set_message(name.to_string());
        })
    }
}

impl Drop for RoundProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
        *active_bar() = None;
    }
}

/// Writes whole lines through the active round bar, or to stderr when no
/// round is in flight.
pub struct ProgressWriter {
    buffer: Vec<u8>,
}

impl ProgressWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    fn emit(line: &str) -> std::io::Result<()> {
        match current_bar() {
            Some(bar) => {
                bar.println(line);
                Ok(())
            }
            None => {
                let mut stderr = std::io::stderr();
                stderr.write_all(line.as_bytes())?;
                stderr.write_all(b"\n")
            }
        }
    }
}

impl Default for ProgressWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line);
            Self::emit(line.trim_end_matches('\n'))?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            let rest = String::from_utf8_lossy(&self.buffer).trim_end().to_string();
            self.buffer.clear();
            if !rest.is_empty() {
                Self::emit(&rest)?;
            }
        }
        Ok(())
    }
}

impl Drop for ProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// `MakeWriter` for tracing-subscriber that hands out [`ProgressWriter`]s.
#[derive(Default)]
pub struct ProgressWriterFactory;

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for ProgressWriterFactory {
    type Writer = ProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ProgressWriter::new()
    }
}
