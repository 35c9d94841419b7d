//! Pluggable console input and output.
//!
//! The dispatcher never touches a terminal directly. It reads through a
//! [`LineSource`] and writes through a [`LineSink`], both injected when
//! the console is built. Production wires [`StdinSource`] and
//! [`StdoutSink`]; an embedding host feeds lines through the command slot
//! with [`SlotSource`]; tests use [`ScriptedSource`] and [`RecordingSink`].

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::slot::CommandSlot;

/// Blocking source of input lines.
pub trait LineSource {
    /// Block until a line is available and return it without its line
    /// terminator, truncated to at most `max_length` bytes.
    ///
    /// Returns `Ok(None)` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the underlying reader.
    fn read_line(&mut self, max_length: usize) -> io::Result<Option<String>>;
}

/// Destination for console output, one line at a time.
pub trait LineSink {
    /// Emit `text` followed by a line break.
    fn write_line(&mut self, text: &str);
}

/// Reads lines from any buffered reader.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    /// Wrap a buffered reader.
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn read_line(&mut self, max_length: usize) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = strip_line_ending(&line);
        Ok(Some(truncate_to(line, max_length).to_owned()))
    }
}

/// Terminal input.
pub type StdinSource = ReaderSource<io::StdinLock<'static>>;

impl StdinSource {
    /// Read from the process's standard input.
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

/// Terminal output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn write_line(&mut self, text: &str) {
        let mut out = io::stdout().lock();
        if let Err(e) = writeln!(out, "{text}").and_then(|()| out.flush()) {
            warn!(error = %e, "failed to write console output");
        }
    }
}

/// Supplies a fixed script of lines, then reports exhaustion.
#[derive(Debug, Default, Clone)]
pub struct ScriptedSource {
    lines: VecDeque<String>,
}

impl ScriptedSource {
    /// Script the given lines in order.
    pub fn new<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Lines not yet read.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineSource for ScriptedSource {
    fn read_line(&mut self, max_length: usize) -> io::Result<Option<String>> {
        Ok(self
            .lines
            .pop_front()
            .map(|line| truncate_to(strip_line_ending(&line), max_length).to_owned()))
    }
}

/// Records every written line. Clones share the same record.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Take everything written so far, leaving the record empty.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LineSink for RecordingSink {
    fn write_line(&mut self, text: &str) {
        self.lock().push(text.to_owned());
    }
}

/// Reads the command currently pending in a [`CommandSlot`].
///
/// An empty slot yields an empty line, which the dispatcher ignores. The
/// source is never exhausted.
#[derive(Debug, Clone)]
pub struct SlotSource {
    slot: Arc<CommandSlot>,
}

impl SlotSource {
    /// Read from `slot`.
    pub const fn new(slot: Arc<CommandSlot>) -> Self {
        Self { slot }
    }
}

impl LineSource for SlotSource {
    fn read_line(&mut self, max_length: usize) -> io::Result<Option<String>> {
        let line = self.slot.take_if_pending().unwrap_or_default();
        Ok(Some(truncate_to(&line, max_length).to_owned()))
    }
}

/// Strip any trailing CR and LF characters.
pub fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// The longest prefix of `text` that is at most `max` bytes and ends on a
/// character boundary.
fn truncate_to(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let end = (0..=max)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0);
    text.get(..end).unwrap_or_default()
}
