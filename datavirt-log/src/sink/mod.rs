//! Output sinks receiving rendered records, one line per event.

mod rotating;

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

pub use rotating::RotatingFileSink;

/// Destination for rendered log lines.
///
/// Implementations receive the line without a trailing newline and are
/// responsible for their own framing.
pub trait Sink: Send {
    /// Write one rendered record.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Flush buffered output.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Writes records to the process's standard output or standard error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSink {
    stream: Stream,
}

impl StreamSink {
    /// Sink writing to standard output.
    #[must_use]
    pub const fn stdout() -> Self {
        Self {
            stream: Stream::Stdout,
        }
    }

    /// Sink writing to standard error.
    #[must_use]
    pub const fn stderr() -> Self {
        Self {
            stream: Stream::Stderr,
        }
    }
}

impl Sink for StreamSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self.stream {
            Stream::Stdout => writeln!(io::stdout().lock(), "{line}"),
            Stream::Stderr => writeln!(io::stderr().lock(), "{line}"),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream {
            Stream::Stdout => io::stdout().lock().flush(),
            Stream::Stderr => io::stderr().lock().flush(),
        }
    }
}

/// Keeps rendered lines in a shared in-memory buffer.
///
/// Clones share the same buffer, so a test can hand one clone to a
/// dispatcher and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line written so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.buffer().clone()
    }

    /// Lines parsed back into JSON values; lines that are not JSON are skipped.
    #[must_use]
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.buffer()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Discard every buffered line.
    pub fn clear(&self) {
        self.buffer().clear();
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Sink for MemorySink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.buffer().push(line.to_owned());
        Ok(())
    }
}
