//! Fan rendered events out to the handlers that admit them.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{Level, LevelFilter};

use crate::{LogEvent, SeverityFilter, Sink, StructuredFormatter};

/// A sink together with the level and filters deciding what reaches it.
pub struct Handler {
    name: String,
    level: LevelFilter,
    filters: Vec<SeverityFilter>,
    sink: Mutex<Box<dyn Sink>>,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

impl Handler {
    /// Wrap `sink`, admitting every level until narrowed.
    pub fn new(name: impl Into<String>, sink: Box<dyn Sink>) -> Self {
        Self {
            name: name.into(),
            level: LevelFilter::Trace,
            filters: Vec::new(),
            sink: Mutex::new(sink),
        }
    }

    /// Only admit events at least as severe as `level`.
    #[must_use]
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Additionally require `filter` to admit each event.
    #[must_use]
    pub fn with_filter(mut self, filter: SeverityFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Handler name as configured.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Report whether `event` should be written to this handler's sink.
    #[must_use]
    pub fn admits(&self, event: &LogEvent) -> bool {
        event.level <= self.level && self.filters.iter().all(|filter| filter.admits_event(event))
    }

    fn sink(&self) -> MutexGuard<'_, Box<dyn Sink>> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, line: &str) -> io::Result<()> {
        self.sink().write_line(line)
    }

    fn flush(&self) -> io::Result<()> {
        self.sink().flush()
    }
}

/// The process-wide logging channel: a name, a level, one formatter and
/// any number of handlers.
///
/// Emission never fails from the caller's point of view. Events that cannot
/// be rendered or written are counted in [`Dispatcher::failed_writes`].
pub struct Dispatcher {
    name: String,
    level: LevelFilter,
    formatter: StructuredFormatter,
    handlers: Vec<Handler>,
    failures: AtomicU64,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("formatter", &self.formatter)
            .field("handlers", &self.handlers)
            .field("failures", &self.failed_writes())
            .finish()
    }
}

impl Dispatcher {
    /// Create a channel with no handlers that accepts every level.
    pub fn new(name: impl Into<String>, formatter: StructuredFormatter) -> Self {
        Self {
            name: name.into(),
            level: LevelFilter::Trace,
            formatter,
            handlers: Vec::new(),
            failures: AtomicU64::new(0),
        }
    }

    /// Drop events less severe than `level` before any handler sees them.
    #[must_use]
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Append a handler.
    #[must_use]
    pub fn with_handler(mut self, handler: Handler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel level.
    #[must_use]
    pub const fn level(&self) -> LevelFilter {
        self.level
    }

    /// Formatter shared by every handler.
    #[must_use]
    pub const fn formatter(&self) -> &StructuredFormatter {
        &self.formatter
    }

    /// Configured handlers in dispatch order.
    #[must_use]
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Report whether events at `level` pass the channel level.
    #[must_use]
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    /// Render `event` once and write it to every admitting handler.
    pub fn emit(&self, event: &LogEvent) {
        if !self.enabled(event.level) {
            return;
        }
        let targets: Vec<&Handler> = self
            .handlers
            .iter()
            .filter(|handler| handler.admits(event))
            .collect();
        if targets.is_empty() {
            return;
        }
        let Ok(line) = self.formatter.format(event) else {
            self.record_failure();
            return;
        };
        for handler in targets {
            if handler.write(&line).is_err() {
                self.record_failure();
            }
        }
    }

    /// Flush every handler's sink.
    pub fn flush(&self) {
        for handler in &self.handlers {
            if handler.flush().is_err() {
                self.record_failure();
            }
        }
    }

    /// Number of events that could not be rendered or written.
    #[must_use]
    pub fn failed_writes(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySink;
    use rstest::{fixture, rstest};

    struct BrokenSink;

    impl Sink for BrokenSink {
        fn write_line(&mut self, _line: &str) -> io::Result<()> {
            Err(io::Error::other("sink unavailable"))
        }
    }

    #[fixture]
    fn routed() -> (Dispatcher, MemorySink, MemorySink) {
        let routine = MemorySink::new();
        let errors = MemorySink::new();
        let dispatcher = Dispatcher::new("data_connections", StructuredFormatter::default())
            .with_level(LevelFilter::Debug)
            .with_handler(
                Handler::new("stdout", Box::new(routine.clone()))
                    .with_filter(SeverityFilter::at_most(Level::Info)),
            )
            .with_handler(
                Handler::new("stderr", Box::new(errors.clone())).with_level(LevelFilter::Warn),
            );
        (dispatcher, routine, errors)
    }

    #[rstest]
    fn routes_by_severity(routed: (Dispatcher, MemorySink, MemorySink)) {
        let (dispatcher, routine, errors) = routed;
        dispatcher.emit(&LogEvent::new(Level::Info, "data_connections", "fetched"));
        dispatcher.emit(&LogEvent::new(Level::Error, "data_connections", "failed"));
        dispatcher.emit(&LogEvent::new(Level::Trace, "data_connections", "dropped"));

        let routine_messages: Vec<_> = routine
            .records()
            .into_iter()
            .map(|record| record["message"].clone())
            .collect();
        let error_messages: Vec<_> = errors
            .records()
            .into_iter()
            .map(|record| record["message"].clone())
            .collect();
        assert_eq!(routine_messages, vec!["fetched"]);
        assert_eq!(error_messages, vec!["failed"]);
        assert_eq!(dispatcher.failed_writes(), 0);
    }

    #[rstest]
    fn sink_and_format_failures_are_counted_not_raised() {
        let dispatcher = Dispatcher::new(
            "data_connections",
            StructuredFormatter::new([("out", "missing_field")]),
        )
        .with_handler(Handler::new("broken", Box::new(BrokenSink)));
        dispatcher.emit(&LogEvent::new(Level::Info, "data_connections", "lost"));
        assert_eq!(dispatcher.failed_writes(), 1);

        let plain = Dispatcher::new("data_connections", StructuredFormatter::default())
            .with_handler(Handler::new("broken", Box::new(BrokenSink)));
        plain.emit(&LogEvent::new(Level::Info, "data_connections", "lost"));
        assert_eq!(plain.failed_writes(), 1);
    }
}
