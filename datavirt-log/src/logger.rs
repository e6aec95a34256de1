//! The injectable logging handle.

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::panic::Location;
use std::sync::Arc;

use log::Level;
use serde_json::Value;

use crate::{Dispatcher, Extras, LOGGER_NAME, LogConfigError, LogEvent, LoggingConfig};

/// Cheap, cloneable handle onto a [`Dispatcher`].
///
/// A default `Logger` is a no-op: it reports every level as disabled and
/// drops events. Components hold a `Logger` rather than reaching for global
/// state, so tests can hand them one backed by in-memory sinks.
#[derive(Clone, Default)]
pub struct Logger {
    dispatcher: Option<Arc<Dispatcher>>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name())
            .field("active", &self.dispatcher.is_some())
            .finish()
    }
}

impl Logger {
    /// Wrap a configured dispatcher.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Some(Arc::new(dispatcher)),
        }
    }

    /// A logger that discards everything.
    #[must_use]
    pub const fn noop() -> Self {
        Self { dispatcher: None }
    }

    /// Build a logger from a configuration.
    ///
    /// # Errors
    /// Propagates any [`LogConfigError`] raised while building sinks.
    pub fn from_config(config: &LoggingConfig) -> Result<Self, LogConfigError> {
        config.build().map(Self::new)
    }

    /// Build a logger from the configuration bundled with this crate.
    ///
    /// # Errors
    /// Propagates any [`LogConfigError`] raised while parsing the bundled
    /// configuration or opening its sinks.
    pub fn bundled() -> Result<Self, LogConfigError> {
        Self::from_config(&LoggingConfig::bundled()?)
    }

    /// Channel name stamped on events.
    #[must_use]
    pub fn name(&self) -> &str {
        self.dispatcher
            .as_deref()
            .map_or(LOGGER_NAME, Dispatcher::name)
    }

    /// The dispatcher behind this handle, if any.
    #[must_use]
    pub fn dispatcher(&self) -> Option<&Dispatcher> {
        self.dispatcher.as_deref()
    }

    /// Report whether events at `level` would be dispatched.
    #[must_use]
    pub fn enabled(&self, level: Level) -> bool {
        self.dispatcher
            .as_deref()
            .is_some_and(|dispatcher| dispatcher.enabled(level))
    }

    /// Dispatch a fully built event.
    pub fn log(&self, event: &LogEvent) {
        if let Some(dispatcher) = self.dispatcher.as_deref() {
            dispatcher.emit(event);
        }
    }

    /// Flush every sink.
    pub fn flush(&self) {
        if let Some(dispatcher) = self.dispatcher.as_deref() {
            dispatcher.flush();
        }
    }

    /// Start an event at `level`, recording the caller's location.
    #[track_caller]
    pub fn event(&self, level: Level, message: impl Into<String>) -> EventBuilder<'_> {
        let event = LogEvent::new(level, self.name(), message).located(Location::caller());
        EventBuilder {
            logger: self,
            event,
        }
    }

    /// Start an `ERROR` event.
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) -> EventBuilder<'_> {
        self.event(Level::Error, message)
    }

    /// Start a `WARNING` event.
    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) -> EventBuilder<'_> {
        self.event(Level::Warn, message)
    }

    /// Start an `INFO` event.
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) -> EventBuilder<'_> {
        self.event(Level::Info, message)
    }

    /// Start a `DEBUG` event.
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) -> EventBuilder<'_> {
        self.event(Level::Debug, message)
    }

    /// Route records from the global `log` facade through this logger.
    ///
    /// # Errors
    /// Returns [`log::SetLoggerError`] when a global logger is already set.
    pub fn install(&self) -> Result<(), log::SetLoggerError> {
        let max_level = self
            .dispatcher
            .as_deref()
            .map_or(log::LevelFilter::Off, Dispatcher::level);
        log::set_boxed_logger(Box::new(LogBridge(self.clone())))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

/// An event under construction. Nothing is dispatched until [`EventBuilder::emit`].
#[must_use = "events are only dispatched by `emit`"]
#[derive(Debug)]
pub struct EventBuilder<'a> {
    logger: &'a Logger,
    event: LogEvent,
}

impl EventBuilder<'_> {
    /// Attach a JSON-compatible extra.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.extra.insert(key, value);
        self
    }

    /// Attach the `Display` rendering of `value` as an extra.
    pub fn extra_display(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.event.extra.insert_display(key, value);
        self
    }

    /// Attach a batch of extras.
    pub fn extras(mut self, extras: Extras) -> Self {
        self.event.extra.extend(extras);
        self
    }

    /// Attach an error and its source chain.
    pub fn error(mut self, error: &(dyn StdError + 'static)) -> Self {
        self.event = self.event.with_exception(error);
        self
    }

    /// Attach the current stack trace.
    pub fn with_stack(mut self) -> Self {
        self.event = self.event.with_stack();
        self
    }

    /// Dispatch the event.
    pub fn emit(self) {
        if self.logger.enabled(self.event.level) {
            self.logger.log(&self.event);
        }
    }
}

struct LogBridge(Logger);

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.0.enabled(metadata.level())
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.0.enabled(record.level()) {
            let mut event = LogEvent::from_record(record);
            event.name = self.0.name().to_owned();
            event.extra.insert("target", record.target());
            self.0.log(&event);
        }
    }

    fn flush(&self) {
        self.0.flush();
    }
}
