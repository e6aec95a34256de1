//! Structured JSON logging for data connections.
//!
//! Events are built at the call site through a [`Logger`] handle, rendered
//! once by a [`StructuredFormatter`] into a flat JSON record and written to
//! every [`Sink`] whose level and [`SeverityFilter`]s admit them. The whole
//! arrangement is usually described by a [`LoggingConfig`] document; the
//! crate ships one that sends routine events to standard output, warnings
//! and errors to standard error, and everything to a rotating file.
#![forbid(unsafe_code)]

mod config;
mod dispatcher;
mod error;
mod event;
mod filter;
mod formatter;
mod logger;
mod sink;

pub use config::{
    FieldRenames, FilterConfig, FormatterConfig, LoggingConfig, SinkConfig, SinkKind, open_sink,
    parse_level, parse_level_filter,
};
pub use dispatcher::{Dispatcher, Handler};
pub use error::{FormatError, LogConfigError};
pub use event::{Extras, LogEvent, level_name, level_number};
pub use filter::SeverityFilter;
pub use formatter::{BUILTIN_ATTRIBUTES, StructuredFormatter, acting_user};
pub use logger::{EventBuilder, Logger};
pub use sink::{MemorySink, RotatingFileSink, Sink, StreamSink};

/// Name of the logging channel used when a configuration does not name one.
pub const LOGGER_NAME: &str = "data_connections";
