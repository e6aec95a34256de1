//! Error types raised while rendering events or configuring the logger.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while rendering a [`LogEvent`](crate::LogEvent).
#[derive(Debug, Error)]
pub enum FormatError {
    /// A rename entry referenced a field the event does not carry.
    #[error("log record has no field named {field:?}")]
    UnknownField {
        /// Source field name taken from the rename mapping.
        field: String,
    },
    /// The assembled record could not be encoded as JSON.
    #[error("failed to serialise log record")]
    Serialise(#[source] serde_json::Error),
}

/// Errors raised while loading the logging configuration or building sinks.
///
/// Any of these is fatal to logger setup; connections keep working with
/// [`Logger::noop`](crate::Logger::noop).
#[derive(Debug, Error)]
pub enum LogConfigError {
    /// Reading the configuration file failed.
    #[error("failed to read logging configuration at {path}")]
    Read {
        /// Requested configuration path.
        path: Utf8PathBuf,
        /// Source error from std I/O.
        #[source]
        source: std::io::Error,
    },
    /// The configuration was not valid JSON or did not match the schema.
    #[error("failed to parse logging configuration")]
    Parse(#[source] serde_json::Error),
    /// A level name was not recognised.
    #[error("unknown log level {value:?}")]
    UnknownLevel {
        /// Offending level name.
        value: String,
    },
    /// A sink referenced a filter that is not defined.
    #[error("sink {sink:?} references undefined filter {filter:?}")]
    UnknownFilter {
        /// Name of the referencing sink.
        sink: String,
        /// Name of the missing filter.
        filter: String,
    },
    /// A file sink was declared without a path.
    #[error("sink {sink:?} requires a path")]
    MissingPath {
        /// Name of the sink.
        sink: String,
    },
    /// Opening a file sink failed.
    #[error("failed to open log file {path} for sink {sink:?}")]
    OpenSink {
        /// Name of the sink.
        sink: String,
        /// Target log file.
        path: Utf8PathBuf,
        /// Source error from std I/O.
        #[source]
        source: std::io::Error,
    },
}
