//! Facade crate for data connections.
//!
//! This crate re-exports the connection contract and table types from
//! `datavirt-core` together with the structured logger from `datavirt-log`.
//! Test connections are available behind the `test-support` feature.

#![forbid(unsafe_code)]

pub use datavirt_core::{
    Cache, CacheError, CacheMode, Column, ColumnData, Connection, ConnectionBase, ConnectionError,
    ConnectionOptions, DEFAULT_CACHE_PATH, DataType, Field, PREVIEW_ROWS, Row, Scalar,
    StubConnection, Table, TableError, Validation,
};
pub use datavirt_log::{
    LOGGER_NAME, LogConfigError, LogEvent, Logger, LoggingConfig, SeverityFilter,
    StructuredFormatter,
};

#[cfg(feature = "test-support")]
pub use datavirt_core::test_support;
