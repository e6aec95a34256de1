//! Connections to tabular data sources.
//!
//! A [`Connection`] gives callers one way to preview, fetch and validate
//! data wherever it lives. Each connection carries a purpose, a [`Logger`]
//! and a [`Cache`] that either holds the last fetched [`Table`] in memory or
//! persists it to disk for reuse by later connections and processes.
//!
//! [`Logger`]: datavirt_log::Logger
#![forbid(unsafe_code)]

mod cache;
mod connection;
mod table;
mod validation;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cache::{
    CACHE_MAGIC, CACHE_VERSION, Cache, CacheError, CacheMode, DEFAULT_CACHE_PATH,
    decode_artefact, encode_artefact,
};
pub use connection::{
    Connection, ConnectionBase, ConnectionError, ConnectionOptions, PREVIEW_ROWS, StubConnection,
};
pub use table::{Column, ColumnData, DataType, Field, Row, Scalar, Table, TableError};
pub use validation::Validation;
