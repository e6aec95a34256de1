//! The connection contract and the state every connection shares.
//!
//! A concrete data source embeds a [`ConnectionBase`] and implements
//! [`Connection`], overriding whichever of `preview`, `fetch` and `validate`
//! it supports. Anything left alone logs an error and returns an empty
//! result instead of failing, so a half-finished connection can still be
//! explored.
//!
//! `fetch` implementations consult the cache before touching their source:
//!
//! ```
//! use datavirt_core::{Column, Connection, ConnectionBase, ConnectionError, Table};
//!
//! struct Prices {
//!     base: ConnectionBase,
//! }
//!
//! impl Prices {
//!     fn read_source(&self) -> Result<Table, ConnectionError> {
//!         Table::new(vec![Column::new("price", vec![Some(1.5)])])
//!             .map_err(|err| ConnectionError::from_source("Prices", err))
//!     }
//! }
//!
//! impl Connection for Prices {
//!     fn base(&self) -> &ConnectionBase {
//!         &self.base
//!     }
//!
//!     fn base_mut(&mut self) -> &mut ConnectionBase {
//!         &mut self.base
//!     }
//!
//!     fn fetch(&mut self) -> Result<Table, ConnectionError> {
//!         if self.base_mut().cache(None)? {
//!             return Ok(self.base().load_cached_data()?);
//!         }
//!         let data = self.read_source()?;
//!         self.base_mut().cache(Some(&data))?;
//!         Ok(data)
//!     }
//! }
//!
//! # fn main() -> Result<(), ConnectionError> {
//! let mut prices = Prices {
//!     base: ConnectionBase::new(Some("pricing review".to_owned()), Default::default(), Default::default())?,
//! };
//! assert_eq!(prices.fetch()?, prices.fetch()?);
//! assert_eq!(prices.name(), "Prices");
//! # Ok(())
//! # }
//! ```

use std::error::Error as StdError;

use datavirt_log::Logger;
use serde_json::Value;
use thiserror::Error;

use crate::{Cache, CacheError, CacheMode, Table, Validation};

/// Rows returned by a conventional [`Connection::preview`].
pub const PREVIEW_ROWS: usize = 10;

/// Errors raised by connections.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The connection requires a purpose and none was supplied.
    #[error("please provide a purpose for this connection")]
    MissingPurpose,
    /// The cache could not be read or written.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The underlying data source failed.
    #[error("{connection} could not read its source: {source}")]
    Source {
        /// Short name of the failing connection.
        connection: String,
        /// Error reported by the source.
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
}

impl ConnectionError {
    /// Wrap a data-source failure.
    pub fn from_source<E>(connection: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self::Source {
            connection: connection.into(),
            source: source.into(),
        }
    }
}

/// Construction-time settings for a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Refuse to construct without a purpose.
    pub force_purpose: bool,
    /// Cache behaviour, fixed for the connection's lifetime.
    pub cache: CacheMode,
}

impl ConnectionOptions {
    /// Require a purpose.
    #[must_use]
    pub const fn forcing_purpose(mut self) -> Self {
        self.force_purpose = true;
        self
    }

    /// Choose the cache mode.
    #[must_use]
    pub fn with_cache(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }
}

/// Purpose, logger and cache shared by every connection.
#[derive(Debug)]
pub struct ConnectionBase {
    purpose: Option<String>,
    cache: Cache,
    logger: Logger,
}

impl ConnectionBase {
    /// Validate the purpose and set up the cache.
    ///
    /// # Errors
    /// Returns [`ConnectionError::MissingPurpose`] when `options` forces a
    /// purpose and none is given.
    pub fn new(
        purpose: Option<String>,
        options: ConnectionOptions,
        logger: Logger,
    ) -> Result<Self, ConnectionError> {
        if purpose.is_none() && options.force_purpose {
            return Err(ConnectionError::MissingPurpose);
        }
        logger
            .debug("opened connection")
            .extra("purpose", purpose.clone().map_or(Value::Null, Value::String))
            .extra("cache_mode", options.cache.label())
            .emit();
        Ok(Self {
            purpose,
            cache: Cache::new(options.cache),
            logger,
        })
    }

    /// Why the connection was opened.
    #[must_use]
    pub fn purpose(&self) -> Option<&str> {
        self.purpose.as_deref()
    }

    /// Logger for this connection's events.
    #[must_use]
    pub const fn logger(&self) -> &Logger {
        &self.logger
    }

    /// The cache in its current state.
    #[must_use]
    pub const fn cache_state(&self) -> &Cache {
        &self.cache
    }

    /// Probe the cache (`None`) or store `data` in it (`Some`).
    ///
    /// Probing reports whether a table is available. Storing replaces any
    /// cached table and reports `true`.
    ///
    /// # Errors
    /// Returns a [`CacheError`] when the artefact cannot be inspected or
    /// written.
    pub fn cache(&mut self, data: Option<&Table>) -> Result<bool, CacheError> {
        match data {
            None => self.cache.probe(),
            Some(table) => self.cache.store(table).map(|()| true),
        }
    }

    /// Return the cached table.
    ///
    /// # Errors
    /// Returns [`CacheError::Empty`] or [`CacheError::NotFound`] when nothing
    /// is cached, and a read or decode error for unusable artefacts.
    pub fn load_cached_data(&self) -> Result<Table, CacheError> {
        self.cache.load()
    }

    /// Drop the cached table or delete the artefact.
    ///
    /// # Errors
    /// Returns [`CacheError::Remove`] when the artefact cannot be deleted.
    pub fn clear_cache(&mut self) -> Result<(), CacheError> {
        self.cache.clear()
    }

    /// Serve the cached table, or call `retrieve` and cache its result.
    ///
    /// # Errors
    /// Propagates cache failures and any error from `retrieve`; nothing is
    /// cached when `retrieve` fails.
    pub fn fetch_through_cache<F>(&mut self, retrieve: F) -> Result<Table, ConnectionError>
    where
        F: FnOnce() -> Result<Table, ConnectionError>,
    {
        if self.cache(None)? {
            self.logger
                .debug("serving cached table")
                .extra("cache_mode", self.cache.mode().label())
                .emit();
            return Ok(self.load_cached_data()?);
        }
        let data = retrieve()?;
        self.cache(Some(&data))?;
        Ok(data)
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics.rsplit("::").next().unwrap_or(without_generics)
}

fn log_not_implemented(logger: &Logger, operation: &str, connection: &str) {
    logger
        .error(format!(
            "Sorry, the {operation} method has not been implemented on {connection}."
        ))
        .extra("connection", connection)
        .extra("operation", operation)
        .emit();
}

/// A tabular data source.
///
/// Implementers embed a [`ConnectionBase`] and expose it through
/// [`Connection::base`] and [`Connection::base_mut`]. The provided `preview`,
/// `fetch` and `validate` methods log an error naming the connection and
/// return empty results; they never fail.
pub trait Connection {
    /// Shared connection state.
    fn base(&self) -> &ConnectionBase;

    /// Shared connection state, mutably.
    fn base_mut(&mut self) -> &mut ConnectionBase;

    /// Short name of the implementing type.
    fn name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Why the connection was opened.
    fn purpose(&self) -> Option<&str> {
        self.base().purpose()
    }

    /// One-line summary of the connection.
    fn describe(&self) -> String {
        match self.purpose() {
            Some(purpose) => format!(
                "Data connection to {} returns a table. Purpose: {purpose}",
                self.name()
            ),
            None => format!("Data connection to {} returns a table.", self.name()),
        }
    }

    /// A sample of the data, conventionally the first [`PREVIEW_ROWS`] rows.
    /// Previews do not go through the cache.
    ///
    /// # Errors
    /// The provided implementation never fails.
    fn preview(&mut self) -> Result<Table, ConnectionError> {
        log_not_implemented(self.base().logger(), "preview", self.name());
        Ok(Table::empty())
    }

    /// The complete dataset, served from the cache when possible.
    ///
    /// # Errors
    /// The provided implementation never fails.
    fn fetch(&mut self) -> Result<Table, ConnectionError> {
        log_not_implemented(self.base().logger(), "fetch", self.name());
        Ok(Table::empty())
    }

    /// Split `data` into valid and invalid rows.
    fn validate(&self, _data: &Table) -> Validation {
        log_not_implemented(self.base().logger(), "validate", self.name());
        Validation::empty()
    }
}

/// A connection that implements nothing beyond the shared state.
///
/// Every data operation takes the logged, empty-result path.
#[derive(Debug)]
pub struct StubConnection {
    base: ConnectionBase,
}

impl StubConnection {
    /// Open a stub connection.
    ///
    /// # Errors
    /// Returns [`ConnectionError::MissingPurpose`] when `options` forces a
    /// purpose and none is given.
    pub fn new(
        purpose: Option<String>,
        options: ConnectionOptions,
        logger: Logger,
    ) -> Result<Self, ConnectionError> {
        ConnectionBase::new(purpose, options, logger).map(|base| Self { base })
    }
}

impl Connection for StubConnection {
    fn base(&self) -> &ConnectionBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ConnectionBase {
        &mut self.base
    }
}
