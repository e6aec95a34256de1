//! Two-mode table cache owned by each connection.
//!
//! A cache either holds a table in memory for the lifetime of its
//! connection or points at an artefact on disk that survives the process.
//! The mode is fixed when the cache is created.

mod error;
mod persisted;

use camino::{Utf8Path, Utf8PathBuf};

pub use error::CacheError;
pub use persisted::{CACHE_MAGIC, CACHE_VERSION, decode_artefact, encode_artefact};

use crate::Table;

/// Artefact location used when a persisted cache does not name one.
pub const DEFAULT_CACHE_PATH: &str = "cached_values.bin";

/// Construction-time choice of cache behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Hold the table in memory.
    #[default]
    InMemory,
    /// Serialise the table to an artefact at `path`.
    Persisted {
        /// Artefact location, relative to the working directory unless absolute.
        path: Utf8PathBuf,
    },
}

impl CacheMode {
    /// Persist to `path`.
    pub fn persisted(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Persisted { path: path.into() }
    }

    /// Persist to [`DEFAULT_CACHE_PATH`].
    #[must_use]
    pub fn persisted_default() -> Self {
        Self::persisted(DEFAULT_CACHE_PATH)
    }

    /// Short label used in log events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InMemory => "in_memory",
            Self::Persisted { .. } => "persisted",
        }
    }
}

/// A connection's cache.
///
/// # Examples
///
/// ```
/// use datavirt_core::{Cache, CacheMode, Column, Table};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut cache = Cache::new(CacheMode::InMemory);
/// assert!(!cache.probe()?);
/// let table = Table::new(vec![Column::new("id", vec![Some(1_i64)])])?;
/// cache.store(&table)?;
/// assert!(cache.probe()?);
/// assert_eq!(cache.load()?, table);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Cache {
    /// Table held by the owning connection.
    InMemory {
        /// The cached table, if one has been stored.
        value: Option<Table>,
    },
    /// Artefact on disk, shared by every connection using the same path.
    Persisted {
        /// Artefact location.
        path: Utf8PathBuf,
    },
}

impl Cache {
    /// Create an empty cache in the given mode.
    #[must_use]
    pub fn new(mode: CacheMode) -> Self {
        match mode {
            CacheMode::InMemory => Self::InMemory { value: None },
            CacheMode::Persisted { path } => Self::Persisted { path },
        }
    }

    /// The mode this cache was created with.
    #[must_use]
    pub fn mode(&self) -> CacheMode {
        match self {
            Self::InMemory { .. } => CacheMode::InMemory,
            Self::Persisted { path } => CacheMode::Persisted { path: path.clone() },
        }
    }

    /// Artefact location for persisted caches.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            Self::InMemory { .. } => None,
            Self::Persisted { path } => Some(path),
        }
    }

    /// Report whether a table is available.
    ///
    /// # Errors
    /// Returns [`CacheError::Read`] when the artefact's presence cannot be
    /// determined.
    pub fn probe(&self) -> Result<bool, CacheError> {
        match self {
            Self::InMemory { value } => Ok(value.is_some()),
            Self::Persisted { path } => persisted::exists(path),
        }
    }

    /// Replace the cached table with a copy of `data`.
    ///
    /// # Errors
    /// Returns a [`CacheError`] when the artefact cannot be written.
    pub fn store(&mut self, data: &Table) -> Result<(), CacheError> {
        match self {
            Self::InMemory { value } => {
                *value = Some(data.clone());
                Ok(())
            }
            Self::Persisted { path } => persisted::write(path, data),
        }
    }

    /// Return a copy of the cached table.
    ///
    /// # Errors
    /// Returns [`CacheError::Empty`] or [`CacheError::NotFound`] when nothing
    /// is cached, and a read or decode error for unusable artefacts.
    pub fn load(&self) -> Result<Table, CacheError> {
        match self {
            Self::InMemory { value } => value.clone().ok_or(CacheError::Empty),
            Self::Persisted { path } => persisted::read(path),
        }
    }

    /// Drop the cached table. Clearing an empty cache is not an error.
    ///
    /// # Errors
    /// Returns [`CacheError::Remove`] when the artefact cannot be deleted.
    pub fn clear(&mut self) -> Result<(), CacheError> {
        match self {
            Self::InMemory { value } => {
                *value = None;
                Ok(())
            }
            Self::Persisted { path } => persisted::remove(path).map(|_| ()),
        }
    }
}
