//! Errors raised by connection caches.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Error raised while probing, storing, loading or clearing a cache.
///
/// Empty caches are not failures for [`Cache::probe`](crate::Cache::probe);
/// only loading from an empty cache reports [`CacheError::NotFound`] or
/// [`CacheError::Empty`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// No artefact exists at the persisted cache path.
    #[error("no cached table at {path}")]
    NotFound {
        /// Location of the expected artefact.
        path: Utf8PathBuf,
    },
    /// The in-memory cache holds no table.
    #[error("the in-memory cache is empty")]
    Empty,
    /// Creating the directory holding the artefact failed.
    #[error("failed to create cache directory for {path}: {source}")]
    CreateParent {
        /// Location of the artefact.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The table could not be encoded.
    #[error("failed to encode cached table for {path}: {source}")]
    Encode {
        /// Location of the artefact.
        path: Utf8PathBuf,
        /// Encoder failure from `bincode`.
        #[source]
        source: bincode::Error,
    },
    /// Writing the artefact into place failed.
    #[error("failed to write cached table to {path}: {source}")]
    Persist {
        /// Location of the artefact.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Reading the artefact failed.
    #[error("failed to read cached table from {path}: {source}")]
    Read {
        /// Location of the artefact.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file did not start with the cache header.
    #[error("{path} is not a cached table: expected magic {expected:?}, found {found:?}")]
    InvalidMagic {
        /// Location of the artefact.
        path: Utf8PathBuf,
        /// Expected byte sequence identifying a cache artefact.
        expected: [u8; 4],
        /// Sequence read from the file.
        found: [u8; 4],
    },
    /// The artefact was written by an incompatible format version.
    #[error("unsupported cache version {found} in {path}; supported version is {supported}")]
    UnsupportedVersion {
        /// Location of the artefact.
        path: Utf8PathBuf,
        /// Version present in the file header.
        found: u16,
        /// Version written by this build.
        supported: u16,
    },
    /// The artefact body could not be decoded.
    #[error("failed to decode cached table from {path}: {source}")]
    Decode {
        /// Location of the artefact.
        path: Utf8PathBuf,
        /// Decoder error returned by `bincode`.
        #[source]
        source: bincode::Error,
    },
    /// Deleting the artefact failed.
    #[error("failed to remove cached table at {path}: {source}")]
    Remove {
        /// Location of the artefact.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
