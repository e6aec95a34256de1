//! On-disk cache artefacts.
//!
//! An artefact is the `bincode` encoding of a small header (a four byte
//! magic and a format version) followed by the cached [`Table`]. The header
//! is checked before the body is decoded so foreign files and files from a
//! newer format are reported precisely.

use std::io;

use camino::Utf8Path;
use datavirt_fs::{ensure_parent_dir, file_is_file, read_file, remove_file_if_exists, write_atomically};
use serde::{Deserialize, Serialize};

use super::CacheError;
use crate::Table;

/// Byte sequence opening every cache artefact.
pub const CACHE_MAGIC: [u8; 4] = *b"DVCT";

/// Artefact format version written by this build.
pub const CACHE_VERSION: u16 = 1;

#[derive(Debug, Deserialize)]
struct Header {
    magic: [u8; 4],
    version: u16,
}

#[derive(Debug, Serialize)]
struct CacheFileRef<'a> {
    magic: [u8; 4],
    version: u16,
    table: &'a Table,
}

/// Encode `table` as a complete artefact.
///
/// # Errors
/// Returns the `bincode` error when the table cannot be encoded.
pub fn encode_artefact(table: &Table) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(&CacheFileRef {
        magic: CACHE_MAGIC,
        version: CACHE_VERSION,
        table,
    })
}

/// Decode an artefact previously produced by [`encode_artefact`].
///
/// `path` is only used to label errors.
///
/// # Errors
/// Returns [`CacheError::InvalidMagic`] for foreign data,
/// [`CacheError::UnsupportedVersion`] for other format versions and
/// [`CacheError::Decode`] when an artefact with the right magic is truncated
/// or its body is malformed.
pub fn decode_artefact(path: &Utf8Path, bytes: &[u8]) -> Result<Table, CacheError> {
    let header: Header = bincode::deserialize(bytes).map_err(|source| {
        let found = leading_bytes(bytes);
        if found == CACHE_MAGIC {
            CacheError::Decode {
                path: path.to_path_buf(),
                source,
            }
        } else {
            CacheError::InvalidMagic {
                path: path.to_path_buf(),
                expected: CACHE_MAGIC,
                found,
            }
        }
    })?;
    if header.magic != CACHE_MAGIC {
        return Err(CacheError::InvalidMagic {
            path: path.to_path_buf(),
            expected: CACHE_MAGIC,
            found: header.magic,
        });
    }
    if header.version != CACHE_VERSION {
        return Err(CacheError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: header.version,
            supported: CACHE_VERSION,
        });
    }
    let (_, table): (Header, Table) =
        bincode::deserialize(bytes).map_err(|source| CacheError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(table)
}

fn leading_bytes(bytes: &[u8]) -> [u8; 4] {
    let mut found = [0_u8; 4];
    for (slot, byte) in found.iter_mut().zip(bytes) {
        *slot = *byte;
    }
    found
}

pub(super) fn exists(path: &Utf8Path) -> Result<bool, CacheError> {
    file_is_file(path).map_err(|source| CacheError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub(super) fn write(path: &Utf8Path, table: &Table) -> Result<(), CacheError> {
    ensure_parent_dir(path).map_err(|source| CacheError::CreateParent {
        path: path.to_path_buf(),
        source,
    })?;
    let bytes = encode_artefact(table).map_err(|source| CacheError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomically(path, &bytes).map_err(|source| CacheError::Persist {
        path: path.to_path_buf(),
        source,
    })
}

pub(super) fn read(path: &Utf8Path) -> Result<Table, CacheError> {
    let bytes = read_file(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => CacheError::NotFound {
            path: path.to_path_buf(),
        },
        _ => CacheError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;
    decode_artefact(path, &bytes)
}

pub(super) fn remove(path: &Utf8Path) -> Result<bool, CacheError> {
    remove_file_if_exists(path).map_err(|source| CacheError::Remove {
        path: path.to_path_buf(),
        source,
    })
}
