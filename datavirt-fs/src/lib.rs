//! Shared filesystem helpers built on `cap-std` and `camino`.
//!
//! The persisted connection cache and the rotating log sink both work with
//! plain UTF-8 paths relative to the working directory, so every helper here
//! accepts a bare file name (`cached_values.bin`) as readily as an absolute
//! path.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io::{self, Read, Write};
use std::path::Component;

/// File handle returned by the helpers in this crate.
pub type Utf8File = fs_utf8::File;

/// Open a UTF-8 file path for reading using ambient authority.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<Utf8File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Read the full contents of `path`.
pub fn read_file(path: &Utf8Path) -> io::Result<Vec<u8>> {
    let mut file = open_utf8_file(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Return the directory holding `path`, treating a bare file name as `.`.
#[must_use]
pub fn parent_or_current(path: &Utf8Path) -> &Utf8Path {
    path.parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."))
}

/// Resolve an ambient directory for the given path and return the directory with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = parent_or_current(path);
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Ensure the parent directory for `path` exists, handling absolute paths safely for cap-std.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base_dir, relative) = base_dir_and_relative(parent)?;
    if relative.as_os_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)?;
    Ok(())
}

/// Return whether a path exists and is a regular file.
///
/// A missing file or a missing parent directory both report `false`; only
/// genuine I/O failures such as permission errors are returned.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = match open_dir_and_file(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Return the size of the file at `path`, or zero when it does not exist.
pub fn file_len(path: &Utf8Path) -> io::Result<u64> {
    let (dir, name) = match open_dir_and_file(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) => Ok(meta.len()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(err) => Err(err),
    }
}

/// Replace the contents of `path` with `bytes` in a single rename.
///
/// The payload is written to a temporary file in the destination directory,
/// synced, then renamed over `path`. Readers observe either the previous
/// file or the complete new one.
pub fn write_atomically(path: &Utf8Path, bytes: &[u8]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let mut staging = tempfile::NamedTempFile::new_in(parent_or_current(path))?;
    staging.write_all(bytes)?;
    staging.as_file().sync_all()?;
    staging.persist(path.as_std_path()).map_err(|err| err.error)?;
    Ok(())
}

/// Remove the file at `path`, reporting whether anything was deleted.
pub fn remove_file_if_exists(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = match open_dir_and_file(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.remove_file(name.as_str()) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Open `path` for appending, creating the file and its parent directory when missing.
pub fn open_append(path: &Utf8Path) -> io::Result<Utf8File> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_dir_and_file(path)?;
    let mut options = fs_utf8::OpenOptions::new();
    options.create(true).append(true);
    dir.open_with(name.as_str(), &options)
}

/// Rename `from` to `to`. Both paths must share the same parent directory.
pub fn rename_sibling(from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
    if parent_or_current(from) != parent_or_current(to) {
        return Err(io::Error::other("rename target must share the source directory"));
    }
    let (dir, from_name) = open_dir_and_file(from)?;
    let to_name = to
        .file_name()
        .ok_or_else(|| io::Error::other("rename target should include a file name"))?;
    dir.rename(from_name.as_str(), &dir, to_name)
}

/// Split an absolute or relative parent path into an ambient base directory and a relative suffix.
pub fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();

    let (base, relative) = match std_parent.components().next() {
        // Windows absolute path with a drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;

            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_parent.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from parent path"))?
                .to_path_buf();
            (base, relative)
        }
        // Unix-style absolute path.
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_parent.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative = Utf8PathBuf::from_path_buf(relative)
        .map_err(|_| io::Error::other("non-UTF-8 parent path"))?;

    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        (dir, root)
    }

    #[rstest]
    fn bare_file_name_resolves_to_current_dir() {
        assert_eq!(
            parent_or_current(Utf8Path::new("cached_values.bin")),
            Utf8Path::new(".")
        );
        assert_eq!(
            parent_or_current(Utf8Path::new("cache/cached_values.bin")),
            Utf8Path::new("cache")
        );
    }

    #[rstest]
    fn missing_parent_reports_absent_file(temp_root: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = temp_root;
        let path = root.join("nested/missing.bin");
        assert!(!file_is_file(&path).expect("probe missing file"));
        assert_eq!(file_len(&path).expect("length of missing file"), 0);
    }

    #[rstest]
    fn atomic_write_creates_parent_and_replaces_contents(temp_root: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = temp_root;
        let path = root.join("nested/artefact.bin");
        write_atomically(&path, b"first").expect("first write");
        write_atomically(&path, b"second").expect("second write");
        assert!(file_is_file(&path).expect("probe written file"));
        assert_eq!(read_file(&path).expect("read back"), b"second".to_vec());
    }

    #[rstest]
    fn remove_reports_whether_a_file_was_deleted(temp_root: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = temp_root;
        let path = root.join("artefact.bin");
        assert!(!remove_file_if_exists(&path).expect("remove missing file"));
        write_atomically(&path, b"payload").expect("write file");
        assert!(remove_file_if_exists(&path).expect("remove existing file"));
        assert!(!file_is_file(&path).expect("probe removed file"));
    }

    #[rstest]
    fn append_and_rename_stay_in_one_directory(temp_root: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = temp_root;
        let path = root.join("logs/app.jsonl");
        let mut file = open_append(&path).expect("open for append");
        file.write_all(b"line\n").expect("append line");
        drop(file);
        assert_eq!(file_len(&path).expect("length after append"), 5);

        let rotated = root.join("logs/app.jsonl.1");
        rename_sibling(&path, &rotated).expect("rotate file");
        assert!(file_is_file(&rotated).expect("probe rotated file"));
        assert!(!file_is_file(&path).expect("probe original file"));

        let elsewhere = root.join("other/app.jsonl");
        assert!(rename_sibling(&rotated, &elsewhere).is_err());
    }
}
