//! Size-based rotating file sink.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use datavirt_fs::{
    Utf8File, file_is_file, file_len, open_append, remove_file_if_exists, rename_sibling,
};

use super::Sink;

/// Appends records to a file, rolling it over once it grows past a size limit.
///
/// On rollover `app.jsonl` becomes `app.jsonl.1`, the previous `.1` becomes
/// `.2` and so on up to `backup_count`; the oldest backup is discarded.
/// Rotation is disabled when either `max_bytes` or `backup_count` is zero,
/// in which case the file grows without bound.
#[derive(Debug)]
pub struct RotatingFileSink {
    path: Utf8PathBuf,
    max_bytes: u64,
    backup_count: u32,
    file: Option<Utf8File>,
    written: u64,
}

impl RotatingFileSink {
    /// Open (or create) the log file at `path`, creating parent directories.
    ///
    /// # Errors
    /// Returns the underlying I/O error when the file cannot be opened.
    pub fn open(
        path: impl Into<Utf8PathBuf>,
        max_bytes: u64,
        backup_count: u32,
    ) -> io::Result<Self> {
        let target: Utf8PathBuf = path.into();
        let file = open_append(&target)?;
        let written = file_len(&target)?;
        Ok(Self {
            path: target,
            max_bytes,
            backup_count,
            file: Some(file),
            written,
        })
    }

    /// Location of the active log file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Location of the `index`-th backup.
    #[must_use]
    pub fn backup_path(&self, index: u32) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.{index}", self.path))
    }

    const fn rotation_enabled(&self) -> bool {
        self.max_bytes > 0 && self.backup_count > 0
    }

    fn should_roll_over(&self, incoming: u64) -> bool {
        self.rotation_enabled()
            && self.written > 0
            && self.written.saturating_add(incoming) > self.max_bytes
    }

    fn roll_over(&mut self) -> io::Result<()> {
        self.file = None;
        for index in (1..self.backup_count).rev() {
            let source = self.backup_path(index);
            if file_is_file(&source)? {
                let target = self.backup_path(index + 1);
                remove_file_if_exists(&target)?;
                rename_sibling(&source, &target)?;
            }
        }
        let first = self.backup_path(1);
        remove_file_if_exists(&first)?;
        if file_is_file(&self.path)? {
            rename_sibling(&self.path, &first)?;
        }
        self.file = Some(open_append(&self.path)?);
        self.written = 0;
        Ok(())
    }

    fn active_file(&mut self) -> io::Result<&mut Utf8File> {
        if self.file.is_none() {
            self.file = Some(open_append(&self.path)?);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file is not open"))
    }
}

impl Sink for RotatingFileSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let incoming = u64::try_from(line.len())
            .unwrap_or(u64::MAX)
            .saturating_add(1);
        if self.should_roll_over(incoming) {
            self.roll_over()?;
        }
        let file = self.active_file()?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        self.written = self.written.saturating_add(incoming);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
