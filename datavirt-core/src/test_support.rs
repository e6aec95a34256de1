//! Test-only connections used by unit and behaviour tests.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use datavirt_log::Logger;

use crate::{
    Column, Connection, ConnectionBase, ConnectionError, ConnectionOptions, PREVIEW_ROWS, Scalar,
    Table, Validation,
};

/// A small priced-instrument table with `rows` rows.
///
/// Every fifth row has a missing price so validation has something to find.
#[must_use]
pub fn sample_table(rows: usize) -> Table {
    let ids = (0..rows).map(|row| i64::try_from(row).ok()).collect::<Vec<_>>();
    let tickers = (0..rows)
        .map(|row| Some(format!("T{row:03}")))
        .collect::<Vec<_>>();
    let prices = (0..rows)
        .map(|row| (!(row + 1).is_multiple_of(5)).then_some(1.25))
        .collect::<Vec<_>>();
    let listed = (0..rows).map(|row| Some(row.is_multiple_of(2))).collect::<Vec<_>>();
    Table::new(vec![
        Column::new("id", ids),
        Column::new("ticker", tickers),
        Column::new("price", prices),
        Column::new("listed", listed),
    ])
    .unwrap_or_default()
}

/// Report whether no cell in `row` is missing.
#[must_use]
pub fn is_complete(row: &crate::Row<'_>) -> bool {
    row.values().all(|(_, cell)| !cell.is_null())
}

/// Connection serving a fixed table that counts how often it reaches its
/// source.
///
/// Clones of the counter returned by [`CountingConnection::counter`] can be
/// handed to further instances so reads are tallied across connections that
/// share a persisted cache.
#[derive(Debug)]
pub struct CountingConnection {
    base: ConnectionBase,
    data: Table,
    reads: Arc<AtomicUsize>,
}

impl CountingConnection {
    /// Open a connection serving `data`.
    ///
    /// # Errors
    /// Returns [`ConnectionError::MissingPurpose`] when `options` forces a
    /// purpose and none is given.
    pub fn new(
        data: Table,
        purpose: Option<String>,
        options: ConnectionOptions,
        logger: Logger,
    ) -> Result<Self, ConnectionError> {
        Ok(Self {
            base: ConnectionBase::new(purpose, options, logger)?,
            data,
            reads: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Share `reads` with other instances.
    #[must_use]
    pub fn with_counter(mut self, reads: Arc<AtomicUsize>) -> Self {
        self.reads = reads;
        self
    }

    /// The shared read counter.
    #[must_use]
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }

    /// Number of times the source has been read.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn read_source(&self) -> Table {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.data.clone()
    }
}

impl Connection for CountingConnection {
    fn base(&self) -> &ConnectionBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ConnectionBase {
        &mut self.base
    }

    fn preview(&mut self) -> Result<Table, ConnectionError> {
        Ok(self.data.head(PREVIEW_ROWS))
    }

    fn fetch(&mut self) -> Result<Table, ConnectionError> {
        if self.base_mut().cache(None)? {
            return Ok(self.base().load_cached_data()?);
        }
        let data = self.read_source();
        self.base_mut().cache(Some(&data))?;
        Ok(data)
    }

    fn validate(&self, data: &Table) -> Validation {
        let outcome = Validation::partition(data, is_complete);
        outcome.log_findings(self.base().logger(), self.name());
        outcome
    }
}

/// Connection whose source fails a set number of times before succeeding.
#[derive(Debug)]
pub struct FlakyConnection {
    base: ConnectionBase,
    failures_left: usize,
}

impl FlakyConnection {
    /// Open a connection that fails its first `failures` fetches.
    ///
    /// # Errors
    /// Returns [`ConnectionError::MissingPurpose`] when `options` forces a
    /// purpose and none is given.
    pub fn new(
        failures: usize,
        options: ConnectionOptions,
        logger: Logger,
    ) -> Result<Self, ConnectionError> {
        Ok(Self {
            base: ConnectionBase::new(Some("exercise source failures".to_owned()), options, logger)?,
            failures_left: failures,
        })
    }
}

impl Connection for FlakyConnection {
    fn base(&self) -> &ConnectionBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ConnectionBase {
        &mut self.base
    }

    fn fetch(&mut self) -> Result<Table, ConnectionError> {
        let name = self.name();
        let failures_left = &mut self.failures_left;
        self.base.fetch_through_cache(|| {
            if *failures_left > 0 {
                *failures_left -= 1;
                return Err(ConnectionError::from_source(
                    name,
                    io::Error::new(io::ErrorKind::ConnectionRefused, "source unavailable"),
                ));
            }
            Ok(sample_table(3))
        })
    }

    fn validate(&self, data: &Table) -> Validation {
        Validation::partition(data, |row| {
            matches!(row.get("listed"), Some(Scalar::Boolean(true)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheError, CacheMode};
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn artefact() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        (dir, root.join("cached_values.bin"))
    }

    fn counting(options: ConnectionOptions) -> CountingConnection {
        CountingConnection::new(sample_table(12), None, options, Logger::noop())
            .expect("open connection")
    }

    #[rstest]
    fn sample_tables_have_gaps() {
        let table = sample_table(10);
        assert_eq!(table.num_rows(), 10);
        let outcome = Validation::partition(&table, is_complete);
        assert_eq!(outcome.invalid.num_rows(), 2);
    }

    #[rstest]
    fn in_memory_fetch_reads_source_once() {
        let mut connection = counting(ConnectionOptions::default());
        let first = connection.fetch().expect("first fetch");
        let second = connection.fetch().expect("second fetch");
        assert_eq!(first, second);
        assert_eq!(connection.reads(), 1);
    }

    #[rstest]
    fn persisted_fetch_reads_source_once_across_instances(artefact: (TempDir, Utf8PathBuf)) {
        let (_dir, path) = artefact;
        let options = ConnectionOptions::default().with_cache(CacheMode::persisted(path));
        let mut first = counting(options.clone());
        let fetched = first.fetch().expect("first fetch");

        let mut second = counting(options).with_counter(first.counter());
        assert_eq!(second.fetch().expect("second fetch"), fetched);
        assert_eq!(first.reads(), 1);
        assert_eq!(second.reads(), 1);
    }

    #[rstest]
    fn preview_bypasses_the_cache() {
        let mut connection = counting(ConnectionOptions::default());
        assert_eq!(connection.preview().expect("preview").num_rows(), PREVIEW_ROWS);
        assert!(!connection.base_mut().cache(None).expect("probe"));
        assert_eq!(connection.reads(), 0);
    }

    #[rstest]
    fn failed_retrieval_caches_nothing() {
        let mut connection =
            FlakyConnection::new(1, ConnectionOptions::default(), Logger::noop())
                .expect("open connection");
        let err = connection.fetch().expect_err("first fetch fails");
        assert!(matches!(err, ConnectionError::Source { ref connection, .. } if connection == "FlakyConnection"));
        assert!(matches!(
            connection.base().load_cached_data(),
            Err(CacheError::Empty)
        ));
        let table = connection.fetch().expect("second fetch succeeds");
        assert_eq!(connection.fetch().expect("cached fetch"), table);
    }
}
