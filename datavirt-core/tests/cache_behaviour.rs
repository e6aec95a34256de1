//! Behavioural coverage for the connection cache in both modes.

use std::cell::RefCell;

use camino::Utf8PathBuf;
use datavirt_core::{
    CacheError, CacheMode, Column, Connection, ConnectionBase, ConnectionOptions, Table,
};
use datavirt_log::Logger;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

/// A connection with no source of its own; scenarios drive its cache.
#[derive(Debug)]
struct LedgerConnection {
    base: ConnectionBase,
}

impl LedgerConnection {
    fn open(cache: CacheMode) -> Self {
        let options = ConnectionOptions::default().with_cache(cache);
        let base = ConnectionBase::new(Some("cache scenarios".to_owned()), options, Logger::noop())
            .unwrap_or_else(|err| panic!("open connection: {err}"));
        Self { base }
    }
}

impl Connection for LedgerConnection {
    fn base(&self) -> &ConnectionBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ConnectionBase {
        &mut self.base
    }
}

/// Scenario state.
#[derive(Debug, Default)]
struct CacheWorld {
    dir: RefCell<Option<TempDir>>,
    artefact: RefCell<Option<Utf8PathBuf>>,
    connection: RefCell<Option<LedgerConnection>>,
    second: RefCell<Option<LedgerConnection>>,
    stored: RefCell<Option<Table>>,
}

#[fixture]
fn world() -> CacheWorld {
    CacheWorld::default()
}

fn ledger(rows: usize) -> Table {
    let amounts = (0..rows)
        .map(|row| i64::try_from(row).ok().map(|value| value * 100))
        .collect::<Vec<_>>();
    let memos = (0..rows)
        .map(|row| Some(format!("entry {row}")))
        .collect::<Vec<_>>();
    Table::new(vec![
        Column::new("amount", amounts),
        Column::new("memo", memos),
    ])
    .unwrap_or_else(|err| panic!("build ledger: {err}"))
}

impl CacheWorld {
    fn with_connection<T>(&self, action: impl FnOnce(&mut LedgerConnection) -> T) -> T {
        let mut binding = self.connection.borrow_mut();
        let connection = binding
            .as_mut()
            .unwrap_or_else(|| panic!("connection must be opened"));
        action(connection)
    }

    fn stored(&self) -> Table {
        self.stored
            .borrow()
            .clone()
            .unwrap_or_else(|| panic!("a table must have been stored"))
    }
}

#[given("an in-memory connection")]
fn in_memory_connection(world: &CacheWorld) {
    world
        .connection
        .replace(Some(LedgerConnection::open(CacheMode::InMemory)));
}

#[given("a persisted connection in a temporary directory")]
fn persisted_connection(world: &CacheWorld) {
    let dir = TempDir::new().unwrap_or_else(|err| panic!("create temp dir: {err}"));
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .unwrap_or_else(|path| panic!("non-UTF-8 temp dir {}", path.display()));
    let artefact = root.join("cache/cached_values.bin");
    world
        .connection
        .replace(Some(LedgerConnection::open(CacheMode::persisted(artefact.clone()))));
    world.artefact.replace(Some(artefact));
    world.dir.replace(Some(dir));
}

#[when("a table of {rows} rows is cached")]
fn table_is_cached(world: &CacheWorld, rows: usize) {
    let table = ledger(rows);
    let stored = world
        .with_connection(|connection| connection.base_mut().cache(Some(&table)))
        .unwrap_or_else(|err| panic!("store table: {err}"));
    assert!(stored);
    world.stored.replace(Some(table));
}

#[when("a second connection opens the same artefact")]
fn second_connection(world: &CacheWorld) {
    let artefact = world
        .artefact
        .borrow()
        .clone()
        .unwrap_or_else(|| panic!("artefact path must be set"));
    world
        .second
        .replace(Some(LedgerConnection::open(CacheMode::persisted(artefact))));
}

#[when("the cache is cleared")]
fn cache_is_cleared(world: &CacheWorld) {
    world
        .with_connection(|connection| connection.base_mut().clear_cache())
        .unwrap_or_else(|err| panic!("clear cache: {err}"));
}

#[then("probing the cache reports {expected}")]
fn probe_reports(world: &CacheWorld, expected: bool) {
    let found = world
        .with_connection(|connection| connection.base_mut().cache(None))
        .unwrap_or_else(|err| panic!("probe cache: {err}"));
    assert_eq!(found, expected);
}

#[then("loading the cache returns the stored table")]
fn load_returns_stored(world: &CacheWorld) {
    let loaded = world
        .with_connection(|connection| connection.base().load_cached_data())
        .unwrap_or_else(|err| panic!("load cache: {err}"));
    assert_eq!(loaded, world.stored());
}

#[then("the stored table has {rows} rows")]
fn stored_table_has_rows(world: &CacheWorld, rows: usize) {
    assert_eq!(world.stored().num_rows(), rows);
}

#[then("loading the cache fails because nothing was found")]
fn load_fails_not_found(world: &CacheWorld) {
    let result = world.with_connection(|connection| connection.base().load_cached_data());
    assert!(
        matches!(result, Err(CacheError::NotFound { .. })),
        "expected NotFound, got {result:?}"
    );
}

#[then("loading the cache fails because it is empty")]
fn load_fails_empty(world: &CacheWorld) {
    let result = world.with_connection(|connection| connection.base().load_cached_data());
    assert!(
        matches!(result, Err(CacheError::Empty)),
        "expected Empty, got {result:?}"
    );
}

#[then("the second connection probes true")]
fn second_probes_true(world: &CacheWorld) {
    let mut binding = world.second.borrow_mut();
    let second = binding
        .as_mut()
        .unwrap_or_else(|| panic!("second connection must be opened"));
    assert!(
        second
            .base_mut()
            .cache(None)
            .unwrap_or_else(|err| panic!("probe cache: {err}"))
    );
}

#[then("the second connection loads the stored table")]
fn second_loads_stored(world: &CacheWorld) {
    let binding = world.second.borrow();
    let second = binding
        .as_ref()
        .unwrap_or_else(|| panic!("second connection must be opened"));
    let loaded = second
        .base()
        .load_cached_data()
        .unwrap_or_else(|err| panic!("load cache: {err}"));
    assert_eq!(loaded, world.stored());
}

#[scenario(path = "tests/features/cache.feature", index = 0)]
fn in_memory_cache_round_trip(world: CacheWorld) {
    let _ = (world,);
}

#[scenario(path = "tests/features/cache.feature", index = 1)]
fn persisted_cache_is_shared(world: CacheWorld) {
    let _ = (world,);
}

#[scenario(path = "tests/features/cache.feature", index = 2)]
fn absent_artefact_is_not_found(world: CacheWorld) {
    let _ = (world,);
}

#[scenario(path = "tests/features/cache.feature", index = 3)]
fn persisted_store_overwrites(world: CacheWorld) {
    let _ = (world,);
}

#[scenario(path = "tests/features/cache.feature", index = 4)]
fn clearing_empties_in_memory_cache(world: CacheWorld) {
    let _ = (world,);
}
