//! Behavioural coverage for the connection contract: purpose handling, the
//! unimplemented defaults, the cache-aware fetch idiom and validation.

use std::cell::RefCell;

use camino::Utf8PathBuf;
use datavirt_core::test_support::{CountingConnection, sample_table};
use datavirt::{
    CacheMode, Connection, ConnectionError, ConnectionOptions, Logger, StubConnection, Table,
    Validation,
};
use datavirt_log::{Dispatcher, Handler, MemorySink, StructuredFormatter};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

/// Scenario state.
#[derive(Debug, Default)]
struct ContractWorld {
    logger: RefCell<Logger>,
    sink: RefCell<Option<MemorySink>>,
    options: RefCell<ConnectionOptions>,
    dir: RefCell<Option<TempDir>>,
    opened: RefCell<Option<Result<StubConnection, ConnectionError>>>,
    stub_results: RefCell<Vec<Table>>,
    counting: RefCell<Option<CountingConnection>>,
    fetched: RefCell<Vec<Table>>,
    validation: RefCell<Option<Validation>>,
}

#[fixture]
fn world() -> ContractWorld {
    ContractWorld::default()
}

impl ContractWorld {
    fn open_stub(&self, purpose: Option<String>) {
        let options = self.options.borrow().clone();
        let logger = self.logger.borrow().clone();
        self.opened
            .replace(Some(StubConnection::new(purpose, options, logger)));
    }

    fn open_counting(&self) -> CountingConnection {
        let options = self.options.borrow().clone();
        let logger = self.logger.borrow().clone();
        CountingConnection::new(sample_table(10), None, options, logger)
            .unwrap_or_else(|err| panic!("open counting connection: {err}"))
    }

    fn with_counting<T>(&self, action: impl FnOnce(&mut CountingConnection) -> T) -> T {
        let mut binding = self.counting.borrow_mut();
        let connection = binding
            .as_mut()
            .unwrap_or_else(|| panic!("counting connection must be opened"));
        action(connection)
    }

    fn records(&self) -> Vec<serde_json::Value> {
        self.sink
            .borrow()
            .as_ref()
            .map(MemorySink::records)
            .unwrap_or_default()
    }
}

#[given("connection options that force a purpose")]
fn forced_purpose(world: &ContractWorld) {
    world
        .options
        .replace(ConnectionOptions::default().forcing_purpose());
}

#[given("a captured logger")]
fn captured_logger(world: &ContractWorld) {
    let sink = MemorySink::new();
    let dispatcher = Dispatcher::new("data_connections", StructuredFormatter::default())
        .with_handler(Handler::new("memory", Box::new(sink.clone())));
    world.logger.replace(Logger::new(dispatcher));
    world.sink.replace(Some(sink));
}

#[given("a counting connection with an in-memory cache")]
fn counting_in_memory(world: &ContractWorld) {
    world
        .options
        .replace(ConnectionOptions::default().with_cache(CacheMode::InMemory));
    let connection = world.open_counting();
    world.counting.replace(Some(connection));
}

#[given("a counting connection with a persisted cache")]
fn counting_persisted(world: &ContractWorld) {
    let dir = TempDir::new().unwrap_or_else(|err| panic!("create temp dir: {err}"));
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .unwrap_or_else(|path| panic!("non-UTF-8 temp dir {}", path.display()));
    world.options.replace(
        ConnectionOptions::default()
            .with_cache(CacheMode::persisted(root.join("cached_values.bin"))),
    );
    world.dir.replace(Some(dir));
    let connection = world.open_counting();
    world.counting.replace(Some(connection));
}

#[when("a stub connection is opened without a purpose")]
fn open_without_purpose(world: &ContractWorld) {
    world.open_stub(None);
}

#[when("a stub connection is opened with purpose {purpose}")]
fn open_with_purpose(world: &ContractWorld, purpose: String) {
    world.open_stub(Some(purpose.trim_matches('"').to_owned()));
}

#[when("preview, fetch and validate are called on the stub")]
fn call_stub_operations(world: &ContractWorld) {
    let mut binding = world.opened.borrow_mut();
    let stub = match binding.as_mut() {
        Some(Ok(stub)) => stub,
        Some(Err(err)) => panic!("stub failed to open: {err}"),
        None => panic!("stub must be opened"),
    };
    let preview = stub
        .preview()
        .unwrap_or_else(|err| panic!("preview: {err}"));
    let fetched = stub.fetch().unwrap_or_else(|err| panic!("fetch: {err}"));
    let validation = stub.validate(&fetched);
    world.stub_results.replace(vec![
        preview,
        fetched,
        validation.valid,
        validation.invalid,
    ]);
}

#[when("the connection fetches {count} times")]
fn connection_fetches(world: &ContractWorld, count: usize) {
    for _ in 0..count {
        let table = world
            .with_counting(|connection| connection.fetch())
            .unwrap_or_else(|err| panic!("fetch: {err}"));
        world.fetched.borrow_mut().push(table);
    }
}

#[when("a second counting connection on the same artefact fetches")]
fn second_connection_fetches(world: &ContractWorld) {
    let counter = world.with_counting(|connection| connection.counter());
    let mut second = world.open_counting().with_counter(counter);
    let table = second
        .fetch()
        .unwrap_or_else(|err| panic!("second fetch: {err}"));
    world.fetched.borrow_mut().push(table);
}

#[when("the fetched data is validated")]
fn fetched_data_is_validated(world: &ContractWorld) {
    let data = world
        .fetched
        .borrow()
        .last()
        .cloned()
        .unwrap_or_else(|| panic!("data must be fetched first"));
    let outcome = world.with_counting(|connection| connection.validate(&data));
    world.validation.replace(Some(outcome));
}

#[then("opening fails because the purpose is missing")]
fn opening_fails(world: &ContractWorld) {
    let binding = world.opened.borrow();
    assert!(
        matches!(binding.as_ref(), Some(Err(ConnectionError::MissingPurpose))),
        "expected a missing purpose error, got {binding:?}"
    );
}

#[then("the connection purpose is {expected}")]
fn purpose_is(world: &ContractWorld, expected: String) {
    let binding = world.opened.borrow();
    let Some(Ok(stub)) = binding.as_ref() else {
        panic!("stub should have opened, got {binding:?}");
    };
    assert_eq!(stub.purpose(), Some(expected.trim_matches('"')));
}

#[then("every stub result is empty")]
fn stub_results_empty(world: &ContractWorld) {
    let results = world.stub_results.borrow();
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|table| *table == Table::empty()));
}

#[then("{count} errors were logged naming {connection}")]
fn errors_logged(world: &ContractWorld, count: usize, connection: String) {
    let errors: Vec<_> = world
        .records()
        .into_iter()
        .filter(|record| record["connection"] == connection.as_str())
        .filter(|record| {
            record["message"]
                .as_str()
                .is_some_and(|message| message.starts_with("Sorry, the "))
        })
        .collect();
    assert_eq!(errors.len(), count);
}

#[then("the source was read {count} times")]
fn source_read(world: &ContractWorld, count: usize) {
    assert_eq!(world.with_counting(|connection| connection.reads()), count);
}

#[then("every fetch returned the same table")]
fn fetches_agree(world: &ContractWorld) {
    let fetched = world.fetched.borrow();
    let first = fetched
        .first()
        .unwrap_or_else(|| panic!("at least one fetch"));
    assert!(fetched.iter().all(|table| table == first));
}

#[then("the validation covers the fetched rows")]
fn validation_covers(world: &ContractWorld) {
    let binding = world.validation.borrow();
    let outcome = binding
        .as_ref()
        .unwrap_or_else(|| panic!("validation must have run"));
    let total = world
        .fetched
        .borrow()
        .last()
        .map_or(0, Table::num_rows);
    assert_eq!(outcome.total_rows(), total);
    assert_eq!(outcome.invalid.num_rows(), 2);
}

#[then("an info event reports {message}")]
fn info_event_reports(world: &ContractWorld, message: String) {
    let found = world.records().into_iter().any(|record| {
        record["message"] == message.as_str() && record["valid_rows"] == 8
    });
    assert!(found, "no validation event with message {message:?}");
}

#[scenario(path = "tests/features/connection.feature", index = 0)]
fn forced_purpose_must_be_supplied(world: ContractWorld) {
    let _ = (world,);
}

#[scenario(path = "tests/features/connection.feature", index = 1)]
fn supplied_purpose_is_kept(world: ContractWorld) {
    let _ = (world,);
}

#[scenario(path = "tests/features/connection.feature", index = 2)]
fn unimplemented_operations_are_logged(world: ContractWorld) {
    let _ = (world,);
}

#[scenario(path = "tests/features/connection.feature", index = 3)]
fn repeated_fetches_read_once(world: ContractWorld) {
    let _ = (world,);
}

#[scenario(path = "tests/features/connection.feature", index = 4)]
fn persisted_cache_serves_later_connections(world: ContractWorld) {
    let _ = (world,);
}

#[scenario(path = "tests/features/connection.feature", index = 5)]
fn validation_findings_are_logged(world: ContractWorld) {
    let _ = (world,);
}
