//! Log events as produced at the call site.

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::panic::Location;

use chrono::{DateTime, Utc};
use log::Level;
use serde::Serialize;
use serde_json::{Map, Value};

/// Return the conventional upper-case name for `level`.
///
/// `Warn` renders as `WARNING` so structured output lines up with the level
/// names operators already filter on.
#[must_use]
pub const fn level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Return the numeric severity of `level` (`DEBUG = 10` … `ERROR = 40`).
#[must_use]
pub const fn level_number(level: Level) -> u8 {
    match level {
        Level::Error => 40,
        Level::Warn => 30,
        Level::Info => 20,
        Level::Debug => 10,
        Level::Trace => 5,
    }
}

/// Ad-hoc structured context attached to a single event.
///
/// Keys keep their insertion order so rendered records list them in the
/// order the call site attached them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extras(Map<String, Value>);

impl Extras {
    /// Create an empty set of extras.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a JSON-compatible value under `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Attach the `Display` rendering of `value` under `key`.
    pub fn insert_display(&mut self, key: impl Into<String>, value: impl Display) {
        self.0.insert(key.into(), Value::String(value.to_string()));
    }

    /// Attach any serialisable value, falling back to its `Debug` text when
    /// it has no JSON representation.
    pub fn insert_serialize<T>(&mut self, key: impl Into<String>, value: &T)
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        let rendered = match serde_json::to_value(value) {
            Ok(Value::Null) | Err(_) => Value::String(format!("{value:?}")),
            Ok(json) => json,
        };
        self.0.insert(key.into(), rendered);
    }

    /// Copy every entry of `other` into `self`, overwriting on conflict.
    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Look up a single extra.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterate over the extras in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of attached extras.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Report whether no extras are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Extras
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// A single log event, created at the call site and consumed once by the
/// formatter.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// Severity.
    pub level: Level,
    /// Name of the logging channel.
    pub name: String,
    /// Fully rendered message text.
    pub message: String,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Rust module path of the emitting code, when known.
    pub module_path: Option<String>,
    /// Source file of the emitting code, when known.
    pub file: Option<String>,
    /// Source line of the emitting code, when known.
    pub line: Option<u32>,
    /// Name of the emitting thread, if it has one.
    pub thread_name: Option<String>,
    /// Opaque identifier of the emitting thread.
    pub thread_id: String,
    /// Identifier of the emitting process.
    pub process: u32,
    /// Formatted error chain attached to the event.
    pub exception: Option<String>,
    /// Captured stack trace attached to the event.
    pub stack: Option<String>,
    /// Ad-hoc structured context.
    pub extra: Extras,
}

impl LogEvent {
    /// Create an event stamped with the current time, thread and process.
    pub fn new(level: Level, name: impl Into<String>, message: impl Into<String>) -> Self {
        let current = std::thread::current();
        Self {
            level,
            name: name.into(),
            message: message.into(),
            created: Utc::now(),
            module_path: None,
            file: None,
            line: None,
            thread_name: current.name().map(str::to_owned),
            thread_id: format!("{:?}", current.id()),
            process: std::process::id(),
            exception: None,
            stack: None,
            extra: Extras::new(),
        }
    }

    /// Build an event from a record emitted through the `log` facade.
    ///
    /// Key/value pairs attached to the record become extras.
    #[must_use]
    pub fn from_record(record: &log::Record<'_>) -> Self {
        let mut event = Self::new(record.level(), record.target(), record.args().to_string());
        event.module_path = record.module_path().map(str::to_owned);
        event.file = record.file().map(str::to_owned);
        event.line = record.line();
        let mut visitor = ExtrasVisitor(&mut event.extra);
        // The visitor itself never fails; a failing source only truncates extras.
        if record.key_values().visit(&mut visitor).is_err() {
            event
                .extra
                .insert("extras_truncated", Value::Bool(true));
        }
        event
    }

    /// Override the creation time.
    #[must_use]
    pub fn at(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    /// Record the source location of a caller.
    #[must_use]
    pub fn located(mut self, location: &Location<'_>) -> Self {
        self.file = Some(location.file().to_owned());
        self.line = Some(location.line());
        self
    }

    /// Attach a single extra.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// Attach an error and its source chain as exception text.
    #[must_use]
    pub fn with_exception(mut self, error: &(dyn StdError + 'static)) -> Self {
        self.exception = Some(render_error_chain(error));
        self
    }

    /// Capture the current stack as stack text.
    #[must_use]
    pub fn with_stack(mut self) -> Self {
        self.stack = Some(std::backtrace::Backtrace::force_capture().to_string());
        self
    }

    /// Short module name: the last segment of the module path, else the
    /// source file stem.
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        self.module_path
            .as_deref()
            .and_then(|path| path.rsplit("::").next())
            .or_else(|| {
                self.file
                    .as_deref()
                    .map(std::path::Path::new)
                    .and_then(std::path::Path::file_stem)
                    .and_then(|stem| stem.to_str())
            })
    }
}

fn render_error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut cause = error.source();
    while let Some(inner) = cause {
        rendered.push_str("\ncaused by: ");
        rendered.push_str(&inner.to_string());
        cause = inner.source();
    }
    rendered
}

struct ExtrasVisitor<'a>(&'a mut Extras);

impl<'kvs> log::kv::VisitSource<'kvs> for ExtrasVisitor<'_> {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> Result<(), log::kv::Error> {
        self.0.insert(key.as_str(), kv_to_json(&value));
        Ok(())
    }
}

fn kv_to_json(value: &log::kv::Value<'_>) -> Value {
    if let Some(flag) = value.to_bool() {
        return Value::Bool(flag);
    }
    if let Some(number) = value.to_i64() {
        return Value::from(number);
    }
    if let Some(number) = value.to_u64() {
        return Value::from(number);
    }
    if let Some(number) = value
        .to_f64()
        .and_then(serde_json::Number::from_f64)
    {
        return Value::Number(number);
    }
    Value::String(value.to_string())
}
