//! Render log events as flat JSON records.
//!
//! A record is assembled from three groups of fields:
//!
//! 1. automatic fields every record carries: `message`, `timestamp`, `user`
//!    and, when present, `exc_info` and `stack_info`;
//! 2. renamed fields chosen by the operator (`output name → source name`),
//!    which may consume automatic fields or pull built-in event attributes
//!    such as `levelname` or `lineno`;
//! 3. the event's extras, copied verbatim unless they collide with a
//!    built-in attribute name.

use chrono::SecondsFormat;
use serde_json::{Map, Value};

use crate::{FormatError, LogEvent, level_name, level_number};

/// Field names reserved for the event itself; extras never override them.
///
/// `user` is not reserved, so a `user` extra replaces the acting user.
pub const BUILTIN_ATTRIBUTES: &[&str] = &[
    "created",
    "exc_info",
    "filename",
    "levelname",
    "levelno",
    "lineno",
    "message",
    "module",
    "msg",
    "name",
    "pathname",
    "process",
    "stack_info",
    "thread",
    "threadName",
    "timestamp",
];

const UNKNOWN_USER: &str = "unknown";

/// Resolve the acting user from the process environment.
#[must_use]
pub fn acting_user() -> String {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|value| !value.is_empty()))
        .unwrap_or_else(|| UNKNOWN_USER.to_owned())
}

/// Deterministically renders one [`LogEvent`] into one JSON record.
///
/// # Examples
///
/// ```
/// use datavirt_log::{LogEvent, StructuredFormatter};
/// use log::Level;
///
/// let formatter = StructuredFormatter::new([("lvl", "levelname")]).with_user("analyst");
/// let event = LogEvent::new(Level::Info, "data_connections", "fetched").with_extra("rows", 3);
/// let record = formatter.record(&event)?;
/// assert_eq!(record["lvl"], "INFO");
/// assert_eq!(record["message"], "fetched");
/// assert_eq!(record["rows"], 3);
/// assert!(!record.contains_key("levelname"));
/// # Ok::<(), datavirt_log::FormatError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredFormatter {
    renames: Vec<(String, String)>,
    user: String,
}

impl Default for StructuredFormatter {
    fn default() -> Self {
        Self::new(std::iter::empty::<(String, String)>())
    }
}

impl StructuredFormatter {
    /// Create a formatter applying `renames` in iteration order.
    ///
    /// The acting user is resolved once, here.
    pub fn new<I, K, V>(renames: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            renames: renames
                .into_iter()
                .map(|(output, source)| (output.into(), source.into()))
                .collect(),
            user: acting_user(),
        }
    }

    /// Replace the acting user reported in every record.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Configured `(output, source)` rename pairs.
    #[must_use]
    pub fn renames(&self) -> &[(String, String)] {
        &self.renames
    }

    /// Acting user reported in every record.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Assemble the structured record for `event`.
    ///
    /// # Errors
    /// Returns [`FormatError::UnknownField`] when a rename entry names a
    /// field the event does not carry.
    pub fn record(&self, event: &LogEvent) -> Result<Map<String, Value>, FormatError> {
        let mut automatic = self.automatic_fields(event);
        let mut record = Map::new();

        for (output, source) in &self.renames {
            let consumed = automatic
                .iter()
                .position(|(name, _)| *name == source.as_str())
                .map(|position| automatic.remove(position).1);
            let value = match consumed {
                Some(value) => value,
                None => attribute(event, source)?,
            };
            record.insert(output.clone(), value);
        }

        for (name, value) in automatic {
            record.insert(name.to_owned(), value);
        }

        for (key, value) in event.extra.iter() {
            if !BUILTIN_ATTRIBUTES.contains(&key.as_str()) {
                record.insert(key.clone(), value.clone());
            }
        }

        Ok(record)
    }

    /// Render `event` as a single JSON line.
    ///
    /// # Errors
    /// Propagates [`StructuredFormatter::record`] failures and JSON encoding
    /// failures.
    pub fn format(&self, event: &LogEvent) -> Result<String, FormatError> {
        let record = self.record(event)?;
        serde_json::to_string(&record).map_err(FormatError::Serialise)
    }

    fn automatic_fields(&self, event: &LogEvent) -> Vec<(&'static str, Value)> {
        let mut fields = vec![
            ("message", Value::String(event.message.clone())),
            (
                "timestamp",
                Value::String(event.created.to_rfc3339_opts(SecondsFormat::Micros, false)),
            ),
            ("user", Value::String(self.user.clone())),
        ];
        if let Some(exception) = &event.exception {
            fields.push(("exc_info", Value::String(exception.clone())));
        }
        if let Some(stack) = &event.stack {
            fields.push(("stack_info", Value::String(stack.clone())));
        }
        fields
    }
}

fn optional_string(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::String(text.to_owned()))
}

#[expect(
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "epoch seconds are reported as a float with microsecond resolution"
)]
fn epoch_seconds(event: &LogEvent) -> Value {
    let micros = event.created.timestamp_micros() as f64;
    serde_json::Number::from_f64(micros / 1_000_000.0).map_or(Value::Null, Value::Number)
}

fn attribute(event: &LogEvent, field: &str) -> Result<Value, FormatError> {
    let value = match field {
        "levelname" => Value::String(level_name(event.level).to_owned()),
        "levelno" => Value::from(level_number(event.level)),
        "name" => Value::String(event.name.clone()),
        "msg" => Value::String(event.message.clone()),
        "module" => optional_string(event.module()),
        "pathname" => optional_string(event.file.as_deref()),
        "filename" => optional_string(
            event
                .file
                .as_deref()
                .map(std::path::Path::new)
                .and_then(std::path::Path::file_name)
                .and_then(|name| name.to_str()),
        ),
        "lineno" => event.line.map_or(Value::Null, Value::from),
        "created" => epoch_seconds(event),
        "thread" => Value::String(event.thread_id.clone()),
        "threadName" => optional_string(event.thread_name.as_deref()),
        "process" => Value::from(event.process),
        other => event
            .extra
            .get(other)
            .cloned()
            .ok_or_else(|| FormatError::UnknownField {
                field: other.to_owned(),
            })?,
    };
    Ok(value)
}
