//! Declarative logging configuration.
//!
//! The configuration is a JSON document naming the channel, its level, one
//! formatter (an ordered rename map), named severity filters and named
//! sinks. It is loaded once at logger setup; any problem is reported as a
//! [`LogConfigError`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use log::{Level, LevelFilter};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    Dispatcher, Handler, LOGGER_NAME, LogConfigError, RotatingFileSink, SeverityFilter, Sink,
    StreamSink, StructuredFormatter,
};

const BUNDLED_CONFIG: &str = include_str!("../config/logging.json");

/// Parse a level name, accepting the conventional aliases `WARNING`,
/// `CRITICAL` and `NOTSET` alongside the `log` crate's own names.
///
/// # Errors
/// Returns [`LogConfigError::UnknownLevel`] for unrecognised names.
pub fn parse_level_filter(value: &str) -> Result<LevelFilter, LogConfigError> {
    match value.to_ascii_uppercase().as_str() {
        "OFF" => Ok(LevelFilter::Off),
        "CRITICAL" | "ERROR" => Ok(LevelFilter::Error),
        "WARNING" | "WARN" => Ok(LevelFilter::Warn),
        "INFO" => Ok(LevelFilter::Info),
        "DEBUG" => Ok(LevelFilter::Debug),
        "TRACE" | "NOTSET" => Ok(LevelFilter::Trace),
        _ => Err(LogConfigError::UnknownLevel {
            value: value.to_owned(),
        }),
    }
}

/// Parse a level name into a concrete [`Level`]; `OFF` is rejected.
///
/// # Errors
/// Returns [`LogConfigError::UnknownLevel`] for unrecognised names and `OFF`.
pub fn parse_level(value: &str) -> Result<Level, LogConfigError> {
    parse_level_filter(value)?
        .to_level()
        .ok_or_else(|| LogConfigError::UnknownLevel {
            value: value.to_owned(),
        })
}

/// Ordered `output name → source name` pairs.
///
/// Serialised as a JSON object; entry order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRenames(Vec<(String, String)>);

impl FieldRenames {
    /// Iterate over the pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(output, source)| (output.as_str(), source.as_str()))
    }

    /// Number of rename entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Report whether no renames are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FieldRenames
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(output, source)| (output.into(), source.into()))
                .collect(),
        )
    }
}

impl Serialize for FieldRenames {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (output, source) in &self.0 {
            map.serialize_entry(output, source)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldRenames {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RenamesVisitor;

        impl<'de> Visitor<'de> for RenamesVisitor {
            type Value = FieldRenames;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of output field names to source field names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((output, source)) = access.next_entry::<String, String>()? {
                    pairs.push((output, source));
                }
                Ok(FieldRenames(pairs))
            }
        }

        deserializer.deserialize_map(RenamesVisitor)
    }
}

/// Formatter section of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatterConfig {
    /// Field renames applied to every record.
    #[serde(default)]
    pub fmt_keys: FieldRenames,
}

/// A named severity filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Most severe level admitted, e.g. `"INFO"`.
    pub max_level: String,
}

/// Kind of output a sink writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
    /// A size-rotated file.
    RotatingFile,
}

/// A named sink definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkConfig {
    /// Output kind.
    pub kind: SinkKind,
    /// Least severe level written to this sink; defaults to everything.
    #[serde(default)]
    pub level: Option<String>,
    /// Names of filters applied to this sink.
    #[serde(default)]
    pub filters: Vec<String>,
    /// Log file for `rotating_file` sinks.
    #[serde(default)]
    pub path: Option<Utf8PathBuf>,
    /// Size threshold for rotation; `0` disables rotation.
    #[serde(default)]
    pub max_bytes: u64,
    /// Number of rotated files to keep; `0` disables rotation.
    #[serde(default)]
    pub backup_count: u32,
}

fn default_name() -> String {
    LOGGER_NAME.to_owned()
}

fn default_level() -> String {
    "DEBUG".to_owned()
}

/// Complete logging configuration.
///
/// # Examples
///
/// ```
/// use datavirt_log::LoggingConfig;
///
/// let config: LoggingConfig = r#"{
///     "level": "INFO",
///     "formatter": { "fmt_keys": { "level": "levelname" } },
///     "filters": { "routine": { "max_level": "INFO" } },
///     "sinks": { "console": { "kind": "stdout", "filters": ["routine"] } }
/// }"#
/// .parse()?;
/// assert_eq!(config.name, "data_connections");
/// assert_eq!(config.formatter.fmt_keys.len(), 1);
/// # Ok::<(), datavirt_log::LogConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Channel name stamped on every event.
    #[serde(default = "default_name")]
    pub name: String,
    /// Least severe level the channel accepts.
    #[serde(default = "default_level")]
    pub level: String,
    /// The single formatter shared by every sink.
    #[serde(default)]
    pub formatter: FormatterConfig,
    /// Named severity filters.
    #[serde(default)]
    pub filters: BTreeMap<String, FilterConfig>,
    /// Named sinks.
    pub sinks: BTreeMap<String, SinkConfig>,
}

impl FromStr for LoggingConfig {
    type Err = LogConfigError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(source).map_err(LogConfigError::Parse)
    }
}

impl LoggingConfig {
    /// The configuration shipped with this crate.
    ///
    /// # Errors
    /// Returns [`LogConfigError::Parse`] if the bundled resource is malformed.
    pub fn bundled() -> Result<Self, LogConfigError> {
        BUNDLED_CONFIG.parse()
    }

    /// Load a configuration file.
    ///
    /// # Errors
    /// Returns [`LogConfigError::Read`] when the file cannot be read and
    /// [`LogConfigError::Parse`] when it is not a valid configuration.
    pub fn from_path(path: &Utf8Path) -> Result<Self, LogConfigError> {
        let bytes = datavirt_fs::read_file(path).map_err(|source| LogConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(LogConfigError::Parse)
    }

    /// Build a dispatcher, opening the configured sinks.
    ///
    /// # Errors
    /// Returns a [`LogConfigError`] when a level or filter reference is
    /// invalid or a sink cannot be opened.
    pub fn build(&self) -> Result<Dispatcher, LogConfigError> {
        self.build_with(open_sink)
    }

    /// Build a dispatcher, asking `make_sink` for every configured sink.
    ///
    /// Levels and filter references are validated exactly as in
    /// [`LoggingConfig::build`]; only sink construction is delegated.
    ///
    /// # Errors
    /// Returns a [`LogConfigError`] when validation fails or `make_sink`
    /// reports an error.
    pub fn build_with<F>(&self, mut make_sink: F) -> Result<Dispatcher, LogConfigError>
    where
        F: FnMut(&str, &SinkConfig) -> Result<Box<dyn Sink>, LogConfigError>,
    {
        let filters = self
            .filters
            .iter()
            .map(|(name, filter)| {
                parse_level(&filter.max_level)
                    .map(|ceiling| (name.as_str(), SeverityFilter::at_most(ceiling)))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let formatter = StructuredFormatter::new(self.formatter.fmt_keys.iter());
        let mut dispatcher =
            Dispatcher::new(self.name.clone(), formatter).with_level(parse_level_filter(&self.level)?);

        for (sink_name, sink) in &self.sinks {
            let mut handler = Handler::new(sink_name.clone(), make_sink(sink_name, sink)?);
            if let Some(level) = &sink.level {
                handler = handler.with_level(parse_level_filter(level)?);
            }
            for filter_name in &sink.filters {
                let filter = filters.get(filter_name.as_str()).ok_or_else(|| {
                    LogConfigError::UnknownFilter {
                        sink: sink_name.clone(),
                        filter: filter_name.clone(),
                    }
                })?;
                handler = handler.with_filter(*filter);
            }
            dispatcher = dispatcher.with_handler(handler);
        }

        Ok(dispatcher)
    }
}

/// Open the real output behind a sink definition.
///
/// # Errors
/// Returns [`LogConfigError::MissingPath`] for a file sink without a path
/// and [`LogConfigError::OpenSink`] when the file cannot be opened.
pub fn open_sink(name: &str, sink: &SinkConfig) -> Result<Box<dyn Sink>, LogConfigError> {
    match sink.kind {
        SinkKind::Stdout => Ok(Box::new(StreamSink::stdout())),
        SinkKind::Stderr => Ok(Box::new(StreamSink::stderr())),
        SinkKind::RotatingFile => {
            let path = sink.path.as_ref().ok_or_else(|| LogConfigError::MissingPath {
                sink: name.to_owned(),
            })?;
            let file = RotatingFileSink::open(path.clone(), sink.max_bytes, sink.backup_count)
                .map_err(|source| LogConfigError::OpenSink {
                    sink: name.to_owned(),
                    path: path.clone(),
                    source,
                })?;
            Ok(Box::new(file))
        }
    }
}
