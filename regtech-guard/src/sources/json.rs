//! JSON file source implementation.

use super::DataSource;
use crate::core::{Dataset, Record, Value};
use crate::error::{GuardError, Result};
use crate::log_data_op;
use crate::logging::LogConfig;
use serde_json::Value as Json;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::instrument;

/// A JSON file holding an array of flat objects, one per record.
///
/// `null` maps to [`Value::Null`], numbers to [`Value::Integer`] or
/// [`Value::Float`], arrays to [`Value::List`]. Nested objects are kept as
/// their JSON text.
///
/// ```rust
/// use regtech_guard::core::{RecordId, Value};
/// use regtech_guard::sources::JsonSource;
///
/// let dataset = JsonSource::from_str(r#"[{"uid": "A1", "amount": 100, "codes": ["1", "2"]}]"#)?;
/// let record = dataset.get(RecordId::from_index(0)).unwrap();
/// assert_eq!(record.get("amount"), &Value::Integer(100));
/// # Ok::<(), regtech_guard::error::GuardError>(())
/// ```
#[derive(Debug, Clone)]
pub struct JsonSource {
    path: PathBuf,
    log: LogConfig,
}

impl JsonSource {
    /// Creates a new JSON source from a file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            log: LogConfig::default(),
        }
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses records from JSON text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> Result<Dataset> {
        parse(text, "<string>")
    }
}

impl DataSource for JsonSource {
    #[instrument(skip(self), fields(source.path = %self.path.display()))]
    fn load(&self) -> Result<Dataset> {
        let start = Instant::now();
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            GuardError::data_source_with_source(
                "JSON",
                format!("cannot open {}", self.path.display()),
                Box::new(e),
            )
        })?;
        let dataset = parse(&text, &self.path.display().to_string())?;
        log_data_op!(
            self.log,
            source.kind = "json",
            records = dataset.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );
        Ok(dataset)
    }

    fn description(&self) -> String {
        format!("JSON file: {}", self.path.display())
    }
}

fn parse(text: &str, origin: &str) -> Result<Dataset> {
    let document: Json = serde_json::from_str(text).map_err(|e| {
        GuardError::data_source_with_source("JSON", format!("{origin}: invalid JSON"), Box::new(e))
    })?;
    let Json::Array(rows) = document else {
        return Err(GuardError::data_source(
            "JSON",
            format!("{origin}: expected an array of objects"),
        ));
    };

    rows.into_iter()
        .enumerate()
        .map(|(index, row)| match row {
            Json::Object(fields) => Ok(fields
                .into_iter()
                .fold(Record::new(), |record, (name, value)| {
                    record.with(name, convert(value))
                })),
            other => Err(GuardError::data_source(
                "JSON",
                format!(
                    "{origin}: record {} is not an object: {other}",
                    index + 1
                ),
            )),
        })
        .collect::<Result<Vec<_>>>()
        .map(Dataset::new)
}

fn convert(value: Json) -> Value {
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map_or(Value::Text(n.to_string()), Value::Float),
        },
        Json::String(s) => Value::Text(s),
        Json::Array(items) => Value::List(items.into_iter().map(convert).collect()),
        object @ Json::Object(_) => Value::Text(object.to_string()),
    }
}
