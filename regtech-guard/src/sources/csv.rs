//! CSV file source implementation.

use super::DataSource;
use crate::core::{Dataset, Record, Value};
use crate::error::{GuardError, Result};
use crate::log_data_op;
use crate::logging::LogConfig;
use ::csv::{ReaderBuilder, Trim};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::instrument;

/// Options for configuring CSV file reading.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Comment prefix (lines starting with this are ignored)
    pub comment: Option<u8>,
    /// Trim surrounding whitespace from every cell (default: false)
    pub trim: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            comment: None,
            trim: false,
        }
    }
}

impl CsvOptions {
    /// Sets the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether cells are trimmed.
    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }
}

/// A CSV file with a header row.
///
/// Values are read as text without any interpretation: an empty cell is an
/// empty string, and `"NA"` stays `"NA"`. Whether a value is a number or a
/// date is decided by the schema.
///
/// # Examples
///
/// ```rust
/// use regtech_guard::sources::{CsvOptions, CsvSource};
///
/// let data = "uid,amount\nA1,100\nA2,\n";
/// let dataset = CsvSource::from_reader(data.as_bytes(), &CsvOptions::default())?;
/// assert_eq!(dataset.len(), 2);
/// # Ok::<(), regtech_guard::error::GuardError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    options: CsvOptions,
    log: LogConfig,
}

impl CsvSource {
    /// Creates a new CSV source from a file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, CsvOptions::default())
    }

    /// Creates a CSV source with custom options.
    pub fn with_options(path: impl Into<PathBuf>, options: CsvOptions) -> Self {
        Self {
            path: path.into(),
            options,
            log: LogConfig::default(),
        }
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// The file this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The reader options in effect.
    pub fn options(&self) -> &CsvOptions {
        &self.options
    }

    /// Reads records from any reader, e.g. standard input or an in-memory
    /// buffer.
    pub fn from_reader<R: Read>(reader: R, options: &CsvOptions) -> Result<Dataset> {
        parse(reader, options, "<reader>")
    }
}

impl DataSource for CsvSource {
    #[instrument(skip(self), fields(source.path = %self.path.display()))]
    fn load(&self) -> Result<Dataset> {
        let start = Instant::now();
        let file = File::open(&self.path).map_err(|e| {
            GuardError::data_source_with_source(
                "CSV",
                format!("cannot open {}", self.path.display()),
                Box::new(e),
            )
        })?;
        let dataset = parse(file, &self.options, &self.path.display().to_string())?;
        log_data_op!(
            self.log,
            source.kind = "csv",
            records = dataset.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );
        Ok(dataset)
    }

    fn description(&self) -> String {
        format!("CSV file: {}", self.path.display())
    }
}

fn parse<R: Read>(reader: R, options: &CsvOptions, origin: &str) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .quote(options.quote)
        .comment(options.comment)
        .trim(if options.trim { Trim::All } else { Trim::None })
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| read_error(origin, "header row", e))?
        .iter()
        .map(|h| h.trim_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(GuardError::data_source(
            "CSV",
            format!("{origin}: missing header row"),
        ));
    }
    let mut seen = HashSet::new();
    for header in &headers {
        if !seen.insert(header.as_str()) {
            return Err(GuardError::data_source(
                "CSV",
                format!("{origin}: duplicate column '{header}'"),
            ));
        }
    }

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| read_error(origin, &format!("record {}", index + 1), e))?;
        let record = headers
            .iter()
            .zip(row.iter())
            .fold(Record::new(), |record, (header, cell)| {
                record.with(header.as_str(), Value::text(cell))
            });
        records.push(record);
    }
    Ok(Dataset::new(records))
}

fn read_error(origin: &str, what: &str, err: ::csv::Error) -> GuardError {
    GuardError::data_source_with_source("CSV", format!("{origin}: cannot read {what}"), Box::new(err))
}
