//! Loaders that turn files into a [`Dataset`].
//!
//! The engine never reads files itself; these sources do the reading and
//! hand over records in file order, so the 1-based position of a row is its
//! record id.
//!
//! - [`CsvSource`]: delimited text with a header row. Every cell becomes
//!   [`Value::Text`](crate::core::Value::Text), empty cells included.
//! - [`JsonSource`]: a JSON array of objects. Scalars and arrays map onto
//!   [`Value`](crate::core::Value) variants.

use crate::core::Dataset;
use crate::error::Result;
use std::fmt::Debug;

mod csv;
mod json;

pub use self::csv::{CsvOptions, CsvSource};
pub use self::json::JsonSource;

/// A source of records.
///
/// # Examples
///
/// ```rust,no_run
/// use regtech_guard::sources::{CsvSource, DataSource};
///
/// let source = CsvSource::new("data/sblar.csv");
/// let dataset = source.load()?;
/// println!("{}: {} records", source.description(), dataset.len());
/// # Ok::<(), regtech_guard::error::GuardError>(())
/// ```
pub trait DataSource: Debug + Send + Sync {
    /// Reads every record.
    fn load(&self) -> Result<Dataset>;

    /// Returns a human-readable description of this data source.
    fn description(&self) -> String;
}
