//! Immutable reference code tables.
//!
//! Some rules validate codes against published lists (NAICS codes, census
//! tracts, ...). Those lists are loaded once, wrapped in an [`Arc`] and handed
//! to the factories in [`crate::checks`] that need them. Predicates hold
//! their own `Arc` and never reach for global state.
//!
//! The JSON form is a map of table name to a map of code to description:
//!
//! ```json
//! {
//!   "naics": { "111": "Crop Production", "112": "Animal Production" }
//! }
//! ```

use crate::error::{ErrorContext, GuardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// One named list of codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeTable {
    codes: BTreeMap<String, String>,
}

impl CodeTable {
    /// Creates a table from `(code, description)` pairs.
    pub fn new<I, C, D>(entries: I) -> Self
    where
        I: IntoIterator<Item = (C, D)>,
        C: Into<String>,
        D: Into<String>,
    {
        Self {
            codes: entries
                .into_iter()
                .map(|(c, d)| (c.into(), d.into()))
                .collect(),
        }
    }

    /// Returns true if the code is listed. Surrounding whitespace is ignored.
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains_key(code.trim())
    }

    /// Returns the description of a code.
    pub fn description(&self, code: &str) -> Option<&str> {
        self.codes.get(code.trim()).map(String::as_str)
    }

    /// Number of codes in the table.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// True if the table lists no codes.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Iterates over codes in sorted order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }
}

/// A set of named code tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceData {
    tables: BTreeMap<String, CodeTable>,
}

impl ReferenceData {
    /// Creates an empty set of tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a table.
    pub fn with_table(mut self, name: impl Into<String>, table: CodeTable) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    /// Parses tables from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let data: Self = serde_json::from_str(json)
            .map_err(|e| GuardError::Parse(format!("invalid reference data: {e}")))?;
        debug!(reference.tables = data.tables.len(), "Loaded reference data");
        Ok(data)
    }

    /// Reads tables from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading reference data {}", path.display()))?;
        Self::from_json(&text)
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Option<&CodeTable> {
        self.tables.get(name)
    }

    /// Like [`ReferenceData::table`] but fails with a schema error, for
    /// factories that cannot work without the table.
    pub fn require(&self, name: &str) -> Result<&CodeTable> {
        self.table(name)
            .ok_or_else(|| GuardError::schema(format!("unknown reference table '{name}'")))
    }

    /// Names of all tables in sorted order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Wraps the data for sharing between checks.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JSON: &str = r#"{
        "naics": { "111": "Crop Production", "112": "Animal Production" },
        "empty": {}
    }"#;

    #[test]
    fn test_parse_tables() {
        let data = ReferenceData::from_json(JSON).unwrap();
        let naics = data.table("naics").unwrap();
        assert_eq!(naics.len(), 2);
        assert!(naics.contains("111"));
        assert!(naics.contains(" 112 "));
        assert!(!naics.contains("113"));
        assert_eq!(naics.description("111"), Some("Crop Production"));
        assert!(data.table("empty").unwrap().is_empty());
        assert_eq!(data.table_names().collect::<Vec<_>>(), ["empty", "naics"]);
    }

    #[test]
    fn test_missing_table_is_schema_error() {
        let data = ReferenceData::new().with_table("a", CodeTable::new([("1", "one")]));
        assert!(data.require("a").is_ok());
        assert!(data.require("b").unwrap_err().is_schema_error());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ReferenceData::from_json("[1, 2]"),
            Err(GuardError::Parse(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(JSON.as_bytes()).unwrap();
        let data = ReferenceData::from_path(file.path()).unwrap();
        assert!(data.table("naics").is_some());

        let err = ReferenceData::from_path("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("reading reference data"));
    }
}
