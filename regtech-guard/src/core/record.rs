//! Records, record identity and datasets.

use super::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

static NULL_VALUE: Value = Value::Null;

/// The 1-based position of a record in its dataset.
///
/// Record order is the only identity source: the first record is `#1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(usize);

impl RecordId {
    /// Creates a record id from a 1-based position. Returns `None` for 0.
    pub fn new(position: usize) -> Option<Self> {
        (position > 0).then_some(Self(position))
    }

    /// Creates a record id from a 0-based index.
    pub fn from_index(index: usize) -> Self {
        Self(index + 1)
    }

    /// Returns the 1-based position.
    pub fn get(self) -> usize {
        self.0
    }

    /// Returns the 0-based index into the dataset.
    pub fn index(self) -> usize {
        self.0 - 1
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One input row: a mapping from field name to raw value.
///
/// Fields that are absent from the row read as [`Value::Null`]. The engine
/// only ever reads records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field value, builder style.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Returns the value of a field, or [`Value::Null`] when the field is absent.
    pub fn get(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&NULL_VALUE)
    }

    /// Returns true if the field key is present (even if its value is blank).
    pub fn has_field(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Iterates over the present fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of present fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// An ordered sequence of records.
///
/// A dataset is built by a loader, handed to one validation run, and then
/// dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    /// Creates a dataset from records in canonical order.
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the record with the given id.
    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id.index())
    }

    /// Iterates over `(id, record)` pairs in record order.
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &Record)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (RecordId::from_index(i), r))
    }

    /// Returns the records as a slice.
    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_is_one_based() {
        assert!(RecordId::new(0).is_none());
        let id = RecordId::from_index(0);
        assert_eq!(id.get(), 1);
        assert_eq!(id.index(), 0);
        assert_eq!(id.to_string(), "1");
    }

    #[test]
    fn test_absent_field_reads_null() {
        let record = Record::new().with("uid", "ABC");
        assert_eq!(record.get("uid"), &Value::text("ABC"));
        assert!(record.get("app_date").is_null());
        assert!(record.has_field("uid"));
        assert!(!record.has_field("app_date"));
    }

    #[test]
    fn test_dataset_iteration_order() {
        let dataset: Dataset = vec![
            Record::from_iter([("uid", "a")]),
            Record::from_iter([("uid", "b")]),
        ]
        .into();

        let ids: Vec<_> = dataset.iter().map(|(id, r)| (id.get(), r.get("uid").key())).collect();
        assert_eq!(ids, vec![(1, "a".to_string()), (2, "b".to_string())]);
        assert_eq!(
            dataset.get(RecordId::from_index(1)).map(|r| r.get("uid").key()),
            Some("b".to_string())
        );
        assert!(dataset.get(RecordId::from_index(2)).is_none());
    }

    #[test]
    fn test_record_json_shape() {
        let record: Record = serde_json::from_str(r#"{"uid": "x", "amount": 10}"#).unwrap();
        assert_eq!(record.get("amount"), &Value::Integer(10));
        assert_eq!(record.len(), 2);
    }
}
