//! Per-record field-unusable markers.

use super::RecordId;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Tracks which fields of which records failed a structural check.
///
/// Sparse: only records with at least one unusable field take space. Field
/// indices refer to the schema's field order.
///
/// Only failures of the value itself (field checks) count toward halting;
/// cross-record failures make a field unusable for later checks but say
/// nothing about whether the field is present at all.
#[derive(Debug, Clone, Default)]
pub(crate) struct FieldMarkers {
    unusable: HashMap<RecordId, BTreeSet<usize>>,
    counted: HashSet<(RecordId, usize)>,
    counts: Vec<usize>,
}

impl FieldMarkers {
    pub(crate) fn new(field_count: usize) -> Self {
        Self {
            unusable: HashMap::new(),
            counted: HashSet::new(),
            counts: vec![0; field_count],
        }
    }

    /// Marks a field unusable for a record after a field-check failure.
    /// Returns false if it already was unusable.
    pub(crate) fn mark(&mut self, record: RecordId, field: usize) -> bool {
        let inserted = self.insert(record, field);
        if self.counted.insert((record, field)) {
            if let Some(count) = self.counts.get_mut(field) {
                *count += 1;
            }
        }
        inserted
    }

    /// Marks a field unusable after a cross-record failure. Does not count
    /// toward halting.
    pub(crate) fn mark_cross_record(&mut self, record: RecordId, field: usize) -> bool {
        self.insert(record, field)
    }

    fn insert(&mut self, record: RecordId, field: usize) -> bool {
        self.unusable.entry(record).or_default().insert(field)
    }

    #[cfg(test)]
    pub(crate) fn is_unusable(&self, record: RecordId, field: usize) -> bool {
        self.unusable
            .get(&record)
            .is_some_and(|fields| fields.contains(&field))
    }

    /// True if any of `fields` is unusable for the record.
    pub(crate) fn any_unusable(&self, record: RecordId, fields: &[usize]) -> bool {
        match self.unusable.get(&record) {
            Some(marked) => fields.iter().any(|f| marked.contains(f)),
            None => false,
        }
    }

    /// Number of records on which a field check found the field unusable.
    pub(crate) fn unusable_count(&self, field: usize) -> usize {
        self.counts.get(field).copied().unwrap_or(0)
    }
}
