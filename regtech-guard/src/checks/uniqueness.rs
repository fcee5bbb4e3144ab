//! Cross-record checks.
//!
//! Both checks here make a single pass over the dataset view, so their cost
//! grows linearly with the number of records.

use crate::config::DuplicatePolicy;
use crate::core::{Check, CheckBuilder, RecordId, Violation};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Options for [`composite_key_unique`].
#[derive(Debug, Clone)]
pub struct UniqueKeyOptions {
    /// Which members of a duplicate group are reported
    pub policy: DuplicatePolicy,
    /// How many records may share a key before the key is a duplicate
    pub count_limit: usize,
    /// Leave out records whose key fields are all blank
    pub ignore_blank_keys: bool,
    counter: Option<Arc<AtomicUsize>>,
}

impl Default for UniqueKeyOptions {
    fn default() -> Self {
        Self {
            policy: DuplicatePolicy::default(),
            count_limit: 1,
            ignore_blank_keys: false,
            counter: None,
        }
    }
}

impl UniqueKeyOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the duplicate policy.
    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets how many records may share one key.
    pub fn with_count_limit(mut self, count_limit: usize) -> Self {
        self.count_limit = count_limit.max(1);
        self
    }

    /// Sets whether all-blank keys are left out.
    pub fn ignore_blank_keys(mut self, ignore: bool) -> Self {
        self.ignore_blank_keys = ignore;
        self
    }

    /// Counts every insertion into the key index. Used to observe that the
    /// check does a linear amount of work.
    pub fn with_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.counter = Some(counter);
        self
    }
}

/// No two records may share the same values for `fields`.
///
/// Records are indexed by their composite key in one pass; every group
/// larger than the count limit yields one violation per reported member,
/// carrying the key and the group size.
///
/// ```rust
/// use regtech_guard::checks::{composite_key_unique, UniqueKeyOptions};
///
/// let check = composite_key_unique(
///     "uid.duplicates_in_dataset",
///     ["uid"],
///     UniqueKeyOptions::default(),
/// )
/// .build();
/// assert!(check.is_dataset_check());
/// ```
pub fn composite_key_unique<I, S>(
    id: impl Into<String>,
    fields: I,
    options: UniqueKeyOptions,
) -> CheckBuilder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
    let key_fields = fields.clone();
    let mut builder = Check::dataset(id, move |view| {
        let mut index: HashMap<Vec<String>, Vec<RecordId>> = HashMap::new();
        for (id, record) in view.iter() {
            let key: Vec<String> = key_fields.iter().map(|f| record.get(f).key()).collect();
            if options.ignore_blank_keys && key.iter().all(String::is_empty) {
                continue;
            }
            if let Some(counter) = &options.counter {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            index.entry(key).or_default().push(id);
        }

        let skip = match options.policy {
            DuplicatePolicy::FlagAll => 0,
            DuplicatePolicy::AllButFirst => options.count_limit,
        };
        let mut violations = Vec::new();
        for (key, ids) in index {
            if ids.len() <= options.count_limit {
                continue;
            }
            let shown = key.join("|");
            let occurrences = ids.len().to_string();
            for id in ids.into_iter().skip(skip) {
                violations.push(
                    Violation::record(id)
                        .with_value("key", shown.clone())
                        .with_value("occurrences", occurrences.clone()),
                );
            }
        }
        debug!(violations = violations.len(), "Composite key index built");
        Ok(violations)
    })
    .param("fields", fields.join(", "));
    for field in fields {
        builder = builder.depends_on(field);
    }
    builder
}

/// Every non-blank value of `field` must start with the same `length`
/// characters (e.g. every ULI in a submission starts with the filer's
/// 20-character LEI).
///
/// The rule concerns the dataset as a whole: a mismatch yields one
/// dataset-wide violation listing the distinct prefixes seen.
pub fn same_prefix(id: impl Into<String>, field: impl Into<String>, length: usize) -> CheckBuilder {
    let field = field.into();
    let read = field.clone();
    Check::dataset(id, move |view| {
        let mut prefixes: BTreeMap<String, usize> = BTreeMap::new();
        for (_, record) in view.iter() {
            let value = record.get(&read);
            if value.is_blank() {
                continue;
            }
            let prefix: String = value.as_text().trim().chars().take(length).collect();
            *prefixes.entry(prefix).or_default() += 1;
        }
        if prefixes.len() <= 1 {
            return Ok(Vec::new());
        }
        let listed = prefixes.keys().cloned().collect::<Vec<_>>().join(", ");
        Ok(vec![Violation::dataset_wide()
            .with_value("prefixes", listed)
            .with_value("distinct", prefixes.len().to_string())])
    })
    .depends_on(field.clone())
    .param("field", field)
    .param("length", length.to_string())
}
