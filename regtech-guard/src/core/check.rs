//! The check primitive: one named rule with a severity and a predicate.
//!
//! A [`Check`] is a closed variant over two capabilities:
//!
//! - a **field check** is called once per record with the value of the field
//!   it is attached to and the whole record (for cross-field rules);
//! - a **dataset check** is called once per phase with a [`DatasetView`] and
//!   returns the [`Violation`]s it found, e.g. every member of a duplicate
//!   composite key.
//!
//! Checks are built with [`Check::field`] / [`Check::dataset`] and a
//! [`CheckBuilder`], usually through the factories in
//! [`crate::checks`]. Once built, a check is immutable.
//!
//! ```rust
//! use regtech_guard::core::{Check, Severity};
//!
//! let check = Check::field("app_recipient.invalid_enum_value", |value, _record| {
//!     Ok(matches!(value.as_text().as_ref(), "1" | "2"))
//! })
//! .name("app_recipient.invalid_enum_value")
//! .description("'Application recipient' must equal 1 or 2")
//! .message("{field} has invalid value '{value}'")
//! .severity(Severity::Error)
//! .build();
//!
//! assert_eq!(check.id(), "app_recipient.invalid_enum_value");
//! ```

use super::markers::FieldMarkers;
use super::{Dataset, FindingTarget, Record, RecordId, Severity, Value};
use crate::error::CheckPredicateFailure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Result type returned by check predicates.
pub type PredicateResult<T> = std::result::Result<T, CheckPredicateFailure>;

/// A record-scoped predicate: `(value, record) -> passed?`.
pub type FieldPredicate = Arc<dyn Fn(&Value, &Record) -> PredicateResult<bool> + Send + Sync>;

/// A dataset-scoped predicate returning the violations it found.
pub type DatasetPredicate =
    Arc<dyn Fn(&DatasetView<'_>) -> PredicateResult<Vec<Violation>> + Send + Sync>;

/// What a check looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckScope {
    /// A single field of a single record
    Field,
    /// Several fields of a single record
    CrossField,
    /// The whole dataset at once
    CrossRecord,
}

impl CheckScope {
    /// Returns the string representation of the scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckScope::Field => "field",
            CheckScope::CrossField => "cross-field",
            CheckScope::CrossRecord => "cross-record",
        }
    }
}

impl fmt::Display for CheckScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The predicate of a check.
#[derive(Clone)]
pub enum CheckKind {
    /// Evaluated once per record
    Field(FieldPredicate),
    /// Evaluated once per phase over the whole dataset
    Dataset(DatasetPredicate),
}

impl fmt::Debug for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::Field(_) => f.write_str("Field(<predicate>)"),
            CheckKind::Dataset(_) => f.write_str("Dataset(<predicate>)"),
        }
    }
}

/// The outcome of evaluating a field check against one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The predicate returned true
    Passed,
    /// The predicate returned false
    Failed,
    /// The predicate returned an error or panicked
    Crashed(CheckPredicateFailure),
}

/// One violation reported by a dataset check.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// The record that owns the violation, or the dataset-wide marker
    pub target: FindingTarget,
    /// Values captured for diagnostics
    pub values: BTreeMap<String, String>,
}

impl Violation {
    /// A violation owned by one record.
    pub fn record(id: RecordId) -> Self {
        Self {
            target: FindingTarget::Record(id),
            values: BTreeMap::new(),
        }
    }

    /// A violation with no single owning record.
    pub fn dataset_wide() -> Self {
        Self {
            target: FindingTarget::DatasetWide,
            values: BTreeMap::new(),
        }
    }

    /// Attaches a captured value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

/// A read-only view of the dataset handed to dataset checks.
///
/// Iteration skips records on which any field read by the check has been
/// marked unusable by an earlier structural failure, so cross-record rules
/// never produce cascading findings.
pub struct DatasetView<'a> {
    dataset: &'a Dataset,
    markers: &'a FieldMarkers,
    fields: &'a [usize],
}

impl<'a> DatasetView<'a> {
    pub(crate) fn new(dataset: &'a Dataset, markers: &'a FieldMarkers, fields: &'a [usize]) -> Self {
        Self {
            dataset,
            markers,
            fields,
        }
    }

    /// Iterates over the usable records in record order.
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &'a Record)> + '_ {
        self.dataset
            .iter()
            .filter(move |(id, _)| !self.markers.any_unusable(*id, self.fields))
    }

    /// Returns true if the record is visible to this check.
    pub fn is_usable(&self, id: RecordId) -> bool {
        !self.markers.any_unusable(id, self.fields)
    }

    /// Total number of records in the dataset, usable or not.
    pub fn total_records(&self) -> usize {
        self.dataset.len()
    }
}

/// A single named rule.
#[derive(Clone)]
pub struct Check {
    id: String,
    name: String,
    description: Option<String>,
    severity: Severity,
    scope: CheckScope,
    message: String,
    depends_on: Vec<String>,
    phase: Option<String>,
    params: BTreeMap<String, String>,
    kind: CheckKind,
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("id", &self.id)
            .field("severity", &self.severity)
            .field("scope", &self.scope)
            .field("depends_on", &self.depends_on)
            .field("phase", &self.phase)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Check {
    /// Starts building a record-scoped check.
    pub fn field<F>(id: impl Into<String>, predicate: F) -> CheckBuilder
    where
        F: Fn(&Value, &Record) -> PredicateResult<bool> + Send + Sync + 'static,
    {
        CheckBuilder::new(id.into(), CheckKind::Field(Arc::new(predicate)))
    }

    /// Starts building a dataset-scoped check.
    pub fn dataset<F>(id: impl Into<String>, predicate: F) -> CheckBuilder
    where
        F: Fn(&DatasetView<'_>) -> PredicateResult<Vec<Violation>> + Send + Sync + 'static,
    {
        CheckBuilder::new(id.into(), CheckKind::Dataset(Arc::new(predicate)))
    }

    /// Returns the unique id of the check.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human name of the check.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description of the check if available.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the severity of findings produced by this check.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the scope of the check.
    pub fn scope(&self) -> CheckScope {
        self.scope
    }

    /// Returns the raw message template.
    pub fn message_template(&self) -> &str {
        &self.message
    }

    /// Returns the other fields this check reads besides the one it is
    /// attached to.
    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    /// Returns the phase this check was assigned to, if any.
    pub fn phase(&self) -> Option<&str> {
        self.phase.as_deref()
    }

    /// Returns the named template parameters.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Returns the predicate.
    pub fn kind(&self) -> &CheckKind {
        &self.kind
    }

    /// Returns true for dataset-scoped checks.
    pub fn is_dataset_check(&self) -> bool {
        matches!(self.kind, CheckKind::Dataset(_))
    }

    pub(crate) fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Evaluates a field check against one record.
    ///
    /// Errors and panics raised by the predicate are contained and reported
    /// as [`Outcome::Crashed`]. Calling this on a dataset check is reported
    /// as a crash as well.
    pub fn evaluate_field(&self, value: &Value, record: &Record) -> Outcome {
        let CheckKind::Field(predicate) = &self.kind else {
            return Outcome::Crashed(CheckPredicateFailure::new(format!(
                "check '{}' is not a field check",
                self.id
            )));
        };
        match isolate(|| predicate(value, record)) {
            Ok(true) => Outcome::Passed,
            Ok(false) => Outcome::Failed,
            Err(failure) => Outcome::Crashed(failure),
        }
    }

    /// Evaluates a dataset check, with the same failure containment as
    /// [`Check::evaluate_field`].
    pub fn evaluate_dataset(&self, view: &DatasetView<'_>) -> PredicateResult<Vec<Violation>> {
        let CheckKind::Dataset(predicate) = &self.kind else {
            return Err(CheckPredicateFailure::new(format!(
                "check '{}' is not a dataset check",
                self.id
            )));
        };
        isolate(|| predicate(view))
    }

    /// Renders the message template.
    ///
    /// Recognised placeholders are `{check_id}`, `{name}`, `{field}`,
    /// `{value}`, `{record}` and every parameter set with
    /// [`CheckBuilder::param`]. Unknown placeholders are left untouched.
    pub fn render_message(&self, field: &str, value: Option<&Value>, target: FindingTarget) -> String {
        let mut out = String::with_capacity(self.message.len() + 16);
        let mut rest = self.message.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            let key = &after[..close];
            match self.placeholder(key, field, value, target) {
                Some(replacement) => out.push_str(&replacement),
                None => {
                    out.push('{');
                    out.push_str(key);
                    out.push('}');
                }
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out
    }

    fn placeholder(
        &self,
        key: &str,
        field: &str,
        value: Option<&Value>,
        target: FindingTarget,
    ) -> Option<String> {
        match key {
            "check_id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            "field" => Some(field.to_string()),
            "value" => Some(value.map(|v| v.as_text().into_owned()).unwrap_or_default()),
            "record" => Some(target.to_string()),
            other => self.params.get(other).cloned(),
        }
    }
}

/// Runs a predicate, turning panics into [`CheckPredicateFailure`]s.
///
/// Every predicate invocation in the engine goes through here.
pub(crate) fn isolate<T, F>(f: F) -> PredicateResult<T>
where
    F: FnOnce() -> PredicateResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(CheckPredicateFailure::from_panic(payload.as_ref())),
    }
}

/// Builder for constructing [`Check`] instances.
#[derive(Debug)]
pub struct CheckBuilder {
    id: String,
    name: Option<String>,
    description: Option<String>,
    severity: Severity,
    message: Option<String>,
    depends_on: Vec<String>,
    phase: Option<String>,
    params: BTreeMap<String, String>,
    kind: CheckKind,
}

impl CheckBuilder {
    fn new(id: String, kind: CheckKind) -> Self {
        Self {
            id,
            name: None,
            description: None,
            severity: Severity::Error,
            message: None,
            depends_on: Vec::new(),
            phase: None,
            params: BTreeMap::new(),
            kind,
        }
    }

    /// Sets the human name (defaults to the id).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the severity (defaults to [`Severity::Error`]).
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Shorthand for `severity(Severity::Warning)`.
    pub fn warning(self) -> Self {
        self.severity(Severity::Warning)
    }

    /// Sets the message template.
    ///
    /// Defaults to the description, or to `"{check_id} failed"` when there is
    /// no description.
    pub fn message(mut self, template: impl Into<String>) -> Self {
        self.message = Some(template.into());
        self
    }

    /// Declares another field read by the predicate.
    pub fn depends_on(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.depends_on.contains(&field) {
            self.depends_on.push(field);
        }
        self
    }

    /// Assigns the check to a named phase of the schema.
    pub fn phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Sets a named template parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Builds the check. The scope follows from the predicate kind and the
    /// declared dependencies.
    pub fn build(self) -> Check {
        let scope = match (&self.kind, self.depends_on.is_empty()) {
            (CheckKind::Dataset(_), _) => CheckScope::CrossRecord,
            (CheckKind::Field(_), true) => CheckScope::Field,
            (CheckKind::Field(_), false) => CheckScope::CrossField,
        };
        let message = self
            .message
            .or_else(|| self.description.clone())
            .unwrap_or_else(|| "{check_id} failed".to_string());

        Check {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            description: self.description,
            severity: self.severity,
            scope,
            message,
            depends_on: self.depends_on,
            phase: self.phase,
            params: self.params,
            kind: self.kind,
        }
    }
}
