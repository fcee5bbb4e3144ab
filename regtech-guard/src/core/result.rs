//! Validation result types.

use super::{CheckScope, RecordId, Severity};
use crate::error::Result;
use crate::formatters::{
    CsvFormatter, HumanFormatter, JsonFormatter, MarkdownFormatter, ResultFormatter,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Group key used for findings that are not tied to a field.
pub const NO_FIELD_KEY: &str = "*";

/// Who owns a finding: one record, or the dataset as a whole.
///
/// Record targets sort before the dataset-wide marker, so dataset-wide
/// findings always come last in a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "TargetRepr", into = "TargetRepr")]
pub enum FindingTarget {
    /// A single record
    Record(RecordId),
    /// The dataset as a whole
    DatasetWide,
}

impl FindingTarget {
    /// Returns the record id if the target is a record.
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            FindingTarget::Record(id) => Some(*id),
            FindingTarget::DatasetWide => None,
        }
    }

    /// Returns true for the dataset-wide marker.
    pub fn is_dataset_wide(&self) -> bool {
        matches!(self, FindingTarget::DatasetWide)
    }
}

impl fmt::Display for FindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingTarget::Record(id) => write!(f, "{id}"),
            FindingTarget::DatasetWide => f.write_str("dataset"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TargetRepr {
    Record(usize),
    Marker(String),
}

impl From<FindingTarget> for TargetRepr {
    fn from(target: FindingTarget) -> Self {
        match target {
            FindingTarget::Record(id) => TargetRepr::Record(id.get()),
            FindingTarget::DatasetWide => TargetRepr::Marker("dataset".to_string()),
        }
    }
}

impl TryFrom<TargetRepr> for FindingTarget {
    type Error = String;

    fn try_from(repr: TargetRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            TargetRepr::Record(position) => RecordId::new(position)
                .map(FindingTarget::Record)
                .ok_or_else(|| "record ids start at 1".to_string()),
            TargetRepr::Marker(marker) if marker == "dataset" => Ok(FindingTarget::DatasetWide),
            TargetRepr::Marker(other) => Err(format!("unknown finding target '{other}'")),
        }
    }
}

/// Whether a finding comes from a failed predicate or a crashed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// The predicate returned false
    Failed,
    /// The predicate returned an error or panicked
    CheckCrashed,
}

impl FindingKind {
    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::Failed => "failed",
            FindingKind::CheckCrashed => "check_crashed",
        }
    }
}

/// One rule violation (or check crash) observed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// The record that owns the finding, or `"dataset"`
    pub record: FindingTarget,
    /// The field the check is attached to
    pub field: Option<String>,
    /// Other fields the check reads
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_fields: Vec<String>,
    /// Id of the check that produced the finding
    pub check_id: String,
    /// Human name of the check
    pub check_name: String,
    /// Severity of the check
    pub severity: Severity,
    /// Scope of the check
    pub scope: CheckScope,
    /// Phase the check ran in
    pub phase: String,
    /// Failed or crashed
    pub kind: FindingKind,
    /// Rendered message
    pub message: String,
    /// Values captured for diagnostics
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, String>,
}

impl Finding {
    /// Returns true if the predicate crashed rather than failed.
    pub fn is_crash(&self) -> bool {
        self.kind == FindingKind::CheckCrashed
    }
}

/// Why a run stopped before its last phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HaltReason {
    /// A non-nullable field was unusable on too many records
    RequiredFieldUnusable {
        /// The field name
        field: String,
        /// Records on which the field was unusable
        unusable: usize,
        /// Records in the dataset
        total: usize,
    },
    /// The caller cancelled the run
    Cancelled,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::RequiredFieldUnusable {
                field,
                unusable,
                total,
            } => write!(
                f,
                "required field '{field}' unusable on {unusable} of {total} records"
            ),
            HaltReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// The terminal status of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every phase ran
    Completed,
    /// The run stopped after the named phase; later phases never ran
    Halted {
        /// The last phase that ran (or was about to run, when cancelled)
        phase: String,
        /// Why the run stopped
        reason: HaltReason,
    },
    /// The schema was rejected; no check ran
    Aborted {
        /// The schema definition error
        reason: String,
    },
}

impl RunStatus {
    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Halted { .. } => "halted",
            RunStatus::Aborted { .. } => "aborted",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => f.write_str("completed"),
            RunStatus::Halted { phase, reason } => {
                write!(f, "halted after phase '{phase}': {reason}")
            }
            RunStatus::Aborted { reason } => write!(f, "aborted: {reason}"),
        }
    }
}

/// Evaluation counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationStats {
    /// Predicate invocations (field checks count once per record)
    pub evaluations: usize,
    /// Field-check evaluations skipped because a field they read was unusable
    pub skipped_unusable: usize,
}

/// Dimension used by [`ValidationResult::group_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupBy {
    /// Group by check id
    Check,
    /// Group by field name (`*` for findings without a field)
    Field,
    /// Group by severity
    Severity,
    /// Group by phase name
    Phase,
}

/// The outcome of one validation run.
///
/// Findings are sorted by record (dataset-wide last), then phase order, then
/// check definition order. Two runs over the same schema and dataset produce
/// byte-identical serializations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    schema: String,
    #[serde(flatten)]
    status: RunStatus,
    phases_run: Vec<String>,
    findings: Vec<Finding>,
    stats: EvaluationStats,
}

impl ValidationResult {
    pub(crate) fn new(
        schema: impl Into<String>,
        status: RunStatus,
        phases_run: Vec<String>,
        findings: Vec<Finding>,
        stats: EvaluationStats,
    ) -> Self {
        Self {
            schema: schema.into(),
            status,
            phases_run,
            findings,
            stats,
        }
    }

    /// A copy with a different finding list, used by formatters that trim
    /// output.
    pub(crate) fn with_findings(&self, findings: Vec<Finding>) -> Self {
        Self {
            schema: self.schema.clone(),
            status: self.status.clone(),
            phases_run: self.phases_run.clone(),
            findings,
            stats: self.stats,
        }
    }

    /// A result for a run that never started because the schema was invalid.
    pub fn aborted(schema: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            schema,
            RunStatus::Aborted {
                reason: reason.into(),
            },
            Vec::new(),
            Vec::new(),
            EvaluationStats::default(),
        )
    }

    /// Returns the schema name.
    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    /// Returns the terminal status.
    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Returns true if every phase ran.
    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }

    /// Returns true if the run halted early.
    pub fn is_halted(&self) -> bool {
        matches!(self.status, RunStatus::Halted { .. })
    }

    /// Returns true if the schema was rejected.
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, RunStatus::Aborted { .. })
    }

    /// Returns the names of the phases that ran, in order.
    pub fn phases_run(&self) -> &[String] {
        &self.phases_run
    }

    /// Returns all findings in canonical order.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Returns the evaluation counters.
    pub fn stats(&self) -> EvaluationStats {
        self.stats
    }

    /// Returns the number of findings.
    pub fn total(&self) -> usize {
        self.findings.len()
    }

    /// True iff no finding has error severity. Warnings never affect
    /// validity.
    ///
    /// Validity says nothing about how far the run got; check
    /// [`ValidationResult::status`] as well before accepting a submission.
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// Returns true if any finding has error severity.
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    /// Returns true if any finding has warning severity.
    pub fn has_warnings(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Warning)
    }

    /// Number of findings with the given severity.
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    /// Finding counts for every severity, zeros included.
    pub fn severity_counts(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::from([(Severity::Warning, 0), (Severity::Error, 0)]);
        for finding in &self.findings {
            *counts.entry(finding.severity).or_insert(0) += 1;
        }
        counts
    }

    /// Finding counts per phase, in phase order, for the phases that ran.
    pub fn phase_counts(&self) -> Vec<(String, usize)> {
        self.phases_run
            .iter()
            .map(|phase| {
                let count = self.findings.iter().filter(|f| &f.phase == phase).count();
                (phase.clone(), count)
            })
            .collect()
    }

    /// Groups findings by a dimension. Order inside each group is the
    /// canonical finding order.
    pub fn group_by(&self, dimension: GroupBy) -> BTreeMap<String, Vec<&Finding>> {
        let mut groups: BTreeMap<String, Vec<&Finding>> = BTreeMap::new();
        for finding in &self.findings {
            let key = match dimension {
                GroupBy::Check => finding.check_id.clone(),
                GroupBy::Field => finding
                    .field
                    .clone()
                    .unwrap_or_else(|| NO_FIELD_KEY.to_string()),
                GroupBy::Severity => finding.severity.to_string(),
                GroupBy::Phase => finding.phase.clone(),
            };
            groups.entry(key).or_default().push(finding);
        }
        groups
    }

    /// Findings owned by one record.
    pub fn findings_for_record(&self, id: RecordId) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(move |f| f.record == FindingTarget::Record(id))
    }

    /// Findings reporting crashed checks.
    pub fn crashed(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_crash())
    }

    /// A stable SHA-256 digest over the status and findings.
    ///
    /// Equal for any two runs with identical status and findings, whatever
    /// the worker count.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(&(&self.status, &self.findings))?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> Result<String> {
        JsonFormatter::new().format(self)
    }

    /// Plain-text rendering for terminals.
    pub fn to_human(&self) -> Result<String> {
        HumanFormatter::new().format(self)
    }

    /// Markdown rendering.
    pub fn to_markdown(&self) -> Result<String> {
        MarkdownFormatter::new().format(self)
    }

    /// One CSV row per finding.
    pub fn to_csv(&self) -> Result<String> {
        CsvFormatter::new().format(self)
    }
}
