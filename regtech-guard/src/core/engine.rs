//! The validation engine: applies a schema's phases to a dataset.
//!
//! Per phase, in schema order:
//!
//! 1. every field check of the phase runs against every record, skipping
//!    records on which a field the check reads is unusable (optionally split
//!    across scoped worker threads);
//! 2. error findings of a structural phase mark their field unusable;
//! 3. every dataset check of the phase runs once over a [`DatasetView`] that
//!    hides records with unusable inputs, and its record-owned error
//!    findings mark fields as well;
//! 4. the [`PhaseOrchestrator`] decides whether to continue.
//!
//! Findings are then sorted by (record, phase, check-definition order), so
//! the output does not depend on the worker count.

use super::markers::FieldMarkers;
use super::orchestrator::PhaseOrchestrator;
use super::schema::{CheckEntry, PhasePlan};
use super::{
    Dataset, DatasetView, EvaluationStats, Finding, FindingKind, FindingTarget, Outcome, Record,
    RecordId, Schema, SchemaBuilder, Severity, ValidationResult, Violation,
};
use crate::config::EngineConfig;
use crate::error::{CheckPredicateFailure, GuardError, Result};
use crate::logging::truncate_field;
use crate::{log_check, log_metrics};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// A cloneable flag used to cancel a run at the next phase boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Creates a handle that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Phases already running finish first.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A finding plus the keys it is sorted by.
struct Ranked {
    phase: usize,
    order: usize,
    finding: Finding,
}

impl Ranked {
    fn sort_key(&self) -> (FindingTarget, usize, usize) {
        (self.finding.record, self.phase, self.order)
    }
}

/// Runs schemas against datasets.
///
/// # Examples
///
/// ```rust
/// use regtech_guard::core::{Dataset, FieldDefinition, FieldType, Record, Schema, ValidationEngine};
///
/// let schema = Schema::builder("loans")
///     .field(FieldDefinition::new("loan_amount", FieldType::Number).required())
///     .build()
///     .unwrap();
/// let dataset: Dataset = vec![
///     Record::new().with("loan_amount", "1000"),
///     Record::new().with("loan_amount", "abc"),
/// ]
/// .into();
///
/// let result = ValidationEngine::new().run(&dataset, &schema).unwrap();
/// assert!(!result.is_valid());
/// assert_eq!(result.findings()[0].check_id, "loan_amount.invalid_number");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    config: EngineConfig,
}

impl ValidationEngine {
    /// Creates a sequential engine with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs every phase of `schema` against `dataset`.
    pub fn run(&self, dataset: &Dataset, schema: &Schema) -> Result<ValidationResult> {
        self.run_with_cancel(dataset, schema, &CancelHandle::new())
    }

    /// Builds the schema, then runs it. A rejected schema yields an
    /// `aborted` result instead of an error.
    pub fn run_schema(&self, dataset: &Dataset, builder: SchemaBuilder) -> Result<ValidationResult> {
        let name = builder.name().to_string();
        match builder.build() {
            Ok(schema) => self.run(dataset, &schema),
            Err(err) if err.is_schema_error() => {
                warn!(schema.name = %name, error = %err, "Schema rejected, aborting run");
                Ok(ValidationResult::aborted(name, err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Runs the schema, checking `cancel` before each phase.
    #[instrument(
        skip_all,
        fields(
            schema.name = %schema.name(),
            dataset.records = dataset.len(),
            engine.workers = self.config.workers
        )
    )]
    pub fn run_with_cancel(
        &self,
        dataset: &Dataset,
        schema: &Schema,
        cancel: &CancelHandle,
    ) -> Result<ValidationResult> {
        self.config.validate()?;
        let started = Instant::now();
        info!(
            schema.name = %schema.name(),
            schema.phases = schema.phases().len(),
            schema.checks = schema.check_count(),
            dataset.records = dataset.len(),
            "Starting validation run"
        );

        let mut orchestrator = PhaseOrchestrator::new(schema, self.config.halt_policy);
        let mut markers = FieldMarkers::new(schema.fields().len());
        let mut ranked: Vec<Ranked> = Vec::new();
        let mut stats = EvaluationStats::default();

        while let Some(index) = orchestrator.next_phase() {
            if cancel.is_cancelled() {
                orchestrator.cancel()?;
                break;
            }
            let phase = orchestrator.begin_phase()?;
            let plan = schema.plan(index).ok_or_else(|| {
                GuardError::fatal(format!("no evaluation plan for phase {index}"))
            })?;
            let before = ranked.len();

            let (field_findings, field_stats) =
                self.evaluate_field_checks(dataset, schema, plan, &markers, index)?;
            stats.evaluations += field_stats.evaluations;
            stats.skipped_unusable += field_stats.skipped_unusable;
            if phase.is_structural() {
                mark_unusable(schema, &field_findings, &mut markers, FieldMarkers::mark);
            }
            ranked.extend(field_findings);

            let dataset_findings =
                self.evaluate_dataset_checks(dataset, schema, plan, &markers, index);
            stats.evaluations += plan.dataset_checks.len();
            if phase.is_structural() {
                mark_unusable(
                    schema,
                    &dataset_findings,
                    &mut markers,
                    FieldMarkers::mark_cross_record,
                );
            }
            ranked.extend(dataset_findings);

            debug!(
                phase.name = %phase.name(),
                phase.kind = %phase.kind(),
                phase.findings = ranked.len() - before,
                "Phase finished"
            );
            orchestrator.finish_phase(&markers, dataset.len())?;
        }

        let status = orchestrator.status()?;
        ranked.sort_by_key(Ranked::sort_key);

        let findings: Vec<Finding> = ranked.into_iter().map(|r| r.finding).collect();
        if let Some(unknown) = findings.iter().find(|f| !schema.contains_check(&f.check_id)) {
            return Err(GuardError::fatal(format!(
                "finding references unknown check id '{}'",
                unknown.check_id
            )));
        }

        let result = ValidationResult::new(
            schema.name(),
            status,
            orchestrator.phases_run().to_vec(),
            findings,
            stats,
        );

        info!(
            schema.name = %schema.name(),
            run.status = %result.status().as_str(),
            run.findings = result.total(),
            run.errors = result.count_by_severity(Severity::Error),
            run.warnings = result.count_by_severity(Severity::Warning),
            "Validation run finished"
        );
        log_metrics!(
            self.config.log,
            run.evaluations = stats.evaluations,
            run.skipped_unusable = stats.skipped_unusable,
            run.elapsed_ms = started.elapsed().as_millis() as u64,
            "Validation run metrics"
        );

        Ok(result)
    }

    fn evaluate_field_checks(
        &self,
        dataset: &Dataset,
        schema: &Schema,
        plan: &PhasePlan,
        markers: &FieldMarkers,
        phase: usize,
    ) -> Result<(Vec<Ranked>, EvaluationStats)> {
        if plan.field_checks.is_empty() {
            return Ok((Vec::new(), EvaluationStats::default()));
        }

        let workers = self.config.workers.max(1);
        if workers == 1 || dataset.is_empty() || dataset.len() < self.config.parallel_threshold {
            return Ok(self.evaluate_chunk(0, dataset.records(), schema, plan, markers, phase));
        }

        let chunk_size = (dataset.len() + workers - 1) / workers;
        std::thread::scope(|scope| {
            let handles: Vec<_> = dataset
                .records()
                .chunks(chunk_size)
                .enumerate()
                .map(|(i, chunk)| {
                    scope.spawn(move || {
                        self.evaluate_chunk(i * chunk_size, chunk, schema, plan, markers, phase)
                    })
                })
                .collect();

            let mut merged: Vec<Ranked> = Vec::new();
            let mut stats = EvaluationStats::default();
            for handle in handles {
                match handle.join() {
                    Ok((findings, chunk_stats)) => {
                        merged.extend(findings);
                        stats.evaluations += chunk_stats.evaluations;
                        stats.skipped_unusable += chunk_stats.skipped_unusable;
                    }
                    Err(_) => return Err(GuardError::fatal("field-check worker panicked")),
                }
            }
            Ok((merged, stats))
        })
    }

    fn evaluate_chunk(
        &self,
        start: usize,
        records: &[Record],
        schema: &Schema,
        plan: &PhasePlan,
        markers: &FieldMarkers,
        phase: usize,
    ) -> (Vec<Ranked>, EvaluationStats) {
        let entries = schema.entries();
        let mut out = Vec::new();
        let mut stats = EvaluationStats::default();

        for (offset, record) in records.iter().enumerate() {
            let id = RecordId::from_index(start + offset);
            for &ei in &plan.field_checks {
                let entry = &entries[ei];
                if markers.any_unusable(id, &entry.reads) {
                    stats.skipped_unusable += 1;
                    continue;
                }
                stats.evaluations += 1;

                let field = schema.fields()[entry.field].name();
                let value = record.get(field);
                match entry.check.evaluate_field(value, record) {
                    Outcome::Passed => {}
                    Outcome::Failed => {
                        let target = FindingTarget::Record(id);
                        let values = capture_values(schema, entry, record);
                        let message = entry.check.render_message(field, Some(value), target);
                        log_check!(
                            self.config.log,
                            check.id = %entry.check.id(),
                            record.id = %id,
                            field.value = %truncate_field(&value.as_text(), self.config.log.max_field_length),
                            "Check failed"
                        );
                        out.push(self.finding(schema, entry, phase, target, message, values, None));
                    }
                    Outcome::Crashed(failure) => {
                        let target = FindingTarget::Record(id);
                        let values = capture_values(schema, entry, record);
                        out.push(self.crash(schema, entry, phase, target, values, &failure));
                    }
                }
            }
        }
        (out, stats)
    }

    fn evaluate_dataset_checks(
        &self,
        dataset: &Dataset,
        schema: &Schema,
        plan: &PhasePlan,
        markers: &FieldMarkers,
        phase: usize,
    ) -> Vec<Ranked> {
        let entries = schema.entries();
        let mut out = Vec::new();

        for &ei in &plan.dataset_checks {
            let entry = &entries[ei];
            let field = schema.fields()[entry.field].name();
            let view = DatasetView::new(dataset, markers, &entry.reads);

            let violations = entry
                .check
                .evaluate_dataset(&view)
                .and_then(|violations| verify_violations(entry, dataset, violations));

            match violations {
                Ok(violations) => {
                    let mut seen = HashSet::new();
                    for violation in violations {
                        if let FindingTarget::Record(id) = violation.target {
                            if !seen.insert(id) {
                                continue;
                            }
                        }
                        let value = violation
                            .target
                            .record_id()
                            .and_then(|id| dataset.get(id))
                            .map(|record| record.get(field));
                        let message = entry.check.render_message(field, value, violation.target);
                        out.push(self.finding(
                            schema,
                            entry,
                            phase,
                            violation.target,
                            message,
                            violation.values,
                            None,
                        ));
                    }
                }
                Err(failure) => {
                    out.push(self.crash(
                        schema,
                        entry,
                        phase,
                        FindingTarget::DatasetWide,
                        BTreeMap::new(),
                        &failure,
                    ));
                }
            }
        }
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn finding(
        &self,
        schema: &Schema,
        entry: &CheckEntry,
        phase: usize,
        target: FindingTarget,
        message: String,
        values: BTreeMap<String, String>,
        severity: Option<Severity>,
    ) -> Ranked {
        let check = &entry.check;
        Ranked {
            phase,
            order: entry.order,
            finding: Finding {
                record: target,
                field: Some(schema.fields()[entry.field].name().to_string()),
                related_fields: check.depends_on().to_vec(),
                check_id: check.id().to_string(),
                check_name: check.name().to_string(),
                severity: severity.unwrap_or_else(|| check.severity()),
                scope: check.scope(),
                phase: schema.phases()[phase].name().to_string(),
                kind: FindingKind::Failed,
                message,
                values,
            },
        }
    }

    fn crash(
        &self,
        schema: &Schema,
        entry: &CheckEntry,
        phase: usize,
        target: FindingTarget,
        mut values: BTreeMap<String, String>,
        failure: &CheckPredicateFailure,
    ) -> Ranked {
        warn!(
            check.id = %entry.check.id(),
            record.id = %target,
            error = %truncate_field(failure.message(), self.config.log.max_field_length),
            "Check crashed"
        );
        values.insert("error".to_string(), failure.message().to_string());
        let message = format!("check '{}' crashed: {failure}", entry.check.id());
        let mut ranked = self.finding(
            schema,
            entry,
            phase,
            target,
            message,
            values,
            Some(Severity::Error),
        );
        ranked.finding.kind = FindingKind::CheckCrashed;
        ranked
    }
}

/// Runs a schema with the default engine configuration.
pub fn run(dataset: &Dataset, schema: &Schema) -> Result<ValidationResult> {
    ValidationEngine::new().run(dataset, schema)
}

// The attached field plus every dependency, as text.
fn capture_values(schema: &Schema, entry: &CheckEntry, record: &Record) -> BTreeMap<String, String> {
    entry
        .reads
        .iter()
        .map(|&fi| {
            let name = schema.fields()[fi].name();
            (name.to_string(), record.get(name).as_text().into_owned())
        })
        .collect()
}

// A violation naming a record outside the dataset is the predicate's fault.
fn verify_violations(
    entry: &CheckEntry,
    dataset: &Dataset,
    violations: Vec<Violation>,
) -> std::result::Result<Vec<Violation>, CheckPredicateFailure> {
    for violation in &violations {
        if let FindingTarget::Record(id) = violation.target {
            if dataset.get(id).is_none() {
                return Err(CheckPredicateFailure::new(format!(
                    "check '{}' reported record {id}, which is not in the dataset",
                    entry.check.id()
                )));
            }
        }
    }
    Ok(violations)
}

// Error findings of a structural phase mark their field. A crash is a bug in
// the check, not a fact about the data, so it never marks.
fn mark_unusable<F>(
    schema: &Schema,
    findings: &[Ranked],
    markers: &mut FieldMarkers,
    mut mark: F,
) where
    F: FnMut(&mut FieldMarkers, RecordId, usize) -> bool,
{
    let entries = schema.entries();
    for ranked in findings {
        let finding = &ranked.finding;
        if finding.severity != Severity::Error || finding.kind == FindingKind::CheckCrashed {
            continue;
        }
        if let FindingTarget::Record(id) = finding.record {
            mark(markers, id, entries[ranked.order].field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Check, FieldDefinition, FieldType, Phase, RunStatus};

    fn loans_schema() -> Schema {
        Schema::builder("loans")
            .field(FieldDefinition::new("loan_amount", FieldType::Number).required())
            .field(FieldDefinition::new("action_taken", FieldType::String))
            .field(FieldDefinition::new("denial_reasons", FieldType::String))
            .check(
                "action_taken",
                Check::field("action_taken.denial_reasons_required", |value, record| {
                    Ok(value.as_text() != "denied" || !record.get("denial_reasons").is_blank())
                })
                .depends_on("denial_reasons")
                .phase(Phase::LOGICAL)
                .message("denial_reasons must be provided when action_taken is '{value}'")
                .build(),
            )
            .build()
            .unwrap()
    }

    fn loans() -> Dataset {
        vec![
            Record::new()
                .with("loan_amount", "1000")
                .with("action_taken", "approved")
                .with("denial_reasons", ""),
            Record::new()
                .with("loan_amount", "abc")
                .with("action_taken", "approved")
                .with("denial_reasons", ""),
            Record::new()
                .with("loan_amount", "500")
                .with("action_taken", "denied")
                .with("denial_reasons", ""),
        ]
        .into()
    }

    #[test]
    fn test_structural_and_logical_findings() {
        let result = run(&loans(), &loans_schema()).unwrap();

        assert_eq!(result.status(), &RunStatus::Completed);
        assert_eq!(result.total(), 2);
        assert!(!result.is_valid());

        let first = &result.findings()[0];
        assert_eq!(first.record, FindingTarget::Record(RecordId::from_index(1)));
        assert_eq!(first.check_id, "loan_amount.invalid_number");
        assert_eq!(first.phase, "syntactical");
        assert_eq!(first.values["loan_amount"], "abc");

        let second = &result.findings()[1];
        assert_eq!(second.record, FindingTarget::Record(RecordId::from_index(2)));
        assert_eq!(second.phase, "logical");
        assert_eq!(
            second.message,
            "denial_reasons must be provided when action_taken is 'denied'"
        );
    }

    #[test]
    fn test_unusable_fields_skip_dependent_checks() {
        let schema = Schema::builder("s")
            .field(FieldDefinition::new("amount", FieldType::Number).required())
            .check(
                "amount",
                Check::field("amount.positive", |v, _| Ok(v.as_f64().is_some_and(|n| n > 0.0)))
                    .phase(Phase::LOGICAL)
                    .build(),
            )
            .build()
            .unwrap();
        let dataset: Dataset = vec![
            Record::new().with("amount", "x"),
            Record::new().with("amount", "-1"),
        ]
        .into();

        let result = run(&dataset, &schema).unwrap();
        let ids: Vec<_> = result.findings().iter().map(|f| f.check_id.as_str()).collect();
        assert_eq!(ids, vec!["amount.invalid_number", "amount.positive"]);
        assert_eq!(result.stats().skipped_unusable, 1);
    }

    #[test]
    fn test_dataset_check_violations_are_collapsed_per_record() {
        let schema = Schema::builder("s")
            .field(FieldDefinition::new("uid", FieldType::String))
            .check(
                "uid",
                Check::dataset("uid.flag_first", |view| {
                    let first = view.iter().next().map(|(id, _)| id);
                    Ok(first
                        .into_iter()
                        .flat_map(|id| [Violation::record(id), Violation::record(id)])
                        .chain([Violation::dataset_wide()])
                        .collect())
                })
                .warning()
                .build(),
            )
            .build()
            .unwrap();
        let dataset: Dataset = vec![Record::new().with("uid", "a")].into();

        let result = run(&dataset, &schema).unwrap();
        assert_eq!(result.total(), 2);
        assert_eq!(result.findings()[1].record, FindingTarget::DatasetWide);
        assert!(result.is_valid());
    }

    #[test]
    fn test_out_of_range_violation_becomes_crash() {
        let schema = Schema::builder("s")
            .field(FieldDefinition::new("uid", FieldType::String))
            .check(
                "uid",
                Check::dataset("uid.bogus", |_| Ok(vec![Violation::record(RecordId::from_index(41))]))
                    .warning()
                    .build(),
            )
            .build()
            .unwrap();
        let dataset: Dataset = vec![Record::new().with("uid", "a")].into();

        let result = run(&dataset, &schema).unwrap();
        assert_eq!(result.crashed().count(), 1);
        assert_eq!(result.findings()[0].severity, Severity::Error);
        assert_eq!(result.findings()[0].record, FindingTarget::DatasetWide);
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancelHandle::new();
        cancel.cancel();
        let result = ValidationEngine::new()
            .run_with_cancel(&loans(), &loans_schema(), &cancel)
            .unwrap();
        assert!(result.is_halted());
        assert!(result.findings().is_empty());
        assert!(result.phases_run().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.workers = 0;
        let err = ValidationEngine::with_config(config)
            .run(&loans(), &loans_schema())
            .unwrap_err();
        assert!(matches!(err, GuardError::Configuration(_)));
    }
}
