//! End-to-end behaviour of the validation engine: phases, halting, crash
//! isolation, cancellation and parallel evaluation.

use regtech_guard::checks;
use regtech_guard::config::{EngineConfig, HaltPolicy};
use regtech_guard::core::{
    CancelHandle, Check, CheckScope, Dataset, FieldDefinition, FieldType, FindingKind,
    FindingTarget, HaltReason, Phase, Record, RecordId, RunStatus, Schema, Severity,
    ValidationEngine, Violation,
};
use regtech_guard::error::CheckPredicateFailure;
use regtech_guard::test_fixtures::{generated_loans, loans_dataset, loans_schema};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn record_ids(result: &regtech_guard::core::ValidationResult) -> Vec<Option<usize>> {
    result
        .findings()
        .iter()
        .map(|f| f.record.record_id().map(RecordId::get))
        .collect()
}

#[test]
fn test_three_record_scenario() {
    let result = regtech_guard::run(&loans_dataset(), &loans_schema()).unwrap();

    assert_eq!(result.status(), &RunStatus::Completed);
    assert_eq!(result.phases_run(), ["syntactical", "logical"]);
    assert_eq!(result.total(), 2);
    assert!(!result.is_valid());

    let structural = &result.findings()[0];
    assert_eq!(structural.record, FindingTarget::Record(RecordId::from_index(1)));
    assert_eq!(structural.check_id, "loan_amount.invalid_number");
    assert_eq!(structural.phase, "syntactical");
    assert_eq!(structural.severity, Severity::Error);
    assert_eq!(structural.field.as_deref(), Some("loan_amount"));

    let logical = &result.findings()[1];
    assert_eq!(logical.record, FindingTarget::Record(RecordId::from_index(2)));
    assert_eq!(logical.check_id, "denial_reasons.required_when_denied");
    assert_eq!(logical.phase, "logical");
    assert_eq!(logical.scope, CheckScope::CrossField);
    assert_eq!(
        logical.message,
        "denial_reasons must be provided when action_taken is denied"
    );
}

#[test]
fn test_halts_when_required_column_is_absent_everywhere() {
    let logical_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&logical_calls);

    let schema = Schema::builder("halting")
        .phases(Phase::standard())
        .field(FieldDefinition::new("uid", FieldType::String).required())
        .field(FieldDefinition::new("x", FieldType::String).required())
        .check(
            "uid",
            Check::field("uid.logical", move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(false)
            })
            .phase(Phase::LOGICAL)
            .build(),
        )
        .build()
        .unwrap();
    let dataset: Dataset = (0..4)
        .map(|i| Record::new().with("uid", format!("U{i}")))
        .collect();

    let result = ValidationEngine::new().run(&dataset, &schema).unwrap();

    match result.status() {
        RunStatus::Halted { phase, reason } => {
            assert_eq!(phase, "syntactical");
            assert_eq!(
                reason,
                &HaltReason::RequiredFieldUnusable {
                    field: "x".to_string(),
                    unusable: 4,
                    total: 4,
                }
            );
        }
        other => panic!("expected halted, got {other:?}"),
    }
    assert_eq!(result.phases_run(), ["syntactical"]);
    assert_eq!(result.total(), 4);
    assert!(result.findings().iter().all(|f| f.check_id == "x.required"));
    assert_eq!(logical_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_threshold_halt_policy() {
    let schema = loans_schema();
    let dataset: Dataset = vec![
        Record::new().with("loan_amount", "abc"),
        Record::new().with("loan_amount", "10"),
    ]
    .into();

    let lenient = ValidationEngine::new().run(&dataset, &schema).unwrap();
    assert!(lenient.is_completed());

    let strict = ValidationEngine::with_config(
        EngineConfig::default().with_halt_policy(HaltPolicy::threshold(0.5)),
    )
    .run(&dataset, &schema)
    .unwrap();
    assert!(strict.is_halted());
}

#[test]
fn test_crash_isolation() {
    let schema = Schema::builder("crashy")
        .field(FieldDefinition::new("a", FieldType::String))
        .field(FieldDefinition::new("b", FieldType::Number))
        .check(
            "a",
            Check::field("a.always_errs", |_, _| {
                Err(CheckPredicateFailure::new("lookup table unavailable"))
            })
            .warning()
            .build(),
        )
        .check(
            "a",
            Check::field("a.panics", |value, _| {
                if value.as_text() == "boom" {
                    panic!("unexpected input");
                }
                Ok(true)
            })
            .build(),
        )
        .check(
            "b",
            checks::number_less_than("b.small", 10.0, true).build(),
        )
        .build()
        .unwrap();
    let dataset: Dataset = vec![
        Record::new().with("a", "ok").with("b", "1"),
        Record::new().with("a", "boom").with("b", "50"),
        Record::new().with("a", "ok").with("b", "2"),
    ]
    .into();

    let result = ValidationEngine::new().run(&dataset, &schema).unwrap();
    assert!(result.is_completed());

    let always: Vec<_> = result
        .findings()
        .iter()
        .filter(|f| f.check_id == "a.always_errs")
        .collect();
    assert_eq!(always.len(), 3);
    assert!(always
        .iter()
        .all(|f| f.kind == FindingKind::CheckCrashed && f.severity == Severity::Error));
    assert!(always[0].message.contains("lookup table unavailable"));

    let panicked: Vec<_> = result
        .findings()
        .iter()
        .filter(|f| f.check_id == "a.panics")
        .collect();
    assert_eq!(panicked.len(), 1);
    assert_eq!(panicked[0].record, FindingTarget::Record(RecordId::from_index(1)));
    assert!(panicked[0].values["error"].contains("unexpected input"));

    let ordinary: Vec<_> = result
        .findings()
        .iter()
        .filter(|f| f.check_id == "b.small")
        .collect();
    assert_eq!(ordinary.len(), 1);
    assert_eq!(ordinary[0].kind, FindingKind::Failed);
    assert_eq!(result.crashed().count(), 4);
}

#[test]
fn test_crashed_check_does_not_mark_or_halt() {
    let dependent_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&dependent_calls);

    let schema = Schema::builder("crash_then_logic")
        .phases(Phase::standard())
        .field(FieldDefinition::new("uid", FieldType::String).required())
        .field(FieldDefinition::new("b", FieldType::String))
        .check(
            "uid",
            Check::field("uid.lookup", |_, _| {
                Err(CheckPredicateFailure::new("registry offline"))
            })
            .phase(Phase::SYNTACTICAL)
            .warning()
            .build(),
        )
        .check(
            "b",
            Check::field("b.logical", |_, _| Ok(false))
                .phase(Phase::LOGICAL)
                .build(),
        )
        .check(
            "b",
            Check::field("b.reads_uid", move |_, record| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(!record.get("uid").is_blank())
            })
            .depends_on("uid")
            .phase(Phase::LOGICAL)
            .build(),
        )
        .build()
        .unwrap();
    let dataset: Dataset = (1..=3)
        .map(|i| Record::new().with("uid", format!("U{i}")).with("b", "x"))
        .collect();

    let result = ValidationEngine::new().run(&dataset, &schema).unwrap();

    assert_eq!(result.status(), &RunStatus::Completed);
    assert_eq!(result.phases_run(), ["syntactical", "logical"]);
    assert_eq!(result.crashed().count(), 3);
    let logical = result
        .findings()
        .iter()
        .filter(|f| f.check_id == "b.logical")
        .count();
    assert_eq!(logical, 3);
    assert_eq!(dependent_calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_cross_record_failure_marks_but_does_not_halt() {
    let dependent_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&dependent_calls);

    let schema = Schema::builder("shared_uid")
        .phases(Phase::standard())
        .field(FieldDefinition::new("uid", FieldType::String).required())
        .field(FieldDefinition::new("b", FieldType::String))
        .check(
            "uid",
            checks::composite_key_unique("uid.duplicates_in_dataset", ["uid"], Default::default())
                .phase(Phase::SYNTACTICAL)
                .build(),
        )
        .check(
            "b",
            Check::field("b.logical", |_, _| Ok(false))
                .phase(Phase::LOGICAL)
                .build(),
        )
        .check(
            "b",
            Check::field("b.reads_uid", move |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            })
            .depends_on("uid")
            .phase(Phase::LOGICAL)
            .build(),
        )
        .build()
        .unwrap();
    let dataset: Dataset = vec![
        Record::new().with("uid", "SAME").with("b", "x"),
        Record::new().with("uid", "SAME").with("b", "y"),
    ]
    .into();

    let result = ValidationEngine::new().run(&dataset, &schema).unwrap();

    assert_eq!(result.status(), &RunStatus::Completed);
    assert_eq!(result.phases_run(), ["syntactical", "logical"]);
    let ids: Vec<&str> = result.findings().iter().map(|f| f.check_id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "uid.duplicates_in_dataset",
            "b.logical",
            "uid.duplicates_in_dataset",
            "b.logical"
        ]
    );
    // uid is still unusable for checks that read it
    assert_eq!(dependent_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_warning_structural_checks_never_halt() {
    let schema = Schema::builder("soft_structure")
        .phases(Phase::standard())
        .field(
            FieldDefinition::new("uid", FieldType::String)
                .required()
                .structural_severity(Severity::Warning),
        )
        .field(FieldDefinition::new("b", FieldType::String))
        .check(
            "b",
            Check::field("b.logical", |_, _| Ok(false))
                .phase(Phase::LOGICAL)
                .warning()
                .build(),
        )
        .build()
        .unwrap();
    let dataset: Dataset = vec![Record::new().with("b", "x"), Record::new().with("b", "y")].into();

    let result = ValidationEngine::new().run(&dataset, &schema).unwrap();

    assert_eq!(result.status(), &RunStatus::Completed);
    assert_eq!(result.phases_run(), ["syntactical", "logical"]);
    assert_eq!(result.total(), 4);
    assert_eq!(
        result
            .findings()
            .iter()
            .filter(|f| f.check_id == "uid.required" && f.severity == Severity::Warning)
            .count(),
        2
    );
    assert!(result.is_valid());
}

#[test]
fn test_dataset_check_crash_is_dataset_wide() {
    let schema = Schema::builder("s")
        .field(FieldDefinition::new("a", FieldType::String))
        .check(
            "a",
            Check::dataset("a.broken", |_| Err(CheckPredicateFailure::new("nope"))).build(),
        )
        .build()
        .unwrap();
    let dataset: Dataset = vec![Record::new().with("a", "1")].into();
    let result = ValidationEngine::new().run(&dataset, &schema).unwrap();

    assert_eq!(result.total(), 1);
    assert!(result.findings()[0].record.is_dataset_wide());
    assert!(result.findings()[0].is_crash());
}

#[test]
fn test_structural_failure_suppresses_cascades() {
    let later_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&later_calls);
    let schema = Schema::builder("cascade")
        .field(FieldDefinition::new("amount", FieldType::Number))
        .field(FieldDefinition::new("uid", FieldType::String))
        .check(
            "uid",
            Check::field("uid.amount_positive", move |_, record| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(record.get("amount").as_f64().map_or(false, |v| v > 0.0))
            })
            .depends_on("amount")
            .phase(Phase::LOGICAL)
            .build(),
        )
        .check(
            "amount",
            checks::composite_key_unique("amount.unique", ["amount"], Default::default())
                .phase(Phase::LOGICAL)
                .build(),
        )
        .build()
        .unwrap();
    let dataset: Dataset = vec![
        Record::new().with("uid", "A").with("amount", "x"),
        Record::new().with("uid", "B").with("amount", "x"),
        Record::new().with("uid", "C").with("amount", "5"),
    ]
    .into();

    let result = ValidationEngine::new().run(&dataset, &schema).unwrap();

    assert_eq!(record_ids(&result), [Some(1), Some(2)]);
    assert!(result
        .findings()
        .iter()
        .all(|f| f.check_id == "amount.invalid_number"));
    assert_eq!(later_calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.stats().skipped_unusable, 2);
}

#[test]
fn test_duplicate_violations_collapse_per_record() {
    let schema = Schema::builder("s")
        .field(FieldDefinition::new("a", FieldType::String))
        .check(
            "a",
            Check::dataset("a.twice", |view| {
                Ok(view
                    .iter()
                    .flat_map(|(id, _)| [Violation::record(id), Violation::record(id)])
                    .collect())
            })
            .build(),
        )
        .build()
        .unwrap();
    let dataset: Dataset = vec![Record::new().with("a", "1"), Record::new().with("a", "2")].into();
    let result = ValidationEngine::new().run(&dataset, &schema).unwrap();
    assert_eq!(record_ids(&result), [Some(1), Some(2)]);
}

#[test]
fn test_aborted_on_invalid_schema() {
    let builder = Schema::builder("broken")
        .field(FieldDefinition::new("a", FieldType::String))
        .check("a", Check::field("dup", |_, _| Ok(true)).build())
        .check("a", Check::field("dup", |_, _| Ok(true)).build());

    let result = ValidationEngine::new()
        .run_schema(&loans_dataset(), builder)
        .unwrap();

    assert!(result.is_aborted());
    assert!(result.findings().is_empty());
    assert!(result.phases_run().is_empty());
    match result.status() {
        RunStatus::Aborted { reason } => assert!(reason.contains("dup")),
        other => panic!("expected aborted, got {other:?}"),
    }
}

#[test]
fn test_cancellation_before_start() {
    let cancel = CancelHandle::new();
    cancel.cancel();
    let result = ValidationEngine::new()
        .run_with_cancel(&loans_dataset(), &loans_schema(), &cancel)
        .unwrap();

    assert!(result.is_halted());
    assert!(matches!(
        result.status(),
        RunStatus::Halted {
            reason: HaltReason::Cancelled,
            ..
        }
    ));
    assert!(result.findings().is_empty());
}

#[test]
fn test_cancellation_between_phases() {
    let cancel = CancelHandle::new();
    let trigger = cancel.clone();
    let schema = Schema::builder("s")
        .phases(Phase::standard())
        .field(FieldDefinition::new("a", FieldType::String))
        .check(
            "a",
            Check::field("a.structural", move |_, _| {
                trigger.cancel();
                Ok(false)
            })
            .build(),
        )
        .check(
            "a",
            Check::field("a.logical", |_, _| Ok(false))
                .phase(Phase::LOGICAL)
                .build(),
        )
        .build()
        .unwrap();
    let dataset: Dataset = vec![Record::new().with("a", "1")].into();

    let result = ValidationEngine::new()
        .run_with_cancel(&dataset, &schema, &cancel)
        .unwrap();

    assert!(result.is_halted());
    assert_eq!(result.phases_run(), ["syntactical"]);
    assert_eq!(result.total(), 1);
    assert_eq!(result.findings()[0].check_id, "a.structural");
}

#[test]
fn test_parallel_matches_sequential() {
    let schema = loans_schema();
    let dataset = generated_loans(2_000);

    let sequential = ValidationEngine::new().run(&dataset, &schema).unwrap();
    let parallel = ValidationEngine::with_config(
        EngineConfig::default()
            .with_workers(4)
            .with_parallel_threshold(1),
    )
    .run(&dataset, &schema)
    .unwrap();

    assert!(sequential.total() > 0);
    assert_eq!(sequential.findings(), parallel.findings());
    assert_eq!(
        sequential.fingerprint().unwrap(),
        parallel.fingerprint().unwrap()
    );
}

#[test]
fn test_warnings_do_not_invalidate() {
    let schema = Schema::builder("s")
        .field(FieldDefinition::new("a", FieldType::String))
        .check("a", Check::field("a.soft", |_, _| Ok(false)).warning().build())
        .build()
        .unwrap();
    let dataset: Dataset = vec![Record::new().with("a", "1")].into();
    let result = ValidationEngine::new().run(&dataset, &schema).unwrap();

    assert_eq!(result.total(), 1);
    assert!(result.has_warnings());
    assert!(result.is_valid());
}

#[test]
fn test_empty_dataset_completes() {
    let result = regtech_guard::run(&Dataset::default(), &loans_schema()).unwrap();
    assert!(result.is_completed());
    assert!(result.is_valid());
}
