//! Core validation types for the regtech-guard rule engine.
//!
//! This module provides the fundamental types for declaring a schema of
//! fields, checks and phases, and for running it against a dataset.
//!
//! ## Overview
//!
//! - **[`Check`]**: one named rule with a severity and a predicate, either
//!   per record ([`CheckKind::Field`]) or over the whole dataset
//!   ([`CheckKind::Dataset`])
//! - **[`FieldDefinition`]**: a column with a type, nullability, domain
//!   metadata and attached checks
//! - **[`Phase`]**: an ordered, named stage; structural phases mark failing
//!   fields unusable for later phases
//! - **[`Schema`]**: fields plus phases, validated once and immutable
//! - **[`ValidationEngine`]**: runs a schema against a [`Dataset`]
//! - **[`ValidationResult`]**: ordered [`Finding`]s plus a terminal
//!   [`RunStatus`]
//!
//! ## Architecture
//!
//! ```text
//! Schema
//!     ├── Phase "syntactical" (structural)
//!     │   ├── loan_amount.required        (derived)
//!     │   ├── loan_amount.invalid_number  (derived)
//!     │   └── uid.duplicates              (dataset check)
//!     └── Phase "logical"
//!         └── action_taken.denial_reasons (cross-field check)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use regtech_guard::core::{
//!     Check, Dataset, FieldDefinition, FieldType, Phase, Record, RunStatus, Schema,
//!     ValidationEngine,
//! };
//!
//! let schema = Schema::builder("loans")
//!     .phases(Phase::standard())
//!     .field(FieldDefinition::new("loan_amount", FieldType::Number).required())
//!     .field(FieldDefinition::new("action_taken", FieldType::String))
//!     .field(FieldDefinition::new("denial_reasons", FieldType::String))
//!     .check(
//!         "action_taken",
//!         Check::field("action_taken.denial_reasons", |value, record| {
//!             Ok(value.as_text() != "denied" || !record.get("denial_reasons").is_blank())
//!         })
//!         .depends_on("denial_reasons")
//!         .phase("logical")
//!         .build(),
//!     )
//!     .build()?;
//!
//! let dataset: Dataset = vec![
//!     Record::new().with("loan_amount", "1000").with("action_taken", "approved"),
//!     Record::new().with("loan_amount", "abc").with("action_taken", "approved"),
//!     Record::new().with("loan_amount", "500").with("action_taken", "denied"),
//! ]
//! .into();
//!
//! let result = ValidationEngine::new().run(&dataset, &schema)?;
//! assert_eq!(result.status(), &RunStatus::Completed);
//! assert_eq!(result.total(), 2);
//! assert!(!result.is_valid());
//! # Ok::<(), regtech_guard::error::GuardError>(())
//! ```

pub mod check;
pub mod engine;
pub mod field;
mod markers;
pub mod orchestrator;
pub mod phase;
pub mod record;
pub mod result;
pub mod schema;
pub mod severity;
pub mod value;

pub use check::{
    Check, CheckBuilder, CheckKind, CheckScope, DatasetPredicate, DatasetView, FieldPredicate,
    Outcome, PredicateResult, Violation,
};
pub use engine::{run, CancelHandle, ValidationEngine};
pub use field::{parse_date, value_as_date, FieldDefinition, FieldSpec, FieldType, DEFAULT_DATE_FORMAT};
pub use orchestrator::{PhaseOrchestrator, RunState};
pub use phase::{Phase, PhaseKind};
pub use record::{Dataset, Record, RecordId};
pub use result::{
    EvaluationStats, Finding, FindingKind, FindingTarget, GroupBy, HaltReason, RunStatus,
    ValidationResult, NO_FIELD_KEY,
};
pub use schema::{Schema, SchemaBuilder, SchemaSpec};
pub use severity::Severity;
pub use value::{Value, DEFAULT_SEPARATOR};
