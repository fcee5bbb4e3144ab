//! # regtech-guard - Phased validation for regulatory datasets
//!
//! regtech-guard validates tabular submissions (rows of named fields) against
//! a declared schema and a library of business rules, and produces a
//! reproducible, ordered list of findings.
//!
//! ## Overview
//!
//! A [`Schema`](core::Schema) holds field definitions, the checks attached to
//! them and an ordered list of phases. Structural phases come first: a record
//! that fails a structural check on a field has that field marked unusable,
//! and later checks reading it are skipped for that record instead of
//! producing cascading findings. If a required field is unusable across the
//! dataset, the run halts before the logical phases.
//!
//! ## Quick Start
//!
//! ```rust
//! use regtech_guard::prelude::*;
//! use regtech_guard::checks;
//! use regtech_guard::sources::CsvSource;
//!
//! let schema = Schema::builder("loans")
//!     .field(FieldDefinition::new("uid", FieldType::String).required())
//!     .field(FieldDefinition::new("loan_amount", FieldType::Number).required())
//!     .field(FieldDefinition::new("action_taken", FieldType::String))
//!     .field(FieldDefinition::new("denial_reasons", FieldType::String))
//!     .check(
//!         "uid",
//!         checks::composite_key_unique("uid.duplicates_in_dataset", ["uid"], Default::default())
//!             .phase(Phase::SYNTACTICAL)
//!             .build(),
//!     )
//!     .check(
//!         "denial_reasons",
//!         checks::conditional_requirement("denial_reasons.required", "action_taken", ["denied"])
//!             .phase(Phase::LOGICAL)
//!             .build(),
//!     )
//!     .build()?;
//!
//! let csv = "uid,loan_amount,action_taken,denial_reasons\n\
//!            A1,1000,approved,\n\
//!            A2,abc,approved,\n\
//!            A3,500,denied,\n";
//! let dataset = CsvSource::from_reader(csv.as_bytes(), &Default::default())?;
//!
//! let result = regtech_guard::run(&dataset, &schema)?;
//! assert!(result.is_completed());
//! assert!(!result.is_valid());
//! assert_eq!(result.total(), 2);
//! println!("{}", result.to_human()?);
//! # Ok::<(), GuardError>(())
//! ```
//!
//! ## Architecture
//!
//! - **`core`**: checks, fields, phases, the schema, the phase orchestrator,
//!   the validation engine and the results model
//! - **`checks`**: factories for the recurring business rules
//! - **`reference`**: immutable code tables injected into checks
//! - **`sources`**: CSV and JSON loaders
//! - **`formatters`**: JSON, human-readable, Markdown and CSV output
//! - **`config`** / **`logging`**: engine and logging configuration
//!
//! ## Determinism
//!
//! For a fixed dataset and schema, findings are ordered by record, then
//! phase, then check definition order, whatever the number of worker
//! threads. [`ValidationResult::fingerprint`](core::ValidationResult::fingerprint)
//! hashes that output so reruns can be compared cheaply.

pub mod checks;
pub mod config;
pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod reference;
pub mod sources;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;

pub use crate::core::run;
