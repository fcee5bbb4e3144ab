//! Shared fixtures for unit tests, integration tests and benches.
//!
//! Compiled for tests and behind the `test-utils` feature.

use crate::checks::{self, UniqueKeyOptions};
use crate::core::{Dataset, FieldDefinition, FieldType, Phase, Record, Schema, ValidationResult};

/// The loans schema: a required numeric `loan_amount`, an `action_taken`
/// enumeration and a logical rule requiring `denial_reasons` for denied
/// applications.
pub fn loans_schema() -> Schema {
    Schema::builder("loans")
        .phases(Phase::standard())
        .field(
            FieldDefinition::new("loan_amount", FieldType::Number)
                .title("Amount applied for")
                .required(),
        )
        .field(
            FieldDefinition::new("action_taken", FieldType::Enumeration)
                .allowed_values(["approved", "denied", "withdrawn"]),
        )
        .field(FieldDefinition::new("denial_reasons", FieldType::String))
        .check(
            "denial_reasons",
            checks::conditional_requirement(
                "denial_reasons.required_when_denied",
                "action_taken",
                ["denied"],
            )
            .name("Denial reasons")
            .message("{field} must be provided when {other_field} is {condition_values}")
            .phase(Phase::LOGICAL)
            .build(),
        )
        .build()
        .unwrap_or_else(|e| panic!("loans schema is valid: {e}"))
}

/// Three records: valid, a non-numeric amount, a denial without reasons.
pub fn loans_dataset() -> Dataset {
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

pub fn sample_schema_and_dataset() -> (Schema, Dataset) {
    (loans_schema(), loans_dataset())
}

/// The result of running [`loans_schema`] over [`loans_dataset`]: two
/// findings, record 2 in `syntactical` then record 3 in `logical`.
pub fn sample_result() -> ValidationResult {
    let (schema, dataset) = sample_schema_and_dataset();
    crate::core::run(&dataset, &schema).unwrap_or_else(|e| panic!("sample run failed: {e}"))
}

/// `records` loan rows where every seventh amount is malformed and every
/// fifth denial lacks reasons.
pub fn generated_loans(records: usize) -> Dataset {
    (0..records)
        .map(|i| {
            let amount = if i % 7 == 3 {
                "n/a".to_string()
            } else {
                (1000 + i * 25).to_string()
            };
            let (action, reasons) = match i % 4 {
                0 => ("denied", if i % 5 == 0 { "" } else { "1;2" }),
                1 => ("withdrawn", ""),
                _ => ("approved", ""),
            };
            Record::new()
                .with("loan_amount", amount)
                .with("action_taken", action)
                .with("denial_reasons", reasons)
        })
        .collect()
}

/// A schema with one composite-key uniqueness check over `(lei, uid)`.
pub fn uniqueness_schema(options: UniqueKeyOptions) -> Schema {
    Schema::builder("uniqueness")
        .field(FieldDefinition::new("lei", FieldType::String).required())
        .field(FieldDefinition::new("uid", FieldType::String).required())
        .check(
            "uid",
            checks::composite_key_unique("uid.duplicates_in_dataset", ["lei", "uid"], options)
                .build(),
        )
        .build()
        .unwrap_or_else(|e| panic!("uniqueness schema is valid: {e}"))
}

/// `records` rows with distinct `(lei, uid)` keys, except that the last row
/// repeats the key of the first.
pub fn keyed_dataset(records: usize) -> Dataset {
    (0..records)
        .map(|i| {
            let key = if records > 1 && i == records - 1 { 0 } else { i };
            Record::new()
                .with("lei", format!("LEI{:017}", key % 3))
                .with("uid", format!("UID{key:019}"))
        })
        .collect()
}
