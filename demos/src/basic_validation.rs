//! Basic validation example demonstrating regtech-guard's core functionality.
//!
//! This example shows how to:
//! - Declare a schema with typed fields and the standard phases
//! - Attach business checks from the check library
//! - Load a CSV file and interpret the phased result
//!
//! Run with:
//! ```bash
//! cargo run --example basic_validation
//! ```

use regtech_guard::checks::{self, UniqueKeyOptions};
use regtech_guard::core::{FieldDefinition, FieldType, Phase, Schema, Severity};
use regtech_guard::sources::{CsvSource, DataSource};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let csv_data = "\
uid,app_date,action_taken,action_date,amount_applied_for,denial_reasons
123456789TESTBANK00001,20240105,1,20240110,25000,
123456789TESTBANK00002,20240107,3,20240112,18000,
123456789TESTBANK00003,20240109,3,20240114,,1;2
123456789TESTBANK00003,20240132,1,20240115,40000,
123456789TESTBANK00005,20240111,1,20240101,-5,
";

    let dir = tempfile::tempdir()?;
    let file_path = dir.path().join("applications.csv");
    std::fs::write(&file_path, csv_data)?;

    let schema = Schema::builder("small_business_lending")
        .phases(Phase::standard())
        .field(
            FieldDefinition::new("uid", FieldType::String)
                .title("Unique identifier")
                .required(),
        )
        .field(FieldDefinition::new("app_date", FieldType::Date).required())
        .field(
            FieldDefinition::new("action_taken", FieldType::Enumeration)
                .required()
                .allowed_values(["1", "2", "3", "4", "5"]),
        )
        .field(FieldDefinition::new("action_date", FieldType::Date))
        .field(FieldDefinition::new("amount_applied_for", FieldType::Number))
        .field(FieldDefinition::new("denial_reasons", FieldType::String))
        .check(
            "uid",
            checks::valid_uid("uid.invalid_format")
                .message("'{field}' must be 21 to 45 upper-case letters or digits")
                .phase(Phase::SYNTACTICAL)
                .build(),
        )
        .check(
            "uid",
            checks::composite_key_unique(
                "uid.duplicates_in_dataset",
                ["uid"],
                UniqueKeyOptions::new(),
            )
            .phase(Phase::LOGICAL)
            .build(),
        )
        .check(
            "action_date",
            checks::date_after("action_date.before_app_date", "app_date")
                .message("'{field}' must not precede {other_field}")
                .phase(Phase::LOGICAL)
                .build(),
        )
        .check(
            "amount_applied_for",
            checks::number_greater_than("amount_applied_for.positive", 0.0, true)
                .phase(Phase::LOGICAL)
                .build(),
        )
        .check(
            "denial_reasons",
            checks::conditional_requirement(
                "denial_reasons.required_when_denied",
                "action_taken",
                ["3"],
            )
            .message("{field} must be provided when {other_field} is {condition_values}")
            .phase(Phase::LOGICAL)
            .warning()
            .build(),
        )
        .build()?;

    let dataset = CsvSource::new(&file_path).load()?;
    let result = regtech_guard::run(&dataset, &schema)?;

    println!("Validation Results:");
    println!("==================");
    println!("Status: {}", result.status().as_str());
    println!("Phases run: {}", result.phases_run().join(", "));
    println!(
        "Findings: {} ({} errors, {} warnings)",
        result.total(),
        result.count_by_severity(Severity::Error),
        result.count_by_severity(Severity::Warning)
    );
    println!();

    for finding in result.findings() {
        let level = match finding.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        println!(
            "  [{level}] record {} / {}: {}",
            finding.record, finding.check_id, finding.message
        );
    }

    println!();
    if result.is_valid() {
        println!("✅ Dataset passed all error-level checks");
    } else {
        println!("❌ Dataset has errors that must be fixed before submission");
    }

    Ok(())
}
