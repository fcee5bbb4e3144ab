//! Example demonstrating the result formatters in regtech-guard.
//!
//! This example shows how to format a validation result in different ways:
//! - JSON for programmatic consumption
//! - Human-readable text for the console
//! - Markdown for reports and pull requests
//! - CSV for spreadsheets and downstream loaders

use regtech_guard::checks;
use regtech_guard::core::{Dataset, FieldDefinition, FieldType, GroupBy, Phase, Record, Schema};
use regtech_guard::formatters::{
    CsvFormatter, FormatterConfig, HumanFormatter, JsonFormatter, MarkdownFormatter,
    OutputFormat, ResultFormatter,
};
use std::error::Error;

fn sample_dataset() -> Dataset {
    (1..=20)
        .map(|i| {
            let naics = if i % 5 == 0 { "99".to_string() } else { format!("{}", 110 + i % 3) };
            let ethnicity = if i % 7 == 0 { "1;1" } else { "1;2" };
            let employees = if i % 10 == 0 { "many".to_string() } else { (i * 3).to_string() };
            Record::new()
                .with("naics_code", naics)
                .with("po_1_ethnicity", ethnicity)
                .with("number_of_workers", employees)
        })
        .collect()
}

fn sample_schema() -> Result<Schema, Box<dyn Error>> {
    Ok(Schema::builder("business_profile")
        .phases(Phase::standard())
        .field(FieldDefinition::new("naics_code", FieldType::String))
        .field(FieldDefinition::new("po_1_ethnicity", FieldType::String))
        .field(FieldDefinition::new("number_of_workers", FieldType::Number))
        .check(
            "naics_code",
            checks::exact_length("naics_code.invalid_length", 3, true)
                .message("'{field}' must be exactly 3 digits, found '{value}'")
                .warning()
                .build(),
        )
        .check(
            "po_1_ethnicity",
            checks::no_duplicate_values("po_1_ethnicity.duplicates_in_field")
                .phase(Phase::LOGICAL)
                .warning()
                .build(),
        )
        .check(
            "number_of_workers",
            checks::number_at_least("number_of_workers.minimum", 1.0, true)
                .phase(Phase::LOGICAL)
                .build(),
        )
        .build()?)
}

fn main() -> Result<(), Box<dyn Error>> {
    let result = regtech_guard::run(&sample_dataset(), &sample_schema()?)?;

    println!("\n{}", "=".repeat(80));
    println!("RESULT FORMATTING EXAMPLES");
    println!("{}", "=".repeat(80));

    // Example 1: Convenience methods
    println!("\n📋 1. CONVENIENCE METHODS");
    println!("{}", "─".repeat(40));

    let json = result.to_json()?;
    println!("{}", &json[..200.min(json.len())]);
    if json.len() > 200 {
        println!("... (truncated)");
    }
    println!("\nFingerprint: {}", result.fingerprint()?);

    // Example 2: JSON formatter options
    println!("\n📋 2. JSON FORMATTER OPTIONS");
    println!("{}", "─".repeat(40));

    let compact = JsonFormatter::new().with_pretty(false).format(&result)?;
    println!("{}", &compact[..150.min(compact.len())]);
    println!("\n🔹 Minimal JSON (summary only):");
    println!("{}", JsonFormatter::with_config(FormatterConfig::minimal()).format(&result)?);

    // Example 3: Human formatter options
    println!("\n📋 3. HUMAN FORMATTER OPTIONS");
    println!("{}", "─".repeat(40));

    let no_color = FormatterConfig::default().with_colors(false);
    println!("{}", HumanFormatter::with_config(no_color).format(&result)?);

    println!("\n🔹 Limited findings (max 3):");
    let limited = FormatterConfig::default().with_colors(false).with_max_findings(3);
    println!("{}", HumanFormatter::with_config(limited).format(&result)?);

    // Example 4: Markdown and CSV
    println!("\n📋 4. MARKDOWN AND CSV");
    println!("{}", "─".repeat(40));

    println!("{}", MarkdownFormatter::new().with_heading_level(3).format(&result)?);
    println!("{}", CsvFormatter::new().format(&result)?);

    // Example 5: Picking a format at runtime
    println!("\n📋 5. FORMAT BY NAME");
    println!("{}", "─".repeat(40));

    let format: OutputFormat = "markdown".parse()?;
    let formatter = format.formatter(FormatterConfig::minimal());
    println!("{}", formatter.format(&result)?);

    // Example 6: Grouping
    println!("\n📋 6. FINDINGS BY CHECK");
    println!("{}", "─".repeat(40));

    for (check, findings) in result.group_by(GroupBy::Check) {
        println!("{check}: {} record(s)", findings.len());
    }

    Ok(())
}
