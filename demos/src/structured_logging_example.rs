//! Example demonstrating structured logging in regtech-guard.
//!
//! This example shows how to:
//! - Install a JSON subscriber with an environment filter
//! - Tune per-record logging through `LogConfig`
//! - Run with parallel workers and read the run metrics from the log
//!
//! Run with:
//! ```bash
//! RUST_LOG=regtech_guard=debug cargo run --example structured_logging_example
//! ```

use regtech_guard::config::EngineConfig;
use regtech_guard::core::{Dataset, FieldDefinition, FieldType, Phase, Record, Schema, ValidationEngine};
use regtech_guard::logging::setup::{init_logging, LoggingConfig};
use regtech_guard::logging::LogConfig;
use std::error::Error;
use tracing::info;

fn main() -> Result<(), Box<dyn Error>> {
    init_logging(LoggingConfig::development().with_json_format(true))?;

    let dataset: Dataset = (0..5_000)
        .map(|i| {
            let year = if i % 500 == 0 { "20x4" } else { "2024" };
            Record::new()
                .with("app_date", format!("{year}01{:02}", 1 + i % 28))
                .with("ct_credit_product", ["1", "2", "977"][i % 3])
        })
        .collect();

    let schema = Schema::builder("logging_demo")
        .phases(Phase::standard())
        .field(FieldDefinition::new("app_date", FieldType::Date).required())
        .field(
            FieldDefinition::new("ct_credit_product", FieldType::Enumeration)
                .allowed_values(["1", "2", "977"]),
        )
        .build()?;

    // Verbose: every failed evaluation is logged at debug level
    let engine = ValidationEngine::with_config(
        EngineConfig::default()
            .with_workers(4)
            .with_log_config(LogConfig::verbose()),
    );
    let result = engine.run(&dataset, &schema)?;
    info!(run.findings = result.total(), "Verbose run complete");

    // Production: only warnings and the run summary
    let engine = ValidationEngine::with_config(
        EngineConfig::default().with_log_config(LogConfig::production()),
    );
    let result = engine.run(&dataset, &schema)?;
    info!(run.findings = result.total(), "Production run complete");

    Ok(())
}
