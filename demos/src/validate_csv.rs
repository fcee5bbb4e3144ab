//! Validate a CSV file against a JSON schema document.
//!
//! Exits with status 1 when the run ends invalid, halted or aborted.
//!
//! ```bash
//! validate-csv schema.json data.csv --format markdown --workers 4 \
//!     --reference codes.json --code naics_code=naics
//! ```

use clap::Parser;
use regtech_guard::checks;
use regtech_guard::config::EngineConfig;
use regtech_guard::core::{Phase, SchemaSpec, ValidationEngine};
use regtech_guard::formatters::{FormatterConfig, OutputFormat};
use regtech_guard::logging::setup::{init_logging, LoggingConfig};
use regtech_guard::reference::ReferenceData;
use regtech_guard::sources::{CsvOptions, CsvSource, DataSource};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Schema document (JSON)
    schema: PathBuf,

    /// Data file (CSV with a header row)
    data: PathBuf,

    /// Output format: json, text, markdown or csv
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Worker threads; 0 uses every core
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Field delimiter
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Reference code tables (JSON)
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Validate FIELD against reference TABLE, as FIELD=TABLE
    #[arg(long = "code", requires = "reference")]
    codes: Vec<String>,

    /// Emit JSON logs to stderr
    #[arg(long)]
    log_json: bool,
}

fn run(args: Args) -> Result<bool, Box<dyn Error>> {
    let mut builder = SchemaSpec::from_path(&args.schema)?.into_builder()?;

    if let Some(path) = &args.reference {
        let reference = ReferenceData::from_path(path)?.shared();
        for code in &args.codes {
            let (field, table) = code
                .split_once('=')
                .ok_or_else(|| format!("--code expects FIELD=TABLE, got '{code}'"))?;
            let check = checks::valid_code(format!("{field}.invalid_code"), &reference, table, true)?
                .message("'{field}' has '{value}', which is not in the {table} code list")
                .phase(Phase::SYNTACTICAL)
                .build();
            builder = builder.check(field, check);
        }
    }

    let delimiter = u8::try_from(args.delimiter)
        .map_err(|_| format!("delimiter '{}' is not a single byte", args.delimiter))?;
    let source = CsvSource::with_options(
        &args.data,
        CsvOptions::default().with_delimiter(delimiter),
    );
    let dataset = source.load()?;

    let engine = ValidationEngine::with_config(EngineConfig::default().with_workers(args.workers));
    let result = engine.run_schema(&dataset, builder)?;

    let formatter = args.format.formatter(FormatterConfig::default());
    println!("{}", formatter.format(&result)?);

    Ok(result.is_completed() && result.is_valid())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let logging = LoggingConfig::default().with_json_format(args.log_json);
    if let Err(e) = init_logging(logging) {
        eprintln!("cannot install logging: {e}");
    }

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
