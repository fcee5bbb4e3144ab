//! Result formatting and reporting for validation results.
//!
//! This module provides formatters that render a [`ValidationResult`] as
//! JSON, human-readable text, Markdown or CSV. JSON and CSV keep every
//! finding attribute so downstream tools can read them back.
//!
//! # Examples
//!
//! ```rust
//! use regtech_guard::core::ValidationResult;
//! use regtech_guard::formatters::{FormatterConfig, HumanFormatter, ResultFormatter};
//!
//! let result = ValidationResult::aborted("sblar", "duplicate field name 'uid'");
//! let output = HumanFormatter::with_config(FormatterConfig::ci())
//!     .format(&result)
//!     .unwrap();
//! assert!(output.contains("Validation ABORTED"));
//! ```

use crate::core::{Finding, FindingKind, Severity, ValidationResult};
use crate::error::{GuardError, Result};
use std::fmt::Write;
use std::str::FromStr;

/// Configuration options for formatting validation results.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the count summary
    pub include_summary: bool,
    /// Include individual findings
    pub include_findings: bool,
    /// Include captured values of each finding
    pub include_values: bool,
    /// Maximum number of findings to display (`None` for all)
    pub max_findings: Option<usize>,
    /// Whether to use colorized output (human formatter)
    pub use_colors: bool,
    /// Whether to stamp the report with the time it was rendered
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_findings: true,
            include_values: true,
            max_findings: None,
            use_colors: true,
            include_timestamps: false,
        }
    }
}

impl FormatterConfig {
    /// Creates a minimal configuration showing only the summary.
    pub fn minimal() -> Self {
        Self {
            include_summary: true,
            include_findings: false,
            include_values: false,
            max_findings: Some(0),
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Creates a detailed configuration showing everything.
    pub fn detailed() -> Self {
        Self {
            include_timestamps: true,
            ..Self::default()
        }
    }

    /// Creates a configuration suitable for CI/CD environments.
    pub fn ci() -> Self {
        Self {
            include_summary: true,
            include_findings: true,
            include_values: false,
            max_findings: Some(50),
            use_colors: false,
            include_timestamps: true,
        }
    }

    /// Sets whether to include individual findings.
    pub fn with_findings(mut self, include: bool) -> Self {
        self.include_findings = include;
        self
    }

    /// Sets whether to include captured values.
    pub fn with_values(mut self, include: bool) -> Self {
        self.include_values = include;
        self
    }

    /// Sets the maximum number of findings to display.
    pub fn with_max_findings(mut self, max: usize) -> Self {
        self.max_findings = Some(max);
        self
    }

    /// Sets whether to use colorized output.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Sets whether to stamp the report with the rendering time.
    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = include;
        self
    }

    fn shown<'r>(&self, result: &'r ValidationResult) -> &'r [Finding] {
        if !self.include_findings {
            return &[];
        }
        let all = result.findings();
        match self.max_findings {
            Some(max) => &all[..max.min(all.len())],
            None => all,
        }
    }
}

/// Trait for formatting validation results into different output formats.
///
/// # Examples
///
/// ```rust
/// use regtech_guard::core::ValidationResult;
/// use regtech_guard::formatters::ResultFormatter;
///
/// struct StatusOnly;
///
/// impl ResultFormatter for StatusOnly {
///     fn format(&self, result: &ValidationResult) -> regtech_guard::prelude::Result<String> {
///         Ok(result.status().to_string())
///     }
/// }
///
/// let result = ValidationResult::aborted("s", "no phases");
/// assert_eq!(StatusOnly.format(&result).unwrap(), "aborted: no phases");
/// ```
pub trait ResultFormatter {
    /// Formats a validation result into a string representation.
    fn format(&self, result: &ValidationResult) -> Result<String>;

    /// Formats a validation result with custom configuration.
    fn format_with_config(
        &self,
        result: &ValidationResult,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(result)
    }
}

/// The output formats known to [`OutputFormat::formatter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// [`JsonFormatter`]
    Json,
    /// [`HumanFormatter`]
    Text,
    /// [`MarkdownFormatter`]
    Markdown,
    /// [`CsvFormatter`]
    Csv,
}

impl OutputFormat {
    /// Creates the matching formatter.
    pub fn formatter(self, config: FormatterConfig) -> Box<dyn ResultFormatter> {
        match self {
            OutputFormat::Json => Box::new(JsonFormatter::with_config(config)),
            OutputFormat::Text => Box::new(HumanFormatter::with_config(config)),
            OutputFormat::Markdown => Box::new(MarkdownFormatter::with_config(config)),
            OutputFormat::Csv => Box::new(CsvFormatter::with_config(config)),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" | "human" => Ok(OutputFormat::Text),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(GuardError::Configuration(format!(
                "unknown output format '{other}' (expected json, text, markdown or csv)"
            ))),
        }
    }
}

/// Formats validation results as structured JSON.
///
/// The output is the serde serialization of [`ValidationResult`], so it can
/// be parsed back with `serde_json::from_str`.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter with default configuration.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    /// Creates a new JSON formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for JsonFormatter {
    fn format(&self, result: &ValidationResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(
        &self,
        result: &ValidationResult,
        config: &FormatterConfig,
    ) -> Result<String> {
        let shown = config.shown(result);
        let filtered;
        let result = if shown.len() == result.total() && config.include_values {
            result
        } else {
            let findings = shown
                .iter()
                .cloned()
                .map(|mut f| {
                    if !config.include_values {
                        f.values.clear();
                    }
                    f
                })
                .collect();
            filtered = result.with_findings(findings);
            &filtered
        };

        let rendered = if self.pretty {
            serde_json::to_string_pretty(result)
        } else {
            serde_json::to_string(result)
        };
        rendered.map_err(|e| {
            GuardError::Serialization(format!("Failed to serialize result to JSON: {e}"))
        })
    }
}

/// Formats validation results for terminals and logs.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    /// Creates a new human formatter with default configuration.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    /// Creates a new human formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn headline(result: &ValidationResult) -> &'static str {
    if result.is_aborted() {
        "Validation ABORTED"
    } else if result.is_halted() {
        "Validation HALTED"
    } else if result.is_valid() {
        "Validation PASSED"
    } else {
        "Validation FAILED"
    }
}

fn marker(result: &ValidationResult) -> &'static str {
    if result.is_completed() && result.is_valid() {
        "✅"
    } else if result.is_halted() {
        "⛔"
    } else {
        "❌"
    }
}

fn severity_symbol(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "🚨",
        Severity::Warning => "⚠️",
    }
}

fn render_values(finding: &Finding) -> String {
    finding
        .values
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ResultFormatter for HumanFormatter {
    fn format(&self, result: &ValidationResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(
        &self,
        result: &ValidationResult,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        let color = |code: &str, text: &str| {
            if config.use_colors {
                format!("\x1b[{code}m{text}\x1b[0m")
            } else {
                text.to_string()
            }
        };

        writeln!(output)?;
        let code = if result.is_completed() && result.is_valid() {
            "32"
        } else {
            "31"
        };
        writeln!(output, "{} {}", marker(result), color(code, headline(result)))?;
        writeln!(output)?;
        writeln!(output, "Schema: {}", result.schema_name())?;
        writeln!(output, "Status: {}", result.status())?;

        if config.include_timestamps {
            writeln!(output, "Generated: {}", chrono::Utc::now().to_rfc3339())?;
        }

        if config.include_summary {
            let errors = result.count_by_severity(Severity::Error);
            let warnings = result.count_by_severity(Severity::Warning);
            writeln!(output)?;
            writeln!(output, "📊 Summary:")?;
            writeln!(output, "   Total Findings: {}", result.total())?;
            writeln!(output, "   🚨 Errors: {}", color("31", &errors.to_string()))?;
            writeln!(output, "   ⚠️  Warnings: {}", color("33", &warnings.to_string()))?;
            for (phase, count) in result.phase_counts() {
                writeln!(output, "   Phase {phase}: {count}")?;
            }
            let crashed = result.crashed().count();
            if crashed > 0 {
                writeln!(output, "   💥 Crashed Checks: {crashed}")?;
            }
        }

        let shown = config.shown(result);
        if !shown.is_empty() {
            writeln!(output)?;
            writeln!(output, "🔍 Findings:")?;

            for (i, finding) in shown.iter().enumerate() {
                writeln!(output)?;
                let symbol = match finding.severity {
                    Severity::Error => color("31", severity_symbol(finding.severity)),
                    Severity::Warning => color("33", severity_symbol(finding.severity)),
                };
                writeln!(output, "   {symbol} Finding #{}: {}", i + 1, finding.check_id)?;
                writeln!(output, "      Record: {}", finding.record)?;
                if let Some(field) = &finding.field {
                    writeln!(output, "      Field: {field}")?;
                }
                writeln!(output, "      Severity: {}", finding.severity)?;
                writeln!(output, "      Phase: {}", finding.phase)?;
                if finding.kind == FindingKind::CheckCrashed {
                    writeln!(output, "      Outcome: {}", finding.kind.as_str())?;
                }
                writeln!(output, "      Message: {}", finding.message)?;
                if config.include_values && !finding.values.is_empty() {
                    writeln!(output, "      Values: {}", render_values(finding))?;
                }
            }

            if result.total() > shown.len() {
                writeln!(output)?;
                writeln!(
                    output,
                    "   ... and {} more findings (use --max-findings to show more)",
                    result.total() - shown.len()
                )?;
            }
        }

        writeln!(output)?;
        Ok(output)
    }
}

/// Formats validation results as Markdown suitable for documentation.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    /// Creates a new Markdown formatter with default configuration.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            heading_level: 2,
        }
    }

    /// Creates a new Markdown formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 6);
        self
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

impl ResultFormatter for MarkdownFormatter {
    fn format(&self, result: &ValidationResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(
        &self,
        result: &ValidationResult,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        let h = "#".repeat(self.heading_level as usize);

        writeln!(
            output,
            "{h} {} Validation Report - {}",
            marker(result),
            result.status().as_str().to_uppercase()
        )?;
        writeln!(output)?;
        writeln!(output, "**Schema:** {}", result.schema_name())?;
        writeln!(output, "**Status:** {}", result.status())?;
        writeln!(output, "**Valid:** {}", result.is_valid())?;

        if config.include_timestamps {
            writeln!(output, "**Generated:** {}", chrono::Utc::now().to_rfc3339())?;
        }

        if config.include_summary {
            writeln!(output)?;
            writeln!(output, "{h}# Summary")?;
            writeln!(output)?;
            writeln!(output, "| Metric | Value |")?;
            writeln!(output, "|--------|-------|")?;
            writeln!(output, "| Total Findings | {} |", result.total())?;
            for (severity, count) in result.severity_counts() {
                writeln!(output, "| {} | {count} |", severity.as_str())?;
            }
            for (phase, count) in result.phase_counts() {
                writeln!(output, "| Phase `{phase}` | {count} |")?;
            }
        }

        let shown = config.shown(result);
        if !shown.is_empty() {
            writeln!(output)?;
            writeln!(output, "{h}# Findings")?;
            writeln!(output)?;
            writeln!(output, "| Record | Field | Check | Severity | Phase | Message |")?;
            writeln!(output, "|--------|-------|-------|----------|-------|---------|")?;
            for finding in shown {
                let check = if finding.is_crash() {
                    format!("`{}` (crashed)", finding.check_id)
                } else {
                    format!("`{}`", finding.check_id)
                };
                writeln!(
                    output,
                    "| {} | {} | {check} | {} {} | {} | {} |",
                    finding.record,
                    finding.field.as_deref().unwrap_or(""),
                    severity_symbol(finding.severity),
                    finding.severity,
                    finding.phase,
                    escape_cell(&finding.message)
                )?;
            }

            if result.total() > shown.len() {
                writeln!(output)?;
                writeln!(
                    output,
                    "> **Note:** {} additional findings not shown in this report.",
                    result.total() - shown.len()
                )?;
            }
        }

        Ok(output)
    }
}

/// Formats findings as CSV, one row per finding.
///
/// Columns: `record, field, check_id, check_name, severity, phase, kind,
/// message, values`. Captured values are rendered as `key=value` pairs
/// joined with `;`.
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    config: FormatterConfig,
}

impl CsvFormatter {
    /// CSV header row.
    pub const HEADER: [&'static str; 9] = [
        "record",
        "field",
        "check_id",
        "check_name",
        "severity",
        "phase",
        "kind",
        "message",
        "values",
    ];

    /// Creates a new CSV formatter with default configuration.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    /// Creates a new CSV formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for CsvFormatter {
    fn format(&self, result: &ValidationResult) -> Result<String> {
        self.format_with_config(result, &self.config)
    }

    fn format_with_config(
        &self,
        result: &ValidationResult,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(Self::HEADER)?;

        for finding in config.shown(result) {
            let values = if config.include_values {
                finding
                    .values
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(";")
            } else {
                String::new()
            };
            writer.write_record([
                finding.record.to_string().as_str(),
                finding.field.as_deref().unwrap_or(""),
                finding.check_id.as_str(),
                finding.check_name.as_str(),
                finding.severity.as_str(),
                finding.phase.as_str(),
                finding.kind.as_str(),
                finding.message.as_str(),
                values.as_str(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| GuardError::Serialization(format!("Failed to flush CSV output: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| GuardError::Serialization(format!("CSV output is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{sample_result, sample_schema_and_dataset};

    #[test]
    fn test_formatter_config() {
        let config = FormatterConfig::default();
        assert!(config.include_summary);
        assert!(config.include_findings);
        assert!(config.use_colors);

        let minimal = FormatterConfig::minimal();
        assert!(!minimal.include_findings);
        assert!(!minimal.use_colors);

        let ci = FormatterConfig::ci();
        assert!(!ci.use_colors);
        assert_eq!(ci.max_findings, Some(50));
    }

    #[test]
    fn test_json_formatter_round_trips() {
        let result = sample_result();
        let output = JsonFormatter::new().format(&result).unwrap();
        assert!(output.contains("\"status\": \"completed\""));
        assert!(output.contains("loan_amount.invalid_number"));

        let back: ValidationResult = serde_json::from_str(&output).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_json_formatter_respects_limits() {
        let result = sample_result();
        let config = FormatterConfig::default().with_max_findings(1).with_values(false);
        let output = JsonFormatter::new()
            .with_pretty(false)
            .format_with_config(&result, &config)
            .unwrap();
        let back: ValidationResult = serde_json::from_str(&output).unwrap();
        assert_eq!(back.total(), 1);
        assert!(back.findings()[0].values.is_empty());
    }

    #[test]
    fn test_human_formatter() {
        let result = sample_result();
        let output = HumanFormatter::new().format(&result).unwrap();
        assert!(output.contains("Validation FAILED"));
        assert!(output.contains("Schema: loans"));
        assert!(output.contains("Total Findings: 2"));
        assert!(output.contains("Finding #1: loan_amount.invalid_number"));
        assert!(output.contains("Values: loan_amount=abc"));

        let config = FormatterConfig::default().with_colors(false);
        let output = HumanFormatter::new()
            .format_with_config(&result, &config)
            .unwrap();
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_human_formatter_truncation_note() {
        let result = sample_result();
        let config = FormatterConfig::default().with_max_findings(1);
        let output = HumanFormatter::with_config(config).format(&result).unwrap();
        assert!(output.contains("Finding #1"));
        assert!(output.contains("... and 1 more findings"));
    }

    #[test]
    fn test_markdown_formatter() {
        let result = sample_result();
        let output = MarkdownFormatter::new().format(&result).unwrap();
        assert!(output.contains("## ❌ Validation Report - COMPLETED"));
        assert!(output.contains("**Schema:** loans"));
        assert!(output.contains("| Total Findings | 2 |"));
        assert!(output.contains("| Phase `logical` | 1 |"));
        assert!(output.contains("| 2 | loan_amount | `loan_amount.invalid_number` |"));

        let output = MarkdownFormatter::new()
            .with_heading_level(1)
            .format(&result)
            .unwrap();
        assert!(output.starts_with("# ❌ Validation Report"));
    }

    #[test]
    fn test_csv_formatter() {
        let result = sample_result();
        let output = CsvFormatter::new().format(&result).unwrap();

        let mut reader = csv::Reader::from_reader(output.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CsvFormatter::HEADER.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "2");
        assert_eq!(&rows[0][2], "loan_amount.invalid_number");
        assert_eq!(&rows[0][4], "error");
        assert_eq!(&rows[1][5], "logical");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("yaml".parse::<OutputFormat>().is_err());

        let (schema, dataset) = sample_schema_and_dataset();
        let result = crate::core::run(&dataset, &schema).unwrap();
        let text = OutputFormat::Text
            .formatter(FormatterConfig::minimal())
            .format(&result)
            .unwrap();
        assert!(!text.contains("Finding #"));
    }
}
