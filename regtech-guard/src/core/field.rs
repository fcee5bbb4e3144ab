//! Field definitions and the structural checks derived from them.

use super::{Check, Severity, Value, DEFAULT_SEPARATOR};
use crate::error::{GuardError, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Date format used when a `date` field declares none (`YYYYMMDD`).
pub const DEFAULT_DATE_FORMAT: &str = "%Y%m%d";

/// The semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text, optionally constrained by a regex format pattern
    String,
    /// A numeric value
    Number,
    /// A calendar date, parsed with a chrono format pattern
    Date,
    /// A member (or `;`-separated members) of an allowed value set
    Enumeration,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Enumeration => "enumeration",
        };
        f.write_str(s)
    }
}

/// The declared shape and constraints of one column.
///
/// # Examples
///
/// ```rust
/// use regtech_guard::core::{FieldDefinition, FieldType};
///
/// let field = FieldDefinition::new("app_recipient", FieldType::Enumeration)
///     .title("Field 4: Application recipient")
///     .required()
///     .allowed_values(["1", "2"]);
///
/// assert_eq!(field.name(), "app_recipient");
/// assert!(!field.is_nullable());
/// ```
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    name: String,
    title: Option<String>,
    field_type: FieldType,
    nullable: bool,
    allowed_values: Option<BTreeSet<String>>,
    format: Option<String>,
    structural_severity: Severity,
    checks: Vec<Check>,
}

impl FieldDefinition {
    /// Creates a nullable field of the given type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            title: None,
            field_type,
            nullable: true,
            allowed_values: None,
            format: None,
            structural_severity: Severity::Error,
            checks: Vec::new(),
        }
    }

    /// Sets the human title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Marks the field as required (not nullable).
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets nullability explicitly.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the allowed value set (enumeration domain).
    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the format pattern: a regex for `string` fields, a chrono format
    /// for `date` fields.
    pub fn format(mut self, pattern: impl Into<String>) -> Self {
        self.format = Some(pattern.into());
        self
    }

    /// Sets the severity of the structural checks derived from this
    /// definition (defaults to error).
    pub fn structural_severity(mut self, severity: Severity) -> Self {
        self.structural_severity = severity;
        self
    }

    /// Attaches a check, keeping attachment order.
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the title if available.
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns the semantic type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns true if the field may be blank.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns the allowed value set if any.
    pub fn allowed(&self) -> Option<&BTreeSet<String>> {
        self.allowed_values.as_ref()
    }

    /// Returns the format pattern if any.
    pub fn format_pattern(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Returns the explicitly attached checks in attachment order.
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub(crate) fn push_check(&mut self, check: Check) {
        self.checks.push(check);
    }

    /// Derives the structural checks implied by the field's metadata.
    ///
    /// Order: `required`, then the type check (`invalid_number`,
    /// `invalid_date`, `invalid_enum_value` or `invalid_format`). Blank
    /// values only fail `required`.
    pub(crate) fn structural_checks(&self) -> Result<Vec<Check>> {
        let mut checks = Vec::new();
        let field = self.name.clone();
        let label = self.title.clone().unwrap_or_else(|| self.name.clone());

        if !self.nullable {
            checks.push(
                Check::field(format!("{field}.required"), |value, _| Ok(!value.is_blank()))
                    .description(format!("'{label}' must not be blank"))
                    .message("'{field}' is required but was blank")
                    .severity(self.structural_severity)
                    .build(),
            );
        }

        match self.field_type {
            FieldType::Number => checks.push(
                Check::field(format!("{field}.invalid_number"), |value, _| {
                    Ok(value.is_blank() || value.as_f64().is_some())
                })
                .description(format!("'{label}' must be numeric"))
                .message("'{field}' must be numeric, found '{value}'")
                .severity(self.structural_severity)
                .build(),
            ),
            FieldType::Date => {
                let format = self
                    .format
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
                let pattern = format.clone();
                checks.push(
                    Check::field(format!("{field}.invalid_date"), move |value, _| {
                        Ok(value.is_blank() || parse_date(&value.as_text(), &pattern).is_some())
                    })
                    .description(format!("'{label}' must be a real calendar date"))
                    .message("'{field}' must be a date in format {format}, found '{value}'")
                    .param("format", format)
                    .severity(self.structural_severity)
                    .build(),
                );
            }
            FieldType::Enumeration => {
                let allowed = match &self.allowed_values {
                    Some(values) if !values.is_empty() => values.clone(),
                    _ => {
                        return Err(GuardError::schema(format!(
                            "enumeration field '{field}' declares no allowed values"
                        )))
                    }
                };
                let listed = allowed.iter().cloned().collect::<Vec<_>>().join(", ");
                checks.push(
                    Check::field(format!("{field}.invalid_enum_value"), move |value, _| {
                        Ok(value
                            .elements(DEFAULT_SEPARATOR)
                            .iter()
                            .all(|element| allowed.contains(element)))
                    })
                    .description(format!("'{label}' must be one of: {listed}"))
                    .message("'{field}' has value '{value}' outside the allowed set ({allowed})")
                    .param("allowed", listed)
                    .severity(self.structural_severity)
                    .build(),
                );
            }
            FieldType::String => {
                if let Some(pattern) = &self.format {
                    let regex = Regex::new(pattern).map_err(|e| {
                        GuardError::schema(format!(
                            "field '{field}' has an invalid format pattern '{pattern}': {e}"
                        ))
                    })?;
                    checks.push(
                        Check::field(format!("{field}.invalid_format"), move |value, _| {
                            Ok(value.is_blank() || regex.is_match(value.as_text().trim()))
                        })
                        .description(format!("'{label}' must match {pattern}"))
                        .message("'{field}' does not match the expected format, found '{value}'")
                        .severity(self.structural_severity)
                        .build(),
                    );
                }
            }
        }

        Ok(checks)
    }
}

/// Parses a date with a chrono format pattern.
///
/// The default `%Y%m%d` format is matched strictly: exactly eight digits
/// forming a real calendar date.
pub fn parse_date(text: &str, format: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if format == DEFAULT_DATE_FORMAT {
        if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year = text[0..4].parse().ok()?;
        let month = text[4..6].parse().ok()?;
        let day = text[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    NaiveDate::parse_from_str(text, format).ok()
}

/// Reads a date out of a raw value.
pub fn value_as_date(value: &Value, format: &str) -> Option<NaiveDate> {
    if value.is_blank() {
        return None;
    }
    parse_date(&value.as_text(), format)
}

/// A declarative field definition, as found in JSON schema files.
///
/// Predicates cannot be declared this way; checks are attached in code after
/// conversion with [`FieldDefinition::try_from`].
///
/// ```rust
/// use regtech_guard::core::{FieldDefinition, FieldSpec};
///
/// let spec: FieldSpec = serde_json::from_str(
///     r#"{"name": "loan_amount", "type": "number", "nullable": false}"#,
/// ).unwrap();
/// let field = FieldDefinition::try_from(spec).unwrap();
/// assert!(!field.is_nullable());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name
    pub name: String,
    /// Optional human title
    #[serde(default)]
    pub title: Option<String>,
    /// Semantic type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field may be blank
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Allowed values for enumerations
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
    /// Format pattern
    #[serde(default)]
    pub format: Option<String>,
    /// Severity of derived structural checks, as text
    #[serde(default)]
    pub severity: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl TryFrom<FieldSpec> for FieldDefinition {
    type Error = GuardError;

    fn try_from(spec: FieldSpec) -> Result<Self> {
        let severity = match spec.severity.as_deref() {
            Some(text) => Severity::from_str(text).map_err(|e| {
                GuardError::schema(format!("field '{}': {e}", spec.name))
            })?,
            None => Severity::Error,
        };

        let mut field = FieldDefinition::new(spec.name, spec.field_type)
            .nullable(spec.nullable)
            .structural_severity(severity);
        if let Some(title) = spec.title {
            field = field.title(title);
        }
        if let Some(values) = spec.allowed_values {
            field = field.allowed_values(values);
        }
        if let Some(format) = spec.format {
            field = field.format(format);
        }
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Outcome, Record};

    fn eval(check: &Check, value: Value) -> Outcome {
        check.evaluate_field(&value, &Record::new())
    }

    #[test]
    fn test_required_number_derives_two_checks() {
        let field = FieldDefinition::new("loan_amount", FieldType::Number).required();
        let checks = field.structural_checks().unwrap();
        let ids: Vec<_> = checks.iter().map(Check::id).collect();
        assert_eq!(ids, vec!["loan_amount.required", "loan_amount.invalid_number"]);

        assert_eq!(eval(&checks[0], Value::text("")), Outcome::Failed);
        assert_eq!(eval(&checks[1], Value::text("abc")), Outcome::Failed);
        assert_eq!(eval(&checks[1], Value::text("")), Outcome::Passed);
        assert_eq!(eval(&checks[1], Value::text("1000")), Outcome::Passed);
    }

    #[test]
    fn test_enumeration_checks_every_element() {
        let field = FieldDefinition::new("ct_guarantee", FieldType::Enumeration)
            .allowed_values(["1", "2", "977"]);
        let checks = field.structural_checks().unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(eval(&checks[0], Value::text("1;977")), Outcome::Passed);
        assert_eq!(eval(&checks[0], Value::text("1;4")), Outcome::Failed);
        assert_eq!(eval(&checks[0], Value::Null), Outcome::Passed);
    }

    #[test]
    fn test_enumeration_without_values_is_rejected() {
        let err = FieldDefinition::new("action_taken", FieldType::Enumeration)
            .structural_checks()
            .unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_string_format_pattern() {
        let field = FieldDefinition::new("uid", FieldType::String).format(r"^[A-Z0-9]+$");
        let checks = field.structural_checks().unwrap();
        assert_eq!(eval(&checks[0], Value::text("ABC123")), Outcome::Passed);
        assert_eq!(eval(&checks[0], Value::text("abc")), Outcome::Failed);

        let bad = FieldDefinition::new("uid", FieldType::String).format("([");
        assert!(bad.structural_checks().unwrap_err().is_schema_error());
    }

    #[test]
    fn test_date_parsing() {
        assert!(parse_date("20240229", DEFAULT_DATE_FORMAT).is_some());
        assert!(parse_date("20230229", DEFAULT_DATE_FORMAT).is_none());
        assert!(parse_date("2024-01-01", DEFAULT_DATE_FORMAT).is_none());
        assert!(parse_date("2024-01-01", "%Y-%m-%d").is_some());

        let field = FieldDefinition::new("app_date", FieldType::Date);
        let checks = field.structural_checks().unwrap();
        assert_eq!(eval(&checks[0], Value::text("20241301")), Outcome::Failed);
        assert_eq!(eval(&checks[0], Value::text("20241231")), Outcome::Passed);
    }

    #[test]
    fn test_field_spec_conversion() {
        let spec: FieldSpec = serde_json::from_str(
            r#"{"name": "app_method", "type": "enumeration", "allowed_values": ["1", "2", "3"], "severity": "warning"}"#,
        )
        .unwrap();
        let field = FieldDefinition::try_from(spec).unwrap();
        assert!(field.is_nullable());
        assert_eq!(field.allowed().map(BTreeSet::len), Some(3));
        let checks = field.structural_checks().unwrap();
        assert_eq!(checks[0].severity(), Severity::Warning);
    }

    #[test]
    fn test_field_spec_invalid_severity() {
        let spec: FieldSpec = serde_json::from_str(
            r#"{"name": "app_method", "type": "string", "severity": "critical"}"#,
        )
        .unwrap();
        let err = FieldDefinition::try_from(spec).unwrap_err();
        assert!(err.is_schema_error());
        assert!(err.to_string().contains("app_method"));
    }
}
