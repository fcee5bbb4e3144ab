//! Finding severity levels.

use crate::error::GuardError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The severity of a check and of the findings it produces.
///
/// Only two levels exist. Errors make a submission invalid; warnings are
/// reported but do not affect [`ValidationResult::is_valid`].
///
/// - **Error**: the data cannot be accepted as submitted
///   - Missing required fields
///   - Values outside an enumerated domain
///   - Duplicate identifiers
///
/// - **Warning**: the data is suspicious and should be reviewed
///   - Duplicated values inside a multi-value field
///   - Values outside an expected (but not mandatory) range
///
/// # Examples
///
/// ```rust
/// use regtech_guard::core::Severity;
///
/// assert!(Severity::Error > Severity::Warning);
/// assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Warning);
/// assert!("info".parse::<Severity>().is_err());
/// ```
///
/// [`ValidationResult::is_valid`]: crate::core::ValidationResult::is_valid
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Warning level - reported, does not invalidate the submission
    Warning = 1,
    /// Error level - invalidates the submission
    #[default]
    Error = 2,
}

impl Severity {
    /// Returns the string representation of the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Checks if this severity is at least as severe as another.
    pub fn is_at_least(&self, other: Severity) -> bool {
        *self >= other
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            other => Err(GuardError::schema(format!(
                "invalid severity '{other}': expected 'error' or 'warning'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Error.is_at_least(Severity::Warning));
        assert!(!Severity::Warning.is_at_least(Severity::Error));
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Error.to_string(), "error");
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("ERROR".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!(" warning ".parse::<Severity>().unwrap(), Severity::Warning);

        let err = "fatal".parse::<Severity>().unwrap_err();
        assert!(err.is_schema_error());
        assert!(err.to_string().contains("fatal"));
    }

    #[test]
    fn test_severity_serde() {
        let json = serde_json::to_string(&Severity::Error).unwrap();
        assert_eq!(json, "\"error\"");

        let severity: Severity = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(severity, Severity::Warning);

        assert!(serde_json::from_str::<Severity>("\"info\"").is_err());
    }
}
