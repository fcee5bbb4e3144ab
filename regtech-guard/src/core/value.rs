//! Raw field values as they arrive from a loader.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Separator used by multi-value text fields (e.g. `"1;2;977"`).
pub const DEFAULT_SEPARATOR: char = ';';

/// A raw, untyped input value.
///
/// Loaders produce these without interpreting them; the schema's structural
/// checks decide whether a value is a usable number, date or enumeration
/// member. CSV input yields only [`Value::Text`]; JSON input may yield any
/// variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Missing or explicit null
    #[default]
    Null,
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Integer(i64),
    /// Floating point literal
    Float(f64),
    /// Text, the common case for delimited files
    Text(String),
    /// A list of values (e.g. JSON arrays)
    List(Vec<Value>),
}

impl Value {
    /// Creates a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// Creates a list of text values.
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(values.into_iter().map(|v| Value::Text(v.into())).collect())
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if the value carries no content: null, whitespace-only
    /// text, or an empty (or all-blank) list.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::List(items) => items.iter().all(Value::is_blank),
            Value::Bool(_) | Value::Integer(_) | Value::Float(_) => false,
        }
    }

    /// Renders the value as text. Lists are joined with `;`.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Text(s) => Cow::Borrowed(s.as_str()),
            Value::Null => Cow::Borrowed(""),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Interprets the value as a number, parsing text if needed.
    ///
    /// Returns `None` for blank values and anything that does not parse.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) if f.is_finite() => Some(*f),
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
                }
            }
            _ => None,
        }
    }

    /// Splits a multi-value field into its trimmed, non-blank elements.
    ///
    /// Lists yield their elements; text is split on `separator`.
    pub fn elements(&self, separator: char) -> Vec<String> {
        match self {
            Value::Null => Vec::new(),
            Value::List(items) => items
                .iter()
                .filter(|item| !item.is_blank())
                .map(|item| item.as_text().trim().to_string())
                .collect(),
            Value::Text(s) => s
                .split(separator)
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
            scalar => vec![scalar.to_string()],
        }
    }

    /// A canonical text form used as a hashing key by cross-record checks.
    ///
    /// Numbers render the same whether they arrived as text or as numbers
    /// only if the text is already canonical; no coercion is attempted so that
    /// `"01"` and `"1"` remain distinct keys.
    pub fn key(&self) -> String {
        match self {
            Value::Text(s) => s.trim().to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{DEFAULT_SEPARATOR}")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_detection() {
        assert!(Value::Null.is_blank());
        assert!(Value::text("   ").is_blank());
        assert!(Value::List(vec![]).is_blank());
        assert!(Value::list(["", " "]).is_blank());
        assert!(!Value::text("0").is_blank());
        assert!(!Value::Integer(0).is_blank());
    }

    #[test]
    fn test_numeric_parsing() {
        assert_eq!(Value::text(" 1000 ").as_f64(), Some(1000.0));
        assert_eq!(Value::text("12.5").as_f64(), Some(12.5));
        assert_eq!(Value::Integer(7).as_f64(), Some(7.0));
        assert_eq!(Value::text("abc").as_f64(), None);
        assert_eq!(Value::text("").as_f64(), None);
        assert_eq!(Value::text("NaN").as_f64(), None);
        assert_eq!(Value::Bool(true).as_f64(), None);
    }

    #[test]
    fn test_elements() {
        assert_eq!(Value::text("1; 2;;977").elements(';'), vec!["1", "2", "977"]);
        assert_eq!(Value::list(["a", "", "b"]).elements(';'), vec!["a", "b"]);
        assert!(Value::Null.elements(';').is_empty());
        assert_eq!(Value::Integer(5).elements(';'), vec!["5"]);
    }

    #[test]
    fn test_display_and_text() {
        assert_eq!(Value::list(["1", "2"]).to_string(), "1;2");
        assert_eq!(Value::Null.as_text(), "");
        assert_eq!(Value::Float(2.5).as_text(), "2.5");
    }

    #[test]
    fn test_untagged_serde() {
        let values: Vec<Value> =
            serde_json::from_str(r#"[null, true, 3, 1.5, "x", ["a", 1]]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Integer(3),
                Value::Float(1.5),
                Value::text("x"),
                Value::List(vec![Value::text("a"), Value::Integer(1)]),
            ]
        );
    }
}
