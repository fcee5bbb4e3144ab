//! Text shape checks: length, pattern, slices and code lists.

use super::{blank_or, with_blank_param};
use crate::core::{Check, CheckBuilder};
use crate::error::{GuardError, Result};
use crate::reference::ReferenceData;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Unique identifiers: 21 to 45 upper-case letters or digits.
static UID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Z0-9]{21,45}$").expect("Hard-coded regex pattern should be valid")
});

/// A length a text value is held to, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthAssertion {
    /// At least this many characters
    Min(usize),
    /// At most this many characters
    Max(usize),
    /// Between min and max characters (inclusive)
    Between(usize, usize),
    /// Exactly this many characters
    Exactly(usize),
}

impl LengthAssertion {
    /// Evaluates the assertion against a length.
    pub fn evaluate(&self, length: usize) -> bool {
        match *self {
            LengthAssertion::Min(min) => length >= min,
            LengthAssertion::Max(max) => length <= max,
            LengthAssertion::Between(min, max) => length >= min && length <= max,
            LengthAssertion::Exactly(len) => length == len,
        }
    }
}

impl fmt::Display for LengthAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthAssertion::Min(min) => write!(f, "at least {min} characters"),
            LengthAssertion::Max(max) => write!(f, "at most {max} characters"),
            LengthAssertion::Between(min, max) => write!(f, "between {min} and {max} characters"),
            LengthAssertion::Exactly(len) => write!(f, "exactly {len} characters"),
        }
    }
}

/// The value's length must satisfy `assertion`. Message parameter:
/// `{length}`.
pub fn text_length(
    id: impl Into<String>,
    assertion: LengthAssertion,
    accept_blank: bool,
) -> CheckBuilder {
    let builder = Check::field(id, move |value, _| {
        blank_or(value, accept_blank, || {
            Ok(assertion.evaluate(value.as_text().chars().count()))
        })
    })
    .param("length", assertion.to_string());
    with_blank_param(builder, accept_blank)
}

/// The value must be exactly `length` characters long.
pub fn exact_length(id: impl Into<String>, length: usize, accept_blank: bool) -> CheckBuilder {
    text_length(id, LengthAssertion::Exactly(length), accept_blank)
}

/// The value must contain a match of `pattern`.
///
/// The pattern is searched for, not anchored; write `^...$` to match the
/// whole value. Fails with a schema error when the pattern does not compile.
pub fn matches_pattern(
    id: impl Into<String>,
    pattern: &str,
    accept_blank: bool,
) -> Result<CheckBuilder> {
    let id = id.into();
    let regex = Regex::new(pattern).map_err(|e| {
        GuardError::schema(format!("check '{id}' has an invalid pattern '{pattern}': {e}"))
    })?;
    let builder = Check::field(id, move |value, _| {
        blank_or(value, accept_blank, || Ok(regex.is_match(&value.as_text())))
    })
    .param("format", pattern);
    Ok(with_blank_param(builder, accept_blank))
}

/// The value must be a well-formed unique identifier: 21 to 45 characters,
/// upper-case letters and digits only.
pub fn valid_uid(id: impl Into<String>) -> CheckBuilder {
    Check::field(id, |value, _| Ok(UID_PATTERN.is_match(value.as_text().trim())))
        .param("format", UID_PATTERN.as_str())
}

/// A slice of the value must equal `expected`.
///
/// `start` and `end` are character offsets; either may be left open. A value
/// shorter than the slice fails.
pub fn string_contains(
    id: impl Into<String>,
    expected: impl Into<String>,
    start: Option<usize>,
    end: Option<usize>,
) -> CheckBuilder {
    let expected = expected.into();
    let shown = expected.clone();
    Check::field(id, move |value, _| {
        let text = value.as_text();
        let chars: Vec<char> = text.chars().collect();
        let from = start.unwrap_or(0);
        let to = end.unwrap_or(chars.len());
        if from > to || to > chars.len() {
            return Ok(false);
        }
        Ok(chars[from..to].iter().copied().eq(expected.chars()))
    })
    .param("expected", shown)
}

/// The value must be a code of the reference table `table`.
///
/// Fails with a schema error when the table is missing, so a typo in a table
/// name is caught when the schema is put together.
pub fn valid_code(
    id: impl Into<String>,
    reference: &Arc<ReferenceData>,
    table: &str,
    accept_blank: bool,
) -> Result<CheckBuilder> {
    reference.require(table)?;
    let reference = Arc::clone(reference);
    let name = table.to_string();
    let builder = Check::field(id, move |value, _| {
        blank_or(value, accept_blank, || {
            Ok(reference
                .table(&name)
                .map_or(false, |codes| codes.contains(&value.as_text())))
        })
    })
    .param("table", table);
    Ok(with_blank_param(builder, accept_blank))
}
