//! Numeric format and bound checks.

use super::{blank_or, with_blank_param};
use crate::core::check::PredicateResult;
use crate::core::{Check, CheckBuilder, Value};
use crate::error::CheckPredicateFailure;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A bound a numeric value is compared against.
///
/// ```rust
/// use regtech_guard::checks::Comparison;
///
/// assert!(Comparison::AtLeast(0.0).evaluate(0.0));
/// assert!(!Comparison::GreaterThan(0.0).evaluate(0.0));
/// assert!(Comparison::LessThan(100.0).evaluate(99.5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Comparison {
    /// `value >= limit`
    AtLeast(f64),
    /// `value > limit`
    GreaterThan(f64),
    /// `value < limit`
    LessThan(f64),
    /// `value <= limit`
    AtMost(f64),
}

impl Comparison {
    /// Evaluates the comparison.
    pub fn evaluate(&self, value: f64) -> bool {
        match *self {
            Comparison::AtLeast(limit) => value >= limit,
            Comparison::GreaterThan(limit) => value > limit,
            Comparison::LessThan(limit) => value < limit,
            Comparison::AtMost(limit) => value <= limit,
        }
    }

    fn limit(&self) -> f64 {
        match *self {
            Comparison::AtLeast(l)
            | Comparison::GreaterThan(l)
            | Comparison::LessThan(l)
            | Comparison::AtMost(l) => l,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::AtLeast(l) => write!(f, ">= {l}"),
            Comparison::GreaterThan(l) => write!(f, "> {l}"),
            Comparison::LessThan(l) => write!(f, "< {l}"),
            Comparison::AtMost(l) => write!(f, "<= {l}"),
        }
    }
}

fn number(value: &Value) -> PredicateResult<f64> {
    value.as_f64().ok_or_else(|| {
        CheckPredicateFailure::new(format!("'{}' is not a number", value.as_text()))
    })
}

fn is_whole(value: &Value) -> bool {
    match value {
        Value::Integer(_) => true,
        Value::Text(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

/// The value must parse as a number, or as a whole number when `whole` is
/// set.
pub fn is_number(id: impl Into<String>, accept_blank: bool, whole: bool) -> CheckBuilder {
    let builder = Check::field(id, move |value, _| {
        blank_or(value, accept_blank, || {
            Ok(if whole {
                is_whole(value)
            } else {
                value.as_f64().is_some()
            })
        })
    });
    with_blank_param(builder, accept_blank).param("whole", whole.to_string())
}

/// Compares the value with a fixed bound.
///
/// A non-blank value that is not a number cannot be compared and is
/// reported as a predicate failure. Message parameter: `{limit}`.
pub fn compare(id: impl Into<String>, comparison: Comparison, accept_blank: bool) -> CheckBuilder {
    let builder = Check::field(id, move |value, _| {
        blank_or(value, accept_blank, || Ok(comparison.evaluate(number(value)?)))
    })
    .param("limit", comparison.limit().to_string())
    .param("comparison", comparison.to_string());
    with_blank_param(builder, accept_blank)
}

/// `value >= limit`
pub fn number_at_least(id: impl Into<String>, limit: f64, accept_blank: bool) -> CheckBuilder {
    compare(id, Comparison::AtLeast(limit), accept_blank)
}

/// `value > limit`
pub fn number_greater_than(id: impl Into<String>, limit: f64, accept_blank: bool) -> CheckBuilder {
    compare(id, Comparison::GreaterThan(limit), accept_blank)
}

/// `value < limit`
pub fn number_less_than(id: impl Into<String>, limit: f64, accept_blank: bool) -> CheckBuilder {
    compare(id, Comparison::LessThan(limit), accept_blank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Outcome, Record};

    fn eval(check: &Check, value: impl Into<Value>) -> Outcome {
        check.evaluate_field(&value.into(), &Record::new())
    }

    #[test]
    fn test_is_number() {
        let any = is_number("c", false, false).build();
        assert_eq!(eval(&any, "12.5"), Outcome::Passed);
        assert_eq!(eval(&any, 3_i64), Outcome::Passed);
        assert_eq!(eval(&any, "12a"), Outcome::Failed);
        assert_eq!(eval(&any, ""), Outcome::Failed);

        let whole = is_number("c", true, true).build();
        assert_eq!(eval(&whole, "12"), Outcome::Passed);
        assert_eq!(eval(&whole, "12.5"), Outcome::Failed);
        assert_eq!(eval(&whole, " "), Outcome::Passed);
    }

    #[test]
    fn test_bounds() {
        let at_least = number_at_least("c", 1.0, false).build();
        assert_eq!(eval(&at_least, "1"), Outcome::Passed);
        assert_eq!(eval(&at_least, "0.99"), Outcome::Failed);
        assert_eq!(at_least.params()["limit"], "1");

        let greater = number_greater_than("c", 0.0, true).build();
        assert_eq!(eval(&greater, "0"), Outcome::Failed);
        assert_eq!(eval(&greater, ""), Outcome::Passed);

        let less = number_less_than("c", 100.0, false).build();
        assert_eq!(eval(&less, 99.9), Outcome::Passed);
        assert_eq!(eval(&less, "100"), Outcome::Failed);
    }

    #[test]
    fn test_non_numeric_is_a_predicate_failure() {
        let check = number_at_least("c", 0.0, false).build();
        match eval(&check, "abc") {
            Outcome::Crashed(failure) => assert_eq!(failure.message(), "'abc' is not a number"),
            other => panic!("expected crash, got {other:?}"),
        }
    }
}
