//! Enumerated domains and multi-value fields.

use super::{blank_or, join, string_set, with_blank_param};
use crate::core::{Check, CheckBuilder, DEFAULT_SEPARATOR};
use std::collections::BTreeSet;

/// Every element of the value must be one of `accepted`.
///
/// Single-value fields hold one element; multi-value fields such as
/// `"1;2;977"` must have every element in the set.
///
/// Message parameters: `{allowed}`, `{accept_blank}`.
pub fn is_in_set<I, S>(id: impl Into<String>, accepted: I, accept_blank: bool) -> CheckBuilder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let accepted = string_set(accepted);
    let allowed = join(&accepted);
    let builder = Check::field(id, move |value, _| {
        blank_or(value, accept_blank, || {
            Ok(value
                .elements(DEFAULT_SEPARATOR)
                .iter()
                .all(|element| accepted.contains(element)))
        })
    })
    .param("allowed", allowed);
    with_blank_param(builder, accept_blank)
}

/// The number of elements must be in `min..=max` (no upper bound when `max`
/// is `None`). Blank values hold zero elements.
pub fn value_count(id: impl Into<String>, min: usize, max: Option<usize>) -> CheckBuilder {
    let builder = Check::field(id, move |value, _| {
        let count = value.elements(DEFAULT_SEPARATOR).len();
        Ok(count >= min && max.map_or(true, |max| count <= max))
    })
    .param("min", min.to_string());
    match max {
        Some(max) => builder.param("max", max.to_string()),
        None => builder,
    }
}

/// No element may appear twice.
pub fn no_duplicate_values(id: impl Into<String>) -> CheckBuilder {
    Check::field(id, |value, _| {
        let elements = value.elements(DEFAULT_SEPARATOR);
        let distinct: BTreeSet<&String> = elements.iter().collect();
        Ok(distinct.len() == elements.len())
    })
}

/// Codes in `single_values` (e.g. "not applicable") may only appear alone.
///
/// Passes when no element is in `single_values`, or when the value is
/// exactly one element and that element is in `single_values`.
pub fn single_value_restriction<I, S>(id: impl Into<String>, single_values: I) -> CheckBuilder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let single_values = string_set(single_values);
    let shown = join(&single_values);
    Check::field(id, move |value, _| {
        let elements = value.elements(DEFAULT_SEPARATOR);
        let restricted = elements
            .iter()
            .filter(|element| single_values.contains(*element))
            .count();
        Ok(restricted == 0 || (restricted == 1 && elements.len() == 1))
    })
    .param("single_values", shown)
}

/// The elements of this field plus those of `other_field`, leaving out
/// `ignored_values`, may not exceed `max`.
pub fn multi_field_value_count<I, S>(
    id: impl Into<String>,
    other_field: impl Into<String>,
    max: usize,
    ignored_values: I,
) -> CheckBuilder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let other_field = other_field.into();
    let ignored = string_set(ignored_values);
    let other = other_field.clone();
    Check::field(id, move |value, record| {
        let counted = |v: &crate::core::Value| {
            v.elements(DEFAULT_SEPARATOR)
                .into_iter()
                .filter(|element| !ignored.contains(element))
                .count()
        };
        Ok(counted(value) + counted(record.get(&other)) <= max)
    })
    .depends_on(other_field)
    .param("max", max.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Outcome, Record, Value};

    fn eval(check: &Check, value: impl Into<Value>) -> Outcome {
        check.evaluate_field(&value.into(), &Record::new())
    }

    #[test]
    fn test_is_in_set_single_and_multi() {
        let check = is_in_set("c", ["1", "2", "977"], false).build();
        assert_eq!(eval(&check, "1"), Outcome::Passed);
        assert_eq!(eval(&check, "1;977"), Outcome::Passed);
        assert_eq!(eval(&check, "1;5"), Outcome::Failed);
        assert_eq!(eval(&check, ""), Outcome::Failed);
        assert_eq!(eval(&check, Value::list(["2", "977"])), Outcome::Passed);
        assert_eq!(check.params()["allowed"], "1, 2, 977");

        let lenient = is_in_set("c", ["1"], true).build();
        assert_eq!(eval(&lenient, "  "), Outcome::Passed);
        assert_eq!(eval(&lenient, Value::Null), Outcome::Passed);
    }

    #[test]
    fn test_value_count() {
        let check = value_count("c", 1, Some(4)).build();
        assert_eq!(eval(&check, "1;2;3;4"), Outcome::Passed);
        assert_eq!(eval(&check, "1;2;3;4;5"), Outcome::Failed);
        assert_eq!(eval(&check, ""), Outcome::Failed);

        let unbounded = value_count("c", 2, None).build();
        assert_eq!(eval(&unbounded, "1;2;3;4;5;6"), Outcome::Passed);
        assert!(!unbounded.params().contains_key("max"));
    }

    #[test]
    fn test_no_duplicate_values() {
        let check = no_duplicate_values("c").build();
        assert_eq!(eval(&check, "1;2;3"), Outcome::Passed);
        assert_eq!(eval(&check, "1;2;1"), Outcome::Failed);
        assert_eq!(eval(&check, ""), Outcome::Passed);
    }

    #[test]
    fn test_single_value_restriction() {
        let check = single_value_restriction("c", ["966", "988"]).build();
        assert_eq!(eval(&check, "1;2"), Outcome::Passed);
        assert_eq!(eval(&check, "966"), Outcome::Passed);
        assert_eq!(eval(&check, "966;1"), Outcome::Failed);
        assert_eq!(eval(&check, "966;988"), Outcome::Failed);
    }

    #[test]
    fn test_multi_field_value_count() {
        let check = multi_field_value_count("c", "other", 5, ["977"]).build();
        assert_eq!(check.depends_on(), ["other"]);

        let record = Record::new().with("other", "1;2;977");
        assert_eq!(
            check.evaluate_field(&Value::text("a;b;c"), &record),
            Outcome::Passed
        );
        assert_eq!(
            check.evaluate_field(&Value::text("a;b;c;d"), &record),
            Outcome::Failed
        );
    }
}
