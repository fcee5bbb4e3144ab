//! Business check library.
//!
//! Factories in this module build parameterized
//! [`Check`](crate::core::Check)s for the rules that regulatory filings keep
//! repeating: enumerated domains, conditional
//! requirements between fields, composite-key uniqueness, date windows and
//! numeric bounds. Each factory returns a [`CheckBuilder`] so the caller
//! still picks the phase, severity and message:
//!
//! ```rust
//! use regtech_guard::checks;
//! use regtech_guard::core::{FieldDefinition, FieldType, Schema};
//!
//! let schema = Schema::builder("sblar")
//!     .field(FieldDefinition::new("app_method", FieldType::String))
//!     .check(
//!         "app_method",
//!         checks::is_in_set("app_method.invalid_enum_value", ["1", "2", "3", "4"], false)
//!             .description("'Application method' must equal 1, 2, 3 or 4")
//!             .phase("syntactical")
//!             .build(),
//!     )
//!     .build()?;
//! assert_eq!(schema.check_count(), 1);
//! # Ok::<(), regtech_guard::error::GuardError>(())
//! ```
//!
//! ## Blank values
//!
//! Most factories take an `accept_blank` flag: a blank value (null, empty or
//! whitespace-only text) passes when it is set and fails otherwise, and the
//! rule itself only runs on non-blank values.
//!
//! ## Multi-value fields
//!
//! Fields such as `"1;2;977"` hold several codes separated by
//! [`DEFAULT_SEPARATOR`](crate::core::DEFAULT_SEPARATOR). List values are
//! treated the same way.
//!
//! ## Failures
//!
//! Factories whose rule cannot be evaluated on a value (a non-numeric value
//! compared with a number) return a
//! [`CheckPredicateFailure`](crate::error::CheckPredicateFailure), which the
//! engine reports as a crashed check. Date comparisons treat a value that is
//! not a date as a failed comparison instead.

pub mod conditional;
pub mod dates;
pub mod enums;
pub mod numbers;
pub mod text;
pub mod uniqueness;

pub use conditional::{
    conditional_requirement, fieldset_pair, no_conditional_conflict, valid_enum_pair,
    EnumPairCondition, FieldCondition,
};
pub use dates::{date_after, date_before_in_days, date_in_range, is_date};
pub use enums::{
    is_in_set, multi_field_value_count, no_duplicate_values, single_value_restriction,
    value_count,
};
pub use numbers::{
    compare, is_number, number_at_least, number_greater_than, number_less_than, Comparison,
};
pub use text::{
    exact_length, matches_pattern, string_contains, text_length, valid_code, valid_uid,
    LengthAssertion,
};
pub use uniqueness::{composite_key_unique, same_prefix, UniqueKeyOptions};

use crate::core::check::PredicateResult;
use crate::core::{CheckBuilder, Value};
use std::collections::BTreeSet;

/// Applies the blank rule, running `rule` only on non-blank values.
pub(crate) fn blank_or<F>(value: &Value, accept_blank: bool, rule: F) -> PredicateResult<bool>
where
    F: FnOnce() -> PredicateResult<bool>,
{
    if value.is_blank() {
        Ok(accept_blank)
    } else {
        rule()
    }
}

pub(crate) fn string_set<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

/// Renders a set for message templates: `1, 2, 3`.
pub(crate) fn join(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Attaches `accept_blank` as a template parameter.
pub(crate) fn with_blank_param(builder: CheckBuilder, accept_blank: bool) -> CheckBuilder {
    builder.param("accept_blank", accept_blank.to_string())
}
