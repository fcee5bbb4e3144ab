//! Rules linking the value of one field to the values of others.

use super::{join, string_set};
use crate::core::{Check, CheckBuilder, Value, DEFAULT_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn intersects(value: &Value, set: &BTreeSet<String>) -> bool {
    value
        .elements(DEFAULT_SEPARATOR)
        .iter()
        .any(|element| set.contains(element))
}

/// If `other_field` holds any of `condition_values`, this field must not be
/// blank. Otherwise the check passes.
///
/// ```rust
/// use regtech_guard::checks::conditional_requirement;
/// use regtech_guard::core::{Outcome, Record, Value};
///
/// let check = conditional_requirement("denial_reasons.required", "action_taken", ["denied"])
///     .build();
/// let record = Record::new().with("action_taken", "denied");
/// assert_eq!(check.evaluate_field(&Value::Null, &record), Outcome::Failed);
/// ```
pub fn conditional_requirement<I, S>(
    id: impl Into<String>,
    other_field: impl Into<String>,
    condition_values: I,
) -> CheckBuilder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let other_field = other_field.into();
    let conditions = string_set(condition_values);
    let shown = join(&conditions);
    let other = other_field.clone();
    Check::field(id, move |value, record| {
        Ok(!intersects(record.get(&other), &conditions) || !value.is_blank())
    })
    .depends_on(other_field.clone())
    .param("other_field", other_field)
    .param("condition_values", shown)
}

/// Two-way variant of [`conditional_requirement`]: when `other_field` holds
/// any of `condition_values` this field must be filled in, and when it does
/// not this field must be blank.
///
/// The usual case is a free-text "other" field that is only allowed next to
/// code `977`.
pub fn no_conditional_conflict<I, S>(
    id: impl Into<String>,
    other_field: impl Into<String>,
    condition_values: I,
) -> CheckBuilder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let other_field = other_field.into();
    let conditions = string_set(condition_values);
    let shown = join(&conditions);
    let other = other_field.clone();
    Check::field(id, move |value, record| {
        let triggered = intersects(record.get(&other), &conditions);
        Ok(triggered != value.is_blank())
    })
    .depends_on(other_field.clone())
    .param("other_field", other_field)
    .param("condition_values", shown)
}

/// One condition of [`valid_enum_pair`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumPairCondition {
    /// Values of the other field that trigger the condition
    pub condition_values: BTreeSet<String>,
    /// Trigger when the other field holds one of the values (`true`) or
    /// none of them (`false`)
    pub is_equal_condition: bool,
    /// Value this field is compared with once triggered
    pub target_value: String,
    /// Whether this field must equal (`true`) or differ from (`false`) the
    /// target
    pub should_equal_target: bool,
}

impl EnumPairCondition {
    /// "When the other field is one of `values`, this field must equal
    /// `target`."
    pub fn when_in<I, S>(values: I, target: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            condition_values: string_set(values),
            is_equal_condition: true,
            target_value: target.into(),
            should_equal_target: true,
        }
    }

    /// "When the other field is none of `values`, this field must equal
    /// `target`."
    pub fn when_not_in<I, S>(values: I, target: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            is_equal_condition: false,
            ..Self::when_in(values, target)
        }
    }

    /// Flips the target comparison to "must not equal".
    pub fn must_differ(mut self) -> Self {
        self.should_equal_target = false;
        self
    }

    fn holds(&self, value: &Value, other: &Value) -> bool {
        let triggered = intersects(other, &self.condition_values) == self.is_equal_condition;
        if !triggered {
            return true;
        }
        (value.as_text().trim() == self.target_value) == self.should_equal_target
    }
}

/// Every condition must hold for the pair (this field, `other_field`).
pub fn valid_enum_pair(
    id: impl Into<String>,
    other_field: impl Into<String>,
    conditions: Vec<EnumPairCondition>,
) -> CheckBuilder {
    let other_field = other_field.into();
    let other = other_field.clone();
    Check::field(id, move |value, record| {
        let other_value = record.get(&other);
        Ok(conditions.iter().all(|c| c.holds(value, other_value)))
    })
    .depends_on(other_field.clone())
    .param("other_field", other_field)
}

/// One target of [`fieldset_pair`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCondition {
    /// Field whose value is compared
    pub field: String,
    /// Whether the field must equal (`true`) or differ from (`false`) the
    /// target
    pub should_equal: bool,
    /// Value the field is compared with
    pub target: String,
}

impl FieldCondition {
    /// `field` must equal `target`.
    pub fn equals(field: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            should_equal: true,
            target: target.into(),
        }
    }

    /// `field` must not equal `target`.
    pub fn differs(field: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            should_equal: false,
            ..Self::equals(field, target)
        }
    }
}

/// When this field holds one of `condition_values`, every field condition
/// must hold.
///
/// For instance: if the number of principal owners is `1`, the second
/// owner's fields must be blank.
pub fn fieldset_pair<I, S>(
    id: impl Into<String>,
    condition_values: I,
    fields: Vec<FieldCondition>,
) -> CheckBuilder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let conditions = string_set(condition_values);
    let shown = join(&conditions);
    let deps: Vec<String> = fields.iter().map(|c| c.field.clone()).collect();
    let mut builder = Check::field(id, move |value, record| {
        if !conditions.contains(value.as_text().trim()) {
            return Ok(true);
        }
        Ok(fields.iter().all(|c| {
            (record.get(&c.field).as_text().trim() == c.target) == c.should_equal
        }))
    })
    .param("condition_values", shown);
    for field in deps {
        builder = builder.depends_on(field);
    }
    builder
}
