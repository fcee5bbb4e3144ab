//! Date format and date window checks.
//!
//! Dates use the `YYYYMMDD` form ([`DEFAULT_DATE_FORMAT`]) throughout. The
//! checks comparing two fields skip records where either side is blank:
//! emptiness is the business of a required or conditional check. A side
//! that is not a date fails the comparison.

use super::{blank_or, with_blank_param};
use crate::core::{value_as_date, Check, CheckBuilder, Value, DEFAULT_DATE_FORMAT};
use chrono::NaiveDate;

fn date(value: &Value) -> Option<NaiveDate> {
    value_as_date(value, DEFAULT_DATE_FORMAT)
}

/// The value must be a real calendar date in `YYYYMMDD` form.
pub fn is_date(id: impl Into<String>, accept_blank: bool) -> CheckBuilder {
    let builder = Check::field(id, move |value, _| {
        blank_or(value, accept_blank, || {
            Ok(value_as_date(value, DEFAULT_DATE_FORMAT).is_some())
        })
    });
    with_blank_param(builder, accept_blank)
}

/// The value must be a date within `start..=end`.
///
/// Blank and unparseable values fail. Message parameters: `{start}`,
/// `{end}`.
pub fn date_in_range(id: impl Into<String>, start: NaiveDate, end: NaiveDate) -> CheckBuilder {
    Check::field(id, move |value, _| {
        Ok(value_as_date(value, DEFAULT_DATE_FORMAT)
            .map_or(false, |date| start <= date && date <= end))
    })
    .param("start", start.format(DEFAULT_DATE_FORMAT).to_string())
    .param("end", end.format(DEFAULT_DATE_FORMAT).to_string())
}

/// The value must be on or after the date in `other_field`.
pub fn date_after(id: impl Into<String>, other_field: impl Into<String>) -> CheckBuilder {
    let other_field = other_field.into();
    let other = other_field.clone();
    Check::field(id, move |value, record| {
        let earlier = record.get(&other);
        if value.is_blank() || earlier.is_blank() {
            return Ok(true);
        }
        Ok(match (date(earlier), date(value)) {
            (Some(earlier), Some(later)) => earlier <= later,
            _ => false,
        })
    })
    .depends_on(other_field.clone())
    .param("other_field", other_field)
}

/// The value must fall less than `days` days after the date in
/// `other_field`.
pub fn date_before_in_days(
    id: impl Into<String>,
    other_field: impl Into<String>,
    days: i64,
) -> CheckBuilder {
    let other_field = other_field.into();
    let other = other_field.clone();
    Check::field(id, move |value, record| {
        let start = record.get(&other);
        if value.is_blank() || start.is_blank() {
            return Ok(true);
        }
        Ok(match (date(start), date(value)) {
            (Some(start), Some(end)) => (end - start).num_days() < days,
            _ => false,
        })
    })
    .depends_on(other_field.clone())
    .param("other_field", other_field)
    .param("days", days.to_string())
}
