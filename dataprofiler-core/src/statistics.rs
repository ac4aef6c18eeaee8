//! Descriptive statistics per logical type.
//!
//! Only min/max style summaries are computed, and the metric names are fixed
//! by the column's [`LogicalType`]:
//!
//! | type       | metrics                      |
//! |------------|------------------------------|
//! | `number`   | `min`, `max`                 |
//! | `string`   | `min_length`, `max_length`   |
//! | `datetime` | `min_date`, `max_date`       |
//! | `unknown`  | none                         |
//!
//! When a column holds no value that qualifies for its type the result is
//! empty rather than partially filled.

use crate::inference::classify;
use crate::models::{Column, DescriptiveStats, LogicalType, MetricValue, Value};
use std::cmp::Ordering;

/// Computes the statistics defined for `logical_type` over `column`.
///
/// # Example
/// ```rust
/// use dataprofiler_core::models::{Column, LogicalType, Value};
/// use dataprofiler_core::statistics::describe;
///
/// let column = Column::new("n", (1..=5).map(Value::Integer).collect());
/// let stats = describe(&column, LogicalType::Number);
/// assert_eq!(stats.get("min").and_then(|m| m.as_i64()), Some(1));
/// assert_eq!(stats.get("max").and_then(|m| m.as_i64()), Some(5));
/// ```
pub fn describe(column: &Column, logical_type: LogicalType) -> DescriptiveStats {
    let stats = match logical_type {
        LogicalType::Number => describe_numbers(column),
        LogicalType::String => describe_lengths(column),
        LogicalType::DateTime => describe_dates(column),
        LogicalType::Unknown => None,
    };

    stats.unwrap_or_else(DescriptiveStats::empty)
}

/// Classifies the column and describes it in one step.
pub fn profile_column(column: &Column) -> (LogicalType, DescriptiveStats) {
    let logical_type = classify(column);
    (logical_type, describe(column, logical_type))
}

/// Min and max keep the original cell, so integers stay integers.
fn describe_numbers(column: &Column) -> Option<DescriptiveStats> {
    let mut numeric = column.non_null().filter(|v| v.is_numeric());

    let first = numeric.next()?;
    let (min, max) = numeric.fold((first, first), |(min, max), candidate| {
        (
            if candidate.numeric_cmp(min) == Some(Ordering::Less) {
                candidate
            } else {
                min
            },
            if candidate.numeric_cmp(max) == Some(Ordering::Greater) {
                candidate
            } else {
                max
            },
        )
    });

    Some(DescriptiveStats::numeric(
        MetricValue::from_value(min)?,
        MetricValue::from_value(max)?,
    ))
}

fn describe_lengths(column: &Column) -> Option<DescriptiveStats> {
    let lengths: Vec<usize> = column
        .non_null()
        .filter_map(Value::as_text)
        .map(|s| s.chars().count())
        .collect();

    let min = lengths.iter().min()?;
    let max = lengths.iter().max()?;

    Some(DescriptiveStats::lengths(
        i64::try_from(*min).ok()?,
        i64::try_from(*max).ok()?,
    ))
}

fn describe_dates(column: &Column) -> Option<DescriptiveStats> {
    let dates: Vec<_> = column.non_null().filter_map(Value::as_datetime).collect();

    let min = dates.iter().min()?;
    let max = dates.iter().max()?;

    Some(DescriptiveStats::dates(*min, *max))
}
