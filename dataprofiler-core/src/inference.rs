//! Column type inference.
//!
//! A column's logical type is decided from its non-null values only. The
//! predicates overlap in practice (a date can be held as text), so they are
//! checked in a fixed order and the first match wins:
//!
//! 1. every value is an integer or float: [`LogicalType::Number`]
//! 2. every value is text: [`LogicalType::String`]
//! 3. every value is a timestamp, or text that parses as one: [`LogicalType::DateTime`]
//! 4. anything else, including empty and all-null columns: [`LogicalType::Unknown`]

use crate::models::{Column, LogicalType, Value};

/// Classifies a column into exactly one [`LogicalType`].
///
/// # Example
/// ```rust
/// use dataprofiler_core::inference::classify;
/// use dataprofiler_core::models::{Column, LogicalType, Value};
///
/// let column = Column::new("qty", vec![Value::Integer(1), Value::Null, Value::Float(2.5)]);
/// assert_eq!(classify(&column), LogicalType::Number);
/// ```
pub fn classify(column: &Column) -> LogicalType {
    let values: Vec<&Value> = column.non_null().collect();

    if values.is_empty() {
        return LogicalType::Unknown;
    }

    if values.iter().all(|v| v.is_numeric()) {
        LogicalType::Number
    } else if values.iter().all(|v| matches!(v, Value::Text(_))) {
        LogicalType::String
    } else if values.iter().all(|v| v.as_datetime().is_some()) {
        LogicalType::DateTime
    } else {
        LogicalType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(values: &[&str]) -> Vec<Value> {
        values.iter().map(|s| Value::Text((*s).to_string())).collect()
    }

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::DateTime(
            NaiveDate::from_ymd_opt(y, m, d)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap(),
        )
    }

    #[test]
    fn test_integers_are_numbers() {
        let column = Column::new("n", (1..=5).map(Value::Integer).collect());
        assert_eq!(classify(&column), LogicalType::Number);
    }

    #[test]
    fn test_mixed_integers_and_floats_are_numbers() {
        let column = Column::new(
            "n",
            vec![Value::Integer(1), Value::Float(2.5), Value::Null],
        );
        assert_eq!(classify(&column), LogicalType::Number);
    }

    #[test]
    fn test_text_is_string() {
        let column = Column::new("fruit", text(&["apple", "banana", "orange"]));
        assert_eq!(classify(&column), LogicalType::String);
    }

    #[test]
    fn test_date_text_is_string_because_text_is_checked_first() {
        let column = Column::new("d", text(&["2023-01-01", "2023-01-02"]));
        assert_eq!(classify(&column), LogicalType::String);
    }

    #[test]
    fn test_native_dates_are_datetime() {
        let column = Column::new(
            "d",
            vec![date(2023, 1, 1), date(2023, 1, 2), date(2023, 1, 3)],
        );
        assert_eq!(classify(&column), LogicalType::DateTime);
    }

    #[test]
    fn test_native_dates_mixed_with_date_text_are_datetime() {
        let column = Column::new(
            "d",
            vec![date(2023, 1, 1), Value::Text("2023-01-05 10:30:00".to_string())],
        );
        assert_eq!(classify(&column), LogicalType::DateTime);
    }

    #[test]
    fn test_booleans_are_unknown() {
        let column = Column::new(
            "flag",
            vec![Value::Boolean(true), Value::Boolean(false), Value::Null],
        );
        assert_eq!(classify(&column), LogicalType::Unknown);
    }

    #[test]
    fn test_empty_and_all_null_columns_are_unknown() {
        assert_eq!(classify(&Column::new("e", vec![])), LogicalType::Unknown);
        assert_eq!(
            classify(&Column::new("n", vec![Value::Null, Value::Float(f64::NAN)])),
            LogicalType::Unknown
        );
    }

    #[test]
    fn test_mixed_numbers_and_text_are_unknown() {
        let column = Column::new(
            "m",
            vec![Value::Integer(1), Value::Text("one".to_string())],
        );
        assert_eq!(classify(&column), LogicalType::Unknown);
    }

    #[test]
    fn test_unmapped_native_types_are_unknown() {
        let column = Column::new("blob", vec![Value::Other("BYTEA".to_string())]);
        assert_eq!(classify(&column), LogicalType::Unknown);
    }
}
