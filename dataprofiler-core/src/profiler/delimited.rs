//! Delimited text input.
//!
//! Files are read with a header row. Each cell is typed on its own: missing
//! markers become [`Value::Null`], then integers, floats and booleans are
//! recognised, and everything else stays text (or, with
//! [`FileOptions::parse_dates`], becomes a timestamp when it parses as one).

use crate::Result;
use crate::error::ProfilerError;
use crate::models::{Column, Value, parse_datetime};
use std::collections::HashSet;

/// Cell contents treated as missing values.
pub const NA_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// How a delimited file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    /// Field separator byte
    pub delimiter: u8,
    /// Turn date-like text into timestamps while reading
    pub parse_dates: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            parse_dates: false,
        }
    }
}

impl FileOptions {
    /// Sets the delimiter from a character.
    ///
    /// # Errors
    /// Returns a configuration error unless `delimiter` is a single ASCII
    /// character other than a quote or line break.
    pub fn with_delimiter(mut self, delimiter: char) -> Result<Self> {
        if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
            return Err(ProfilerError::configuration(format!(
                "delimiter must be a single ASCII character, got {:?}",
                delimiter
            )));
        }
        // Checked ASCII above, so the cast is lossless
        self.delimiter = delimiter as u8;
        Ok(self)
    }

    pub fn with_parse_dates(mut self, parse_dates: bool) -> Self {
        self.parse_dates = parse_dates;
        self
    }
}

/// Columns and data-row count read from one file.
#[derive(Debug, Clone, PartialEq)]
pub struct DelimitedData {
    pub columns: Vec<Column>,
    pub row_count: usize,
}

/// Parses delimited `bytes` into columns.
///
/// Rows shorter than the header are padded with nulls. Rows longer than
/// the header are rejected.
///
/// # Errors
/// Returns a source error for malformed input, a missing header row, or a
/// row with more fields than the header.
pub fn read_delimited(bytes: &[u8], options: &FileOptions) -> Result<DelimitedData> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ProfilerError::source_failed("Failed to read header row", e))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.is_empty() {
        return Err(ProfilerError::invalid_source("file has no header row"));
    }

    let names = unique_headers(headers);
    let width = names.len();
    let mut values: Vec<Vec<Value>> = vec![Vec::new(); width];
    let mut row_count = 0;

    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ProfilerError::source_failed("Failed to read row", e))?;
        if record.len() > width {
            let line = record.position().map_or(index + 2, |p| p.line() as usize);
            return Err(ProfilerError::invalid_source(format!(
                "line {} has {} fields but the header has {}",
                line,
                record.len(),
                width
            )));
        }

        for (slot, column) in values.iter_mut().enumerate() {
            let cell = record.get(slot).map_or(Value::Null, |raw| parse_cell(raw, options));
            column.push(cell);
        }
        row_count += 1;
    }

    let columns = names
        .into_iter()
        .zip(values)
        .map(|(name, values)| Column::new(name, values))
        .collect();

    Ok(DelimitedData { columns, row_count })
}

/// Types a single cell.
pub fn parse_cell(raw: &str, options: &FileOptions) -> Value {
    if NA_MARKERS.contains(&raw) {
        return Value::Null;
    }
    if let Ok(integer) = raw.parse::<i64>() {
        return Value::Integer(integer);
    }
    if let Ok(float) = raw.parse::<f64>() {
        return Value::Float(float);
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if options.parse_dates {
        if let Some(timestamp) = parse_datetime(raw) {
            return Value::DateTime(timestamp);
        }
    }
    Value::Text(raw.to_string())
}

/// Makes header names unique by suffixing repeats with `.1`, `.2`, ...
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut names = Vec::with_capacity(headers.len());

    for header in headers {
        let mut name = header.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", header, suffix);
            suffix += 1;
        }
        seen.insert(name.clone());
        names.push(name);
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn read(text: &str) -> Result<DelimitedData> {
        read_delimited(text.as_bytes(), &FileOptions::default())
    }

    fn names(data: &DelimitedData) -> Vec<&str> {
        data.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_cells_are_typed() {
        let options = FileOptions::default();
        assert_eq!(parse_cell("42", &options), Value::Integer(42));
        assert_eq!(parse_cell("-7", &options), Value::Integer(-7));
        assert_eq!(parse_cell("2.5", &options), Value::Float(2.5));
        assert_eq!(parse_cell("TRUE", &options), Value::Boolean(true));
        assert_eq!(parse_cell("false", &options), Value::Boolean(false));
        assert_eq!(
            parse_cell("2023-01-01", &options),
            Value::Text("2023-01-01".to_string())
        );
        assert_eq!(parse_cell("apple", &options), Value::Text("apple".to_string()));
    }

    #[test]
    fn test_na_markers_are_null() {
        let options = FileOptions::default();
        for marker in NA_MARKERS {
            assert_eq!(parse_cell(marker, &options), Value::Null, "marker {marker:?}");
        }
        // Markers are matched exactly
        assert_eq!(parse_cell("na", &options), Value::Text("na".to_string()));
    }

    #[test]
    fn test_parse_dates_option() {
        let options = FileOptions::default().with_parse_dates(true);
        let expected = NaiveDate::from_ymd_opt(2023, 1, 2)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert_eq!(parse_cell("2023-01-02", &options), Value::DateTime(expected));
        assert_eq!(parse_cell("12", &options), Value::Integer(12));
    }

    #[test]
    fn test_read_columns_and_row_count() {
        let data = read("id,fruit,price\n1,apple,1.5\n2,banana,\n3,orange,2\n").unwrap();

        assert_eq!(data.row_count, 3);
        assert_eq!(names(&data), ["id", "fruit", "price"]);
        assert_eq!(
            data.columns[2].values,
            vec![Value::Float(1.5), Value::Null, Value::Integer(2)]
        );
    }

    #[test]
    fn test_header_only_file_has_empty_columns() {
        let data = read("a,b\n").unwrap();
        assert_eq!(data.row_count, 0);
        assert_eq!(names(&data), ["a", "b"]);
        assert!(data.columns.iter().all(Column::is_empty));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        assert!(matches!(read(""), Err(ProfilerError::Source { .. })));
    }

    #[test]
    fn test_duplicate_headers_are_suffixed() {
        let data = read("a,b,a,a\n1,2,3,4\n").unwrap();
        assert_eq!(names(&data), ["a", "b", "a.1", "a.2"]);
    }

    #[test]
    fn test_duplicate_header_suffix_skips_existing_names() {
        let data = read("a,a.1,a\n1,2,3\n").unwrap();
        assert_eq!(names(&data), ["a", "a.1", "a.2"]);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let data = read("a,b,c\n1\n2,x\n").unwrap();
        assert_eq!(data.columns[1].values, vec![Value::Null, Value::Text("x".to_string())]);
        assert_eq!(data.columns[2].values, vec![Value::Null, Value::Null]);
    }

    #[test]
    fn test_long_rows_are_rejected() {
        let err = read("a,b\n1,2\n1,2,3\n").unwrap_err();
        assert!(matches!(err, ProfilerError::Source { .. }));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_custom_delimiter() {
        let options = FileOptions::default().with_delimiter(';').unwrap();
        let data = read_delimited(b"a;b\n1;x\n", &options).unwrap();
        assert_eq!(data.columns[0].values, vec![Value::Integer(1)]);
        assert_eq!(data.columns[1].values, vec![Value::Text("x".to_string())]);
    }

    #[test]
    fn test_invalid_delimiter() {
        assert!(FileOptions::default().with_delimiter('é').is_err());
        assert!(FileOptions::default().with_delimiter('"').is_err());
        assert!(FileOptions::default().with_delimiter('\t').is_ok());
    }

    #[test]
    fn test_quoted_fields() {
        let data = read("name,notes\n\"Smith, J\",\"said \"\"hi\"\"\"\n").unwrap();
        assert_eq!(
            data.columns[0].values,
            vec![Value::Text("Smith, J".to_string())]
        );
        assert_eq!(
            data.columns[1].values,
            vec![Value::Text("said \"hi\"".to_string())]
        );
    }
}
