//! Core data models for columnar profiling.
//!
//! Sources of every kind (CSV files, database result sets) are reduced to
//! the same representation: named [`Column`]s of [`Value`]s. Profiling
//! produces one [`ProfilingRecord`] per column.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Timestamp layouts recognised when text is interpreted as a date.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing cell
    Null,
    /// True or false
    Boolean(bool),
    /// Whole number that fits in 64 bits
    Integer(i64),
    /// Floating point number; NaN counts as missing
    Float(f64),
    /// Free text, kept verbatim
    Text(String),
    /// Timestamp without a time zone
    DateTime(NaiveDateTime),
    /// Native type the driver could not map; carries the type name
    Other(String),
}

impl Value {
    /// NaN floats are treated as missing values.
    pub fn is_null(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Returns true for integers and (non-NaN) floats.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_)) || matches!(self, Self::Float(f) if !f.is_nan())
    }

    /// Exact ordering between two numeric values.
    ///
    /// Integers compare as integers. Mixed pairs compare through `f64` and
    /// settle ties exactly, so integers beyond 2^53 never collapse together.
    /// Returns `None` when either side is not numeric.
    pub fn numeric_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Float(b)) if !b.is_nan() => Some(cmp_int_float(*a, *b)),
            (Self::Float(a), Self::Integer(b)) if !a.is_nan() => {
                Some(cmp_int_float(*b, *a).reverse())
            }
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    /// Borrowed text of a [`Value::Text`] cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Timestamp view: native datetimes, or text that parses as one.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            Self::Text(s) => parse_datetime(s),
            _ => None,
        }
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn cmp_int_float(int: i64, float: f64) -> Ordering {
    match (int as f64).partial_cmp(&float) {
        Some(Ordering::Equal) | None => {}
        Some(ordering) => return ordering,
    }
    // The rounded integer equals `float`, so `float` is integral here
    if float >= 9_223_372_036_854_775_808.0 {
        Ordering::Less
    } else {
        int.cmp(&(float as i64))
    }
}

/// Parses the date and timestamp forms the profiler recognises.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS[.f]]` (space or `T`
/// separated) and RFC 3339 timestamps, which are normalised to UTC.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).naive_utc())
}

/// A named, ordered sequence of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Header or result column name
    pub name: String,
    /// Cells in source order
    pub values: Vec<Value>,
}

impl Column {
    /// Creates a column from its name and cells.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Iterates over the values that are not null.
    pub fn non_null(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().filter(|v| !v.is_null())
    }

    /// Number of cells, nulls included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the column has no cells at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Rows returned by a query, with the column names needed to rebuild columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Result column names, in select order
    pub columns: Vec<String>,
    /// One entry per row, each as wide as `columns`
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// Creates a result set from column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Transposes the rows into one [`Column`] per result column.
    ///
    /// # Errors
    /// Returns a query error if any row's width differs from the column count.
    pub fn into_columns(self) -> crate::Result<Vec<Column>> {
        let width = self.columns.len();
        let mut values: Vec<Vec<Value>> = (0..width)
            .map(|_| Vec::with_capacity(self.rows.len()))
            .collect();

        for (index, row) in self.rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(crate::error::ProfilerError::query_failed(format!(
                    "row {} has {} values but the result has {} columns",
                    index,
                    row.len(),
                    width
                )));
            }
            for (slot, value) in values.iter_mut().zip(row) {
                slot.push(value);
            }
        }

        Ok(self
            .columns
            .into_iter()
            .zip(values)
            .map(|(name, values)| Column::new(name, values))
            .collect())
    }
}

/// Inferred semantic category of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    /// Every present value is text
    String,
    /// Every present value is an integer or float
    Number,
    /// Every present value is a timestamp or date-like text
    DateTime,
    /// Empty, all-null, boolean or mixed columns
    Unknown,
}

impl LogicalType {
    /// Lowercase label used in records and the profiling log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::DateTime => "datetime",
            Self::Unknown => "unknown",
        }
    }

    /// Metric names produced for this type, in the order they are stored.
    pub fn metric_names(&self) -> &'static [&'static str] {
        match self {
            Self::Number => &["max", "min"],
            Self::String => &["max_length", "min_length"],
            Self::DateTime => &["max_date", "min_date"],
            Self::Unknown => &[],
        }
    }
}

impl std::fmt::Display for LogicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogicalType {
    type Err = crate::error::ProfilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "datetime" => Ok(Self::DateTime),
            "unknown" => Ok(Self::Unknown),
            other => Err(crate::error::ProfilerError::configuration(format!(
                "Unknown column type: {}",
                other
            ))),
        }
    }
}

/// A single statistic value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Integer minimum/maximum, or a length
    Integer(i64),
    /// Float minimum/maximum
    Float(f64),
    /// Earliest or latest timestamp
    Timestamp(NaiveDateTime),
}

impl MetricValue {
    /// Converts a numeric or timestamp cell; other values have no metric form.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(Self::Integer(*i)),
            Value::Float(f) if !f.is_nan() => Some(Self::Float(*f)),
            Value::DateTime(dt) => Some(Self::Timestamp(*dt)),
            _ => None,
        }
    }

    /// Integer payload, if any.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric payload as `f64`; `None` for timestamps.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Timestamp(_) => None,
        }
    }

    /// Timestamp payload, if any.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// Named metrics for one column.
///
/// The key set is fixed by the column's [`LogicalType`]; instances are built
/// through the per-type constructors so a record can never carry a metric
/// outside that mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptiveStats(BTreeMap<String, MetricValue>);

impl DescriptiveStats {
    /// The empty result (unknown columns, or no qualifying values).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Metrics of a `number` column.
    pub fn numeric(min: MetricValue, max: MetricValue) -> Self {
        Self::pair(("min", min), ("max", max))
    }

    /// Metrics of a `string` column, lengths in characters.
    pub fn lengths(min_length: i64, max_length: i64) -> Self {
        Self::pair(
            ("min_length", MetricValue::Integer(min_length)),
            ("max_length", MetricValue::Integer(max_length)),
        )
    }

    /// Metrics of a `datetime` column.
    pub fn dates(min_date: NaiveDateTime, max_date: NaiveDateTime) -> Self {
        Self::pair(
            ("min_date", MetricValue::Timestamp(min_date)),
            ("max_date", MetricValue::Timestamp(max_date)),
        )
    }

    fn pair(lower: (&str, MetricValue), upper: (&str, MetricValue)) -> Self {
        let mut metrics = BTreeMap::new();
        metrics.insert(lower.0.to_string(), lower.1);
        metrics.insert(upper.0.to_string(), upper.1);
        Self(metrics)
    }

    /// Looks up a metric by name.
    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.0.get(name)
    }

    /// Metric names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of metrics.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no metric was computed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks the key set against the metrics defined for `logical_type`.
    pub fn conforms_to(&self, logical_type: LogicalType) -> bool {
        self.is_empty() || self.keys().eq(logical_type.metric_names().iter().copied())
    }
}

/// Outcome of profiling one column of one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilingRecord {
    /// Shared by every record produced in the same run
    pub run_id: Uuid,
    /// File basename, or the table name for database sources
    pub filename: String,
    /// Size in bytes; file sources only
    pub size: Option<u64>,
    /// Data rows in the source
    pub record_count: u64,
    /// File creation time, or profiling time for tables
    pub create_date: DateTime<Utc>,
    /// Database sources only
    pub table_name: Option<String>,
    /// Profiled column
    pub column_name: String,
    /// Inferred type of the column
    pub column_type: LogicalType,
    /// Metrics for `column_type`
    pub descriptive_stats: DescriptiveStats,
}

/// Source-level metadata shared by every record in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetadata {
    /// Id of the run being recorded
    pub run_id: Uuid,
    /// See [`ProfilingRecord::filename`]
    pub filename: String,
    /// See [`ProfilingRecord::size`]
    pub size: Option<u64>,
    /// See [`ProfilingRecord::record_count`]
    pub record_count: u64,
    /// See [`ProfilingRecord::create_date`]
    pub create_date: DateTime<Utc>,
    /// See [`ProfilingRecord::table_name`]
    pub table_name: Option<String>,
}

impl SourceMetadata {
    /// Builds the record for one column of this source.
    pub fn record(
        &self,
        column_name: impl Into<String>,
        column_type: LogicalType,
        descriptive_stats: DescriptiveStats,
    ) -> ProfilingRecord {
        ProfilingRecord {
            run_id: self.run_id,
            filename: self.filename.clone(),
            size: self.size,
            record_count: self.record_count,
            create_date: self.create_date,
            table_name: self.table_name.clone(),
            column_name: column_name.into(),
            column_type,
            descriptive_stats,
        }
    }
}
