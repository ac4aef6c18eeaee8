//! PostgreSQL driver built on `sqlx`.
//!
//! The driver accepts the libpq keyword/value conninfo rendered by
//! [`PostgresBackend`](super::PostgresBackend), opens a single
//! [`PgConnection`] and decodes result cells into [`Value`]s by the
//! column's PostgreSQL type name.

use super::{ConnectionDescriptor, Driver, Session};
use crate::Result;
use crate::error::ProfilerError;
use crate::models::{RowSet, Value};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, PgSslMode, PgValueFormat};
use sqlx::{Column as _, Connection, Executor, Row, Statement, TypeInfo, ValueRef};
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// Sign word values of the binary NUMERIC format.
const NUMERIC_POSITIVE: u16 = 0x0000;
const NUMERIC_NEGATIVE: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_POSITIVE_INFINITY: u16 = 0xD000;
const NUMERIC_NEGATIVE_INFINITY: u16 = 0xF000;

/// Parsed conninfo keywords and values.
type ConnInfo = BTreeMap<String, Zeroizing<String>>;

/// Opens PostgreSQL sessions from libpq conninfo descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDriver;

#[async_trait]
impl Driver for PostgresDriver {
    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Session>> {
        let params = parse_conninfo(&descriptor.target)?;
        let mut options = connect_options(&params)?;

        if let Some(credentials) = &descriptor.credentials {
            options = options
                .username(credentials.username())
                .password(credentials.password());
        }

        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(ProfilerError::connection_failed)?;

        Ok(Box::new(PostgresSession { conn }))
    }
}

/// A single open PostgreSQL connection.
pub struct PostgresSession {
    conn: PgConnection,
}

impl std::fmt::Debug for PostgresSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSession").finish_non_exhaustive()
    }
}

#[async_trait]
impl Session for PostgresSession {
    async fn query(&mut self, sql: &str) -> Result<RowSet> {
        let rows: Vec<PgRow> = sqlx::query(sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| ProfilerError::query_error("PostgreSQL query failed", e))?;

        // Column names come from the rows when there are any; an empty
        // result still needs them, so describe the statement instead.
        let columns: Vec<String> = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => {
                let statement = (&mut self.conn)
                    .prepare(sql)
                    .await
                    .map_err(|e| ProfilerError::query_error("Failed to describe query", e))?;
                statement
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            }
        };

        let mut values = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut cells = Vec::with_capacity(row.len());
            for index in 0..row.len() {
                cells.push(decode_cell(row, index)?);
            }
            values.push(cells);
        }

        tracing::debug!(
            "PostgreSQL query returned {} rows across {} columns",
            values.len(),
            columns.len()
        );

        Ok(RowSet::new(columns, values))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(ProfilerError::connection_failed)
    }
}

/// Maps one result cell to a [`Value`] by its PostgreSQL type name.
///
/// Types without a mapping become [`Value::Other`] carrying the type name.
fn decode_cell(row: &PgRow, index: usize) -> Result<Value> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| ProfilerError::query_error("Failed to read result cell", e))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_name = row.column(index).type_info().name().to_string();
    let decode_error =
        |e: sqlx::Error| ProfilerError::query_error(format!("Failed to decode {} value", type_name), e);

    let value = match type_name.as_str() {
        "INT2" => Value::Integer(i64::from(row.try_get::<i16, _>(index).map_err(decode_error)?)),
        "INT4" => Value::Integer(i64::from(row.try_get::<i32, _>(index).map_err(decode_error)?)),
        "INT8" => Value::Integer(row.try_get::<i64, _>(index).map_err(decode_error)?),
        "FLOAT4" => Value::Float(f64::from(row.try_get::<f32, _>(index).map_err(decode_error)?)),
        "FLOAT8" => Value::Float(row.try_get::<f64, _>(index).map_err(decode_error)?),
        "NUMERIC" => {
            let unreadable = |e: sqlx::error::BoxDynError| ProfilerError::QueryExecution {
                context: "Failed to decode NUMERIC value".to_string(),
                source: Some(e),
            };
            let text = match raw.format() {
                PgValueFormat::Binary => numeric_text(raw.as_bytes().map_err(unreadable)?)?,
                PgValueFormat::Text => raw.as_str().map_err(unreadable)?.to_string(),
            };
            numeric_value(&text)
        }
        "BOOL" => Value::Boolean(row.try_get::<bool, _>(index).map_err(decode_error)?),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => {
            Value::Text(row.try_get::<String, _>(index).map_err(decode_error)?)
        }
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(index)
            .map_err(decode_error)?
            .and_hms_opt(0, 0, 0)
            .map_or(Value::Null, Value::DateTime),
        "TIMESTAMP" => Value::DateTime(
            row.try_get::<chrono::NaiveDateTime, _>(index)
                .map_err(decode_error)?,
        ),
        "TIMESTAMPTZ" => Value::DateTime(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)
                .map_err(decode_error)?
                .naive_utc(),
        ),
        "UUID" => Value::Text(
            row.try_get::<uuid::Uuid, _>(index)
                .map_err(decode_error)?
                .to_string(),
        ),
        _ => Value::Other(type_name),
    };

    Ok(value)
}

/// Renders a binary NUMERIC value as PostgreSQL's own text form.
///
/// The payload is four big-endian words (digit count, weight, sign, display
/// scale) followed by base-10000 digits, the first of which is scaled by
/// `10000^weight`.
fn numeric_text(bytes: &[u8]) -> Result<String> {
    let malformed = || ProfilerError::query_failed("malformed NUMERIC value");
    if bytes.len() < 8 {
        return Err(malformed());
    }

    let ndigits = usize::from(u16::from_be_bytes([bytes[0], bytes[1]]));
    let weight = i32::from(i16::from_be_bytes([bytes[2], bytes[3]]));
    let sign = u16::from_be_bytes([bytes[4], bytes[5]]);
    let dscale = usize::from(u16::from_be_bytes([bytes[6], bytes[7]]));

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_POSITIVE_INFINITY => return Ok("Infinity".to_string()),
        NUMERIC_NEGATIVE_INFINITY => return Ok("-Infinity".to_string()),
        NUMERIC_POSITIVE | NUMERIC_NEGATIVE => {}
        _ => return Err(malformed()),
    }
    if bytes.len() != 8 + 2 * ndigits {
        return Err(malformed());
    }

    let digits: Vec<u16> = bytes[8..]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    let group = |position: i32| {
        usize::try_from(position)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if sign == NUMERIC_NEGATIVE {
        text.push('-');
    }
    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&group(0).to_string());
        for position in 1..=weight {
            text.push_str(&format!("{:04}", group(position)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut position = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", group(position)));
            position += 1;
        }
        fraction.truncate(dscale);
        text.push('.');
        text.push_str(&fraction);
    }

    Ok(text)
}

/// Maps NUMERIC text to a cell.
///
/// `NaN` is a missing value. Whole numbers that fit in an `i64` stay exact
/// integers; everything else becomes the nearest `f64`.
fn numeric_value(text: &str) -> Value {
    match text {
        "NaN" => Value::Null,
        "Infinity" => Value::Float(f64::INFINITY),
        "-Infinity" => Value::Float(f64::NEG_INFINITY),
        _ => {
            if !text.contains('.') {
                if let Ok(integer) = text.parse::<i64>() {
                    return Value::Integer(integer);
                }
            }
            text.parse::<f64>()
                .map_or_else(|_| Value::Text(text.to_string()), Value::Float)
        }
    }
}

/// Builds connect options from parsed conninfo keywords.
fn connect_options(params: &ConnInfo) -> Result<PgConnectOptions> {
    let mut options = PgConnectOptions::new();

    for (key, value) in params {
        options = match key.as_str() {
            "host" | "hostaddr" => options.host(value),
            "port" => {
                let port = value.parse::<u16>().map_err(|_| {
                    ProfilerError::configuration("conninfo port must be a number between 1 and 65535")
                })?;
                options.port(port)
            }
            "dbname" => options.database(value),
            "user" => options.username(value),
            "password" => options.password(value),
            "sslmode" => {
                let mode = value.parse::<PgSslMode>().map_err(|_| {
                    ProfilerError::configuration(format!("unknown sslmode '{}'", value.as_str()))
                })?;
                options.ssl_mode(mode)
            }
            "application_name" => options.application_name(value),
            other => {
                tracing::debug!("Ignoring unsupported conninfo keyword '{}'", other);
                options
            }
        };
    }

    Ok(options)
}

/// Parses a libpq keyword/value conninfo string.
///
/// Values may be single-quoted; inside quotes (and in bare values) a
/// backslash escapes the next character. Error messages name keywords
/// only, never values.
fn parse_conninfo(conninfo: &str) -> Result<ConnInfo> {
    let mut params = ConnInfo::new();
    let mut chars = conninfo.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && !c.is_whitespace()) {
            key.push(c);
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        if chars.next() != Some('=') {
            return Err(ProfilerError::configuration(format!(
                "missing '=' after conninfo keyword '{}'",
                key
            )));
        }
        if key.is_empty() {
            return Err(ProfilerError::configuration("empty conninfo keyword"));
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = Zeroizing::new(String::new());
        if chars.next_if_eq(&'\'').is_some() {
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '\'' => {
                        closed = true;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            if !closed {
                return Err(ProfilerError::configuration(format!(
                    "unterminated quoted value for conninfo keyword '{}'",
                    key
                )));
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        value.push(escaped);
                    }
                } else {
                    value.push(c);
                }
            }
        }

        params.insert(key, value);
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{Backend, BackendKind, ConnectionSpec, PostgresBackend};

    fn get<'a>(params: &'a ConnInfo, key: &str) -> &'a str {
        params.get(key).map(|v| v.as_str()).unwrap()
    }

    #[test]
    fn test_parse_plain_conninfo() {
        let params =
            parse_conninfo("host=localhost port=5432 dbname=sales user=analyst password=pw")
                .unwrap();

        assert_eq!(params.len(), 5);
        assert_eq!(get(&params, "host"), "localhost");
        assert_eq!(get(&params, "port"), "5432");
        assert_eq!(get(&params, "dbname"), "sales");
        assert_eq!(get(&params, "user"), "analyst");
        assert_eq!(get(&params, "password"), "pw");
    }

    #[test]
    fn test_parse_quoted_values_and_spacing() {
        let params = parse_conninfo(r"  host = db  password='it\'s a \\secret'  dbname=''").unwrap();

        assert_eq!(get(&params, "host"), "db");
        assert_eq!(get(&params, "password"), r"it's a \secret");
        assert_eq!(get(&params, "dbname"), "");
    }

    #[test]
    fn test_parse_rendered_descriptor() {
        let spec = ConnectionSpec::new(BackendKind::Postgres, "pg.internal", 6543, "my db", "ana");
        let descriptor = PostgresBackend.descriptor(&spec, "p@ss w'rd");
        let params = parse_conninfo(&descriptor.target).unwrap();

        assert_eq!(get(&params, "host"), "pg.internal");
        assert_eq!(get(&params, "port"), "6543");
        assert_eq!(get(&params, "dbname"), "my db");
        assert_eq!(get(&params, "user"), "ana");
        assert_eq!(get(&params, "password"), "p@ss w'rd");
    }

    #[test]
    fn test_parse_rejects_malformed_conninfo() {
        assert!(parse_conninfo("host").is_err());
        assert!(parse_conninfo("=value").is_err());

        let err = parse_conninfo("password='s3cr3t").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("password"));
        assert!(!message.contains("s3cr3t"));
    }

    #[test]
    fn test_empty_conninfo_parses_to_nothing() {
        assert!(parse_conninfo("").unwrap().is_empty());
        assert!(parse_conninfo("   ").unwrap().is_empty());
    }

    fn numeric_bytes(weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let ndigits = u16::try_from(digits.len()).unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&ndigits.to_be_bytes());
        bytes.extend_from_slice(&weight.to_be_bytes());
        bytes.extend_from_slice(&sign.to_be_bytes());
        bytes.extend_from_slice(&dscale.to_be_bytes());
        for digit in digits {
            bytes.extend_from_slice(&digit.to_be_bytes());
        }
        bytes
    }

    #[test]
    fn test_numeric_text_from_binary() {
        let cases: [(Vec<u8>, &str); 6] = [
            (numeric_bytes(0, NUMERIC_POSITIVE, 2, &[12, 5000]), "12.50"),
            (numeric_bytes(2, NUMERIC_POSITIVE, 0, &[1, 2345, 6789]), "123456789"),
            (numeric_bytes(1, NUMERIC_POSITIVE, 0, &[1]), "10000"),
            (numeric_bytes(-1, NUMERIC_NEGATIVE, 1, &[5000]), "-0.5"),
            (numeric_bytes(-1, NUMERIC_POSITIVE, 7, &[1, 2340]), "0.0001234"),
            (numeric_bytes(0, NUMERIC_POSITIVE, 0, &[]), "0"),
        ];
        for (bytes, expected) in cases {
            assert_eq!(numeric_text(&bytes).unwrap(), expected);
        }
    }

    #[test]
    fn test_numeric_special_values() {
        let nan = numeric_bytes(0, NUMERIC_NAN, 0, &[]);
        assert_eq!(numeric_text(&nan).unwrap(), "NaN");
        assert_eq!(numeric_value("NaN"), Value::Null);
        assert_eq!(numeric_value("Infinity"), Value::Float(f64::INFINITY));
        assert_eq!(numeric_value("-Infinity"), Value::Float(f64::NEG_INFINITY));
    }

    #[test]
    fn test_numeric_whole_numbers_stay_exact() {
        let bytes = numeric_bytes(3, NUMERIC_POSITIVE, 0, &[9007, 1992, 5474, 993]);
        let text = numeric_text(&bytes).unwrap();

        assert_eq!(text, "9007199254740993");
        assert_eq!(numeric_value(&text), Value::Integer(9_007_199_254_740_993));
        assert_eq!(numeric_value("12.50"), Value::Float(12.5));
        assert!(matches!(
            numeric_value("123456789012345678901234567890"),
            Value::Float(f) if f > 1.0e29
        ));
    }

    #[test]
    fn test_numeric_rejects_truncated_payload() {
        assert!(numeric_text(&[0, 1]).is_err());

        let mut bytes = numeric_bytes(0, NUMERIC_POSITIVE, 0, &[12]);
        bytes.pop();
        assert!(numeric_text(&bytes).is_err());

        let bad_sign = numeric_bytes(0, 0x1234, 0, &[]);
        assert!(numeric_text(&bad_sign).is_err());
    }

    #[test]
    fn test_connect_options_reject_bad_port() {
        let params = parse_conninfo("host=localhost port=notaport").unwrap();
        assert!(matches!(
            connect_options(&params),
            Err(ProfilerError::Configuration { .. })
        ));
    }

    #[test]
    fn test_connect_options_apply_keywords() {
        let params = parse_conninfo("host=pg port=6543 dbname=sales user=ana").unwrap();
        let options = connect_options(&params).unwrap();

        assert_eq!(options.get_host(), "pg");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("sales"));
        assert_eq!(options.get_username(), "ana");
    }
}
