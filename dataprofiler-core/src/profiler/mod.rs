//! Profiling orchestration.
//!
//! A profiling run reads one source (a delimited file or a database table),
//! classifies and describes every column, and appends one
//! [`ProfilingRecord`] per column to the [`ProfileLog`]. All records of a
//! run share a run id and the source metadata, and are written in a single
//! atomic append: a run that fails part-way leaves the log untouched.

use crate::Result;
use crate::connector::{BackendKind, DatabaseConnector, DriverRegistry};
use crate::credentials::{CredentialStore, PasswordSource};
use crate::error::ProfilerError;
use crate::models::{Column, ProfilingRecord, SourceMetadata};
use crate::statistics::profile_column;
use crate::store::ProfileLog;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

mod delimited;

pub use delimited::{DelimitedData, FileOptions, NA_MARKERS, parse_cell, read_delimited};


/// Kind of source a run profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    File,
    Database,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Database => "database",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "database" => Ok(Self::Database),
            _ => Err(ProfilerError::invalid_source(format!(
                "unsupported source type '{}', expected 'file' or 'database'",
                s
            ))),
        }
    }
}

/// Records produced by one profiling run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRun {
    pub run_id: Uuid,
    pub records: Vec<ProfilingRecord>,
}

/// Profiles sources and logs the results.
#[derive(Clone)]
pub struct Profiler {
    log: Arc<dyn ProfileLog>,
}

impl std::fmt::Debug for Profiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profiler").finish_non_exhaustive()
    }
}

impl Profiler {
    pub fn new(log: Arc<dyn ProfileLog>) -> Self {
        Self { log }
    }

    /// Profiles a delimited file with a header row.
    ///
    /// The record's source is the file's basename, its size the byte length
    /// and its timestamp the file's creation time (modification time where
    /// the filesystem does not report creation).
    ///
    /// # Errors
    /// Returns a source error if the file cannot be read or parsed; nothing
    /// is logged in that case.
    pub async fn profile_file(&self, path: &Path, options: &FileOptions) -> Result<ProfileRun> {
        let display = path.display().to_string();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ProfilerError::source_failed(format!("Cannot access {}", display), e))?;
        if !metadata.is_file() {
            return Err(ProfilerError::invalid_source(format!(
                "{} is not a regular file",
                display
            )));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ProfilerError::source_failed(format!("Cannot read {}", display), e))?;
        let data = read_delimited(&bytes, options)?;

        let filename = path
            .file_name()
            .map_or_else(|| display.clone(), |name| name.to_string_lossy().into_owned());
        let source = SourceMetadata {
            run_id: Uuid::new_v4(),
            filename,
            size: Some(metadata.len()),
            record_count: count(data.row_count),
            create_date: file_timestamp(&metadata),
            table_name: None,
        };

        tracing::info!(
            "Profiling {} ({} rows, {} columns)",
            source.filename,
            data.row_count,
            data.columns.len()
        );
        self.finish(&source, data.columns).await
    }

    /// Profiles every column of `table` over an open connector.
    ///
    /// # Errors
    /// Returns a source error for an invalid table name, `NotConnected` if
    /// the connector is closed, or a query error from the backend.
    pub async fn profile_table(
        &self,
        connector: &mut DatabaseConnector,
        table: &str,
    ) -> Result<ProfileRun> {
        validate_table_name(table)?;

        let rows = connector.execute(&format!("SELECT * FROM {}", table)).await?;
        let row_count = rows.row_count();
        let columns = rows.into_columns()?;

        let source = SourceMetadata {
            run_id: Uuid::new_v4(),
            filename: table.to_string(),
            size: None,
            record_count: count(row_count),
            create_date: Utc::now(),
            table_name: Some(table.to_string()),
        };

        tracing::info!(
            "Profiling table {} ({} rows, {} columns)",
            table,
            row_count,
            columns.len()
        );
        self.finish(&source, columns).await
    }

    /// Releases stored credentials for `kind`, connects, profiles `table`
    /// and closes the connection.
    ///
    /// The connection is closed on every path once it has been opened.
    /// An unknown kind fails before the password is requested or any
    /// connection is attempted.
    ///
    /// # Errors
    /// Any error from credential release, connection, or profiling.
    pub async fn profile_database(
        &self,
        credentials: &CredentialStore,
        kind: BackendKind,
        table: &str,
        password_source: &dyn PasswordSource,
        drivers: &DriverRegistry,
    ) -> Result<ProfileRun> {
        validate_table_name(table)?;

        let (spec, creds) = credentials.release(kind, password_source).await?;
        let driver = drivers.driver(kind)?;
        let mut connector = DatabaseConnector::new(spec, creds.password(), driver);
        drop(creds);

        connector.connect().await?;
        let result = self.profile_table(&mut connector, table).await;
        connector.close().await;

        result
    }

    async fn finish(&self, source: &SourceMetadata, columns: Vec<Column>) -> Result<ProfileRun> {
        let records: Vec<ProfilingRecord> = columns
            .iter()
            .map(|column| {
                let (column_type, stats) = profile_column(column);
                tracing::debug!("Column {} classified as {}", column.name, column_type);
                source.record(column.name.clone(), column_type, stats)
            })
            .collect();

        self.log.append(&records).await?;
        tracing::info!(
            "Logged {} profiling records for run {}",
            records.len(),
            source.run_id
        );

        Ok(ProfileRun {
            run_id: source.run_id,
            records,
        })
    }
}

/// Checks that `table` is a plain or schema-qualified SQL identifier.
///
/// Each dot-separated part must start with a letter or underscore and
/// continue with letters, digits, underscores or `$`.
///
/// # Errors
/// Returns a source error describing the rejected name.
pub fn validate_table_name(table: &str) -> Result<()> {
    let parts: Vec<&str> = table.split('.').collect();
    let valid = parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|first| first.is_alphabetic() || first == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        });

    if valid {
        Ok(())
    } else {
        Err(ProfilerError::invalid_source(format!(
            "invalid table name '{}'",
            table
        )))
    }
}

fn count(rows: usize) -> u64 {
    u64::try_from(rows).unwrap_or(u64::MAX)
}

fn file_timestamp(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    match metadata.created().or_else(|_| metadata.modified()) {
        Ok(time) => DateTime::<Utc>::from(time),
        Err(e) => {
            tracing::warn!("File timestamps unavailable, using current time: {}", e);
            Utc::now()
        }
    }
}
