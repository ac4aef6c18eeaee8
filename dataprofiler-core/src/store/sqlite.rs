//! SQLite-backed credential and profiling stores.
//!
//! Both tables live in whichever database file the store is opened on; the
//! command-line front end opens one store per file (credentials and
//! profiling results are kept apart by default).
//!
//! # Schema
//! - `db_credentials`: one row per backend kind (`db_type` is unique)
//! - `profiling_results`: one row per profiled column, statistics as JSON

use super::{CredentialRepository, ProfileLog};
use crate::Result;
use crate::connector::{BackendKind, ConnectionSpec};
use crate::credentials::StoredCredential;
use crate::error::ProfilerError;
use crate::models::{DescriptiveStats, LogicalType, ProfilingRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

const CREATE_CREDENTIALS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS db_credentials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    db_type TEXT NOT NULL UNIQUE,
    host TEXT NOT NULL,
    port TEXT NOT NULL,
    "database" TEXT NOT NULL,
    username TEXT NOT NULL,
    password_hash TEXT NOT NULL
)"#;

const CREATE_PROFILING_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS profiling_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    filename TEXT NOT NULL,
    size INTEGER,
    record_count INTEGER NOT NULL,
    create_date TEXT NOT NULL,
    table_name TEXT,
    column_name TEXT NOT NULL,
    column_type TEXT NOT NULL,
    descriptive_stats TEXT NOT NULL
)"#;

const UPSERT_CREDENTIAL: &str = r#"
INSERT INTO db_credentials (db_type, host, port, "database", username, password_hash)
VALUES (?, ?, ?, ?, ?, ?)
ON CONFLICT(db_type) DO UPDATE SET
    host = excluded.host,
    port = excluded.port,
    "database" = excluded."database",
    username = excluded.username,
    password_hash = excluded.password_hash"#;

const INSERT_RECORD: &str = r#"
INSERT INTO profiling_results
    (run_id, filename, size, record_count, create_date, table_name,
     column_name, column_type, descriptive_stats)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#;

const SELECT_RECORDS: &str = r#"
SELECT run_id, filename, size, record_count, create_date, table_name,
       column_name, column_type, descriptive_stats
FROM profiling_results"#;

/// Credential and profiling store on a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database file at `path`.
    ///
    /// # Errors
    /// Returns a store error if the file cannot be opened or the tables
    /// cannot be created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        tracing::debug!("Opening SQLite store at {}", path.display());
        Self::connect(options).await
    }

    /// Opens a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| ProfilerError::store_failed("Invalid in-memory SQLite options", e))?;
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self> {
        // A single long-lived connection: in-memory databases exist only as
        // long as their connection does.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| ProfilerError::store_failed("Failed to open SQLite store", e))?;

        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> Result<()> {
        for statement in [CREATE_CREDENTIALS_TABLE, CREATE_PROFILING_TABLE] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| ProfilerError::store_failed("Failed to create store tables", e))?;
        }
        Ok(())
    }

    /// Closes the underlying connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn fetch_records(&self, run_id: Option<Uuid>) -> Result<Vec<ProfilingRecord>> {
        let rows = match run_id {
            Some(run_id) => {
                let sql = format!("{SELECT_RECORDS} WHERE run_id = ? ORDER BY id");
                sqlx::query(&sql)
                    .bind(run_id.to_string())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!("{SELECT_RECORDS} ORDER BY id");
                sqlx::query(&sql).fetch_all(&self.pool).await
            }
        }
        .map_err(|e| ProfilerError::store_failed("Failed to read profiling results", e))?;

        rows.iter().map(record_from_row).collect()
    }
}

#[async_trait]
impl CredentialRepository for SqliteStore {
    async fn upsert(&self, credential: &StoredCredential) -> Result<()> {
        let spec = &credential.spec;
        sqlx::query(UPSERT_CREDENTIAL)
            .bind(spec.kind.as_str())
            .bind(&spec.host)
            .bind(spec.port.to_string())
            .bind(&spec.database)
            .bind(&spec.username)
            .bind(&credential.password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| ProfilerError::store_failed("Failed to save credentials", e))?;
        Ok(())
    }

    async fn find(&self, kind: BackendKind) -> Result<Option<StoredCredential>> {
        let row = sqlx::query(
            r#"SELECT host, port, "database", username, password_hash
               FROM db_credentials WHERE db_type = ?"#,
        )
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ProfilerError::store_failed("Failed to read credentials", e))?;

        row.map(|row| credential_from_row(kind, &row)).transpose()
    }
}

#[async_trait]
impl ProfileLog for SqliteStore {
    async fn append(&self, records: &[ProfilingRecord]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ProfilerError::store_failed("Failed to start transaction", e))?;

        for record in records {
            let size = record
                .size
                .map(i64::try_from)
                .transpose()
                .map_err(|e| ProfilerError::store_failed("File size out of range", e))?;
            let record_count = i64::try_from(record.record_count)
                .map_err(|e| ProfilerError::store_failed("Record count out of range", e))?;
            let stats = serde_json::to_string(&record.descriptive_stats).map_err(|e| {
                ProfilerError::Serialization {
                    context: "descriptive statistics".to_string(),
                    source: e,
                }
            })?;

            sqlx::query(INSERT_RECORD)
                .bind(record.run_id.to_string())
                .bind(&record.filename)
                .bind(size)
                .bind(record_count)
                .bind(record.create_date)
                .bind(record.table_name.as_deref())
                .bind(&record.column_name)
                .bind(record.column_type.as_str())
                .bind(stats)
                .execute(&mut *tx)
                .await
                .map_err(|e| ProfilerError::store_failed("Failed to save profiling result", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| ProfilerError::store_failed("Failed to commit profiling results", e))?;

        tracing::debug!("Appended {} profiling records", records.len());
        Ok(())
    }

    async fn records(&self) -> Result<Vec<ProfilingRecord>> {
        self.fetch_records(None).await
    }

    async fn records_for_run(&self, run_id: Uuid) -> Result<Vec<ProfilingRecord>> {
        self.fetch_records(Some(run_id)).await
    }
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| ProfilerError::store_failed(format!("Failed to read column '{}'", name), e))
}

fn credential_from_row(kind: BackendKind, row: &SqliteRow) -> Result<StoredCredential> {
    let port: String = column(row, "port")?;
    let port = port
        .parse::<u16>()
        .map_err(|e| ProfilerError::store_failed("Stored port is not a valid number", e))?;

    Ok(StoredCredential {
        spec: ConnectionSpec::new(
            kind,
            column::<String>(row, "host")?,
            port,
            column::<String>(row, "database")?,
            column::<String>(row, "username")?,
        ),
        password_hash: column(row, "password_hash")?,
    })
}

fn record_from_row(row: &SqliteRow) -> Result<ProfilingRecord> {
    let run_id: String = column(row, "run_id")?;
    let run_id = Uuid::parse_str(&run_id)
        .map_err(|e| ProfilerError::store_failed("Stored run id is not a UUID", e))?;

    let size = column::<Option<i64>>(row, "size")?
        .map(u64::try_from)
        .transpose()
        .map_err(|e| ProfilerError::store_failed("Stored size is negative", e))?;
    let record_count = u64::try_from(column::<i64>(row, "record_count")?)
        .map_err(|e| ProfilerError::store_failed("Stored record count is negative", e))?;

    let column_type: String = column(row, "column_type")?;
    let stats: String = column(row, "descriptive_stats")?;
    let descriptive_stats: DescriptiveStats =
        serde_json::from_str(&stats).map_err(|e| ProfilerError::Serialization {
            context: "descriptive statistics".to_string(),
            source: e,
        })?;

    Ok(ProfilingRecord {
        run_id,
        filename: column(row, "filename")?,
        size,
        record_count,
        create_date: column::<DateTime<Utc>>(row, "create_date")?,
        table_name: column(row, "table_name")?,
        column_name: column(row, "column_name")?,
        column_type: column_type.parse::<LogicalType>()?,
        descriptive_stats,
    })
}
