//! Core library for the data profiler.
//!
//! Profiles tabular sources column by column: each column is classified
//! into a logical type (number, string, datetime or unknown) and described
//! by type-specific statistics. Results are appended to a persistent
//! profiling log.
//!
//! Sources are either delimited files or tables in a relational database.
//! Database access goes through a uniform connector over DB2, Oracle and
//! PostgreSQL, and is gated by credentials stored as Argon2id hashes.
//!
//! # Security Guarantees
//! - Passwords are persisted only as salted Argon2id hashes
//! - Plaintext passwords live in zeroizing containers and are never logged
//! - Connection descriptors are redacted from debug output and errors
//!
//! # Architecture
//! - `connector`: backend trait plus driver registry behind one connector type
//! - `credentials`: credential storage, verification and release
//! - `inference` / `statistics`: pure per-column classification and metrics
//! - `profiler`: orchestration of a profiling run
//! - `store`: injected persistence for credentials and the profiling log

pub mod config;
pub mod connector;
pub mod credentials;
pub mod error;
pub mod inference;
pub mod logging;
pub mod models;
pub mod profiler;
pub mod security;
pub mod statistics;
pub mod store;

// Re-export commonly used types
pub use connector::{BackendKind, ConnectionSpec, DatabaseConnector, DriverRegistry};
pub use credentials::{CredentialStore, PasswordSource, StoredCredential};
pub use error::{ProfilerError, Result};
pub use inference::classify;
pub use models::{
    Column, DescriptiveStats, LogicalType, MetricValue, ProfilingRecord, RowSet, Value,
};
pub use profiler::{FileOptions, ProfileRun, Profiler, SourceType};
pub use statistics::{describe, profile_column};
pub use store::{CredentialRepository, MemoryStore, ProfileLog};

#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
