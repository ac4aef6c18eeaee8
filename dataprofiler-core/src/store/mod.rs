//! Persistent storage for credentials and profiling results.
//!
//! Storage is reached through two traits so the credential store and the
//! profiler can be handed any backing implementation:
//!
//! - [`CredentialRepository`]: one [`StoredCredential`] per backend kind
//! - [`ProfileLog`]: append-only log of [`ProfilingRecord`]s
//!
//! [`SqliteStore`] (feature `sqlite`) persists both to SQLite files;
//! [`MemoryStore`] keeps them in process for tests and embedding.

use crate::Result;
use crate::connector::BackendKind;
use crate::credentials::StoredCredential;
use crate::models::ProfilingRecord;
use async_trait::async_trait;
use uuid::Uuid;

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Keyed storage for hashed credentials.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Inserts the credential, replacing any existing one for the same kind.
    async fn upsert(&self, credential: &StoredCredential) -> Result<()>;

    /// Returns the credential stored for `kind`, if any.
    async fn find(&self, kind: BackendKind) -> Result<Option<StoredCredential>>;
}

/// Append-only log of profiling records.
#[async_trait]
pub trait ProfileLog: Send + Sync {
    /// Appends every record or none of them.
    async fn append(&self, records: &[ProfilingRecord]) -> Result<()>;

    /// All records in insertion order.
    async fn records(&self) -> Result<Vec<ProfilingRecord>>;

    /// Records produced by one profiling run, in insertion order.
    async fn records_for_run(&self, run_id: Uuid) -> Result<Vec<ProfilingRecord>>;
}
