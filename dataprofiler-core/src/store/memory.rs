//! In-process store implementation.

use super::{CredentialRepository, ProfileLog};
use crate::Result;
use crate::connector::BackendKind;
use crate::credentials::StoredCredential;
use crate::error::ProfilerError;
use crate::models::ProfilingRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Mutex-guarded in-memory credentials and profiling log.
#[derive(Debug, Default)]
pub struct MemoryStore {
    credentials: Mutex<HashMap<BackendKind, StoredCredential>>,
    records: Mutex<Vec<ProfilingRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| ProfilerError::Store {
        context: "in-memory store lock poisoned".to_string(),
        source: "a previous writer panicked".into(),
    })
}

#[async_trait]
impl CredentialRepository for MemoryStore {
    async fn upsert(&self, credential: &StoredCredential) -> Result<()> {
        lock(&self.credentials)?.insert(credential.spec.kind, credential.clone());
        Ok(())
    }

    async fn find(&self, kind: BackendKind) -> Result<Option<StoredCredential>> {
        Ok(lock(&self.credentials)?.get(&kind).cloned())
    }
}

#[async_trait]
impl ProfileLog for MemoryStore {
    async fn append(&self, records: &[ProfilingRecord]) -> Result<()> {
        lock(&self.records)?.extend_from_slice(records);
        Ok(())
    }

    async fn records(&self) -> Result<Vec<ProfilingRecord>> {
        Ok(lock(&self.records)?.clone())
    }

    async fn records_for_run(&self, run_id: Uuid) -> Result<Vec<ProfilingRecord>> {
        Ok(lock(&self.records)?
            .iter()
            .filter(|record| record.run_id == run_id)
            .cloned()
            .collect())
    }
}
