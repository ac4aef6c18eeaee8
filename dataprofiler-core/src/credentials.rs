//! Hashed credential storage and password release.
//!
//! One credential is kept per backend kind. Only an Argon2id hash of the
//! password is persisted; the plaintext is needed again at connection time
//! and is obtained from a [`PasswordSource`] (normally an interactive
//! prompt), checked against the hash, and handed out in zeroizing
//! [`Credentials`].

use crate::Result;
use crate::connector::{BackendKind, ConnectionSpec};
use crate::error::ProfilerError;
use crate::security::{Credentials, spawn_hash_password, spawn_verify_password, verify_password};
use crate::store::CredentialRepository;
use std::sync::Arc;
use zeroize::Zeroizing;

/// A persisted credential: connection parameters plus the password hash.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub spec: ConnectionSpec,
    /// PHC-format Argon2id hash string
    pub password_hash: String,
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Capability to obtain a plaintext password on demand.
///
/// Implemented for closures so tests can supply a fixed password.
pub trait PasswordSource {
    /// Returns the password for the credential being released.
    ///
    /// # Errors
    /// Returns an error if the password cannot be read (e.g. no terminal).
    fn read_password(&self) -> Result<Zeroizing<String>>;
}

impl<F> PasswordSource for F
where
    F: Fn() -> Result<Zeroizing<String>>,
{
    fn read_password(&self) -> Result<Zeroizing<String>> {
        self()
    }
}

/// Stores, looks up and verifies backend credentials.
#[derive(Clone)]
pub struct CredentialStore {
    repository: Arc<dyn CredentialRepository>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

impl CredentialStore {
    pub fn new(repository: Arc<dyn CredentialRepository>) -> Self {
        Self { repository }
    }

    /// Hashes `password` and saves it with `spec`, replacing any credential
    /// already stored for the same backend kind.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid spec, or a hashing or
    /// store error.
    pub async fn store(&self, spec: &ConnectionSpec, password: &str) -> Result<()> {
        spec.validate()?;

        let credential = StoredCredential {
            spec: spec.clone(),
            password_hash: spawn_hash_password(password).await?,
        };
        self.repository.upsert(&credential).await?;

        tracing::info!("Stored credentials for {} backend", spec.kind);
        Ok(())
    }

    /// Fetches the stored credential for `kind`.
    ///
    /// # Errors
    /// Returns `CredentialNotFound` when nothing is stored for `kind`.
    pub async fn lookup(&self, kind: BackendKind) -> Result<StoredCredential> {
        self.repository
            .find(kind)
            .await?
            .ok_or_else(|| ProfilerError::credential_not_found(kind))
    }

    /// Checks a plaintext password against a stored hash.
    ///
    /// Runs Argon2 on the calling thread; async callers inside this crate
    /// verify on the blocking pool instead.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        verify_password(password, stored_hash)
    }

    /// Looks up `kind` and checks `password` against it.
    ///
    /// # Errors
    /// Returns `CredentialNotFound` or `Authentication`.
    pub async fn authenticate(&self, kind: BackendKind, password: &str) -> Result<ConnectionSpec> {
        let stored = self.lookup(kind).await?;
        if !spawn_verify_password(password, &stored.password_hash).await {
            tracing::warn!("Password verification failed for {} backend", kind);
            return Err(ProfilerError::Authentication);
        }
        Ok(stored.spec)
    }

    /// Releases usable credentials for `kind`.
    ///
    /// The stored credential is looked up before the password source is
    /// consulted, so an unknown kind fails without prompting.
    ///
    /// # Errors
    /// Returns `CredentialNotFound`, `Authentication`, or whatever the
    /// password source reports.
    pub async fn release(
        &self,
        kind: BackendKind,
        source: &dyn PasswordSource,
    ) -> Result<(ConnectionSpec, Credentials)> {
        let stored = self.lookup(kind).await?;
        let password = source.read_password()?;

        if !spawn_verify_password(&password, &stored.password_hash).await {
            tracing::warn!("Password verification failed for {} backend", kind);
            return Err(ProfilerError::Authentication);
        }

        let credentials = Credentials::new(stored.spec.username.clone(), password.to_string());
        tracing::debug!("Released credentials for {}", stored.spec);
        Ok((stored.spec, credentials))
    }
}
