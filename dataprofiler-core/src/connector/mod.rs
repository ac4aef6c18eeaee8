//! Uniform connector contract over relational backends.
//!
//! A [`DatabaseConnector`] exposes three operations (`connect`, `execute`,
//! `close`) regardless of which backend it talks to. Two seams keep backend
//! variance out of calling code:
//!
//! - [`Backend`] renders a [`ConnectionSpec`] into a native
//!   [`ConnectionDescriptor`] (one implementation per [`BackendKind`]).
//! - [`Driver`] opens a descriptor into a [`Session`] that runs queries.
//!   Drivers are looked up in a [`DriverRegistry`], so adding a backend means
//!   registering one more driver.
//!
//! # Module Structure
//! - `config`: [`BackendKind`] and [`ConnectionSpec`]
//! - `backends`: descriptor rendering for DB2, Oracle and PostgreSQL
//! - `placeholder`: driver stand-in for backends without a compiled driver
//! - `postgres`: `sqlx`-backed PostgreSQL driver (feature `postgresql`)
//!
//! # Concurrency
//! Connect, execute and close take `&mut self`; a connector serves a single
//! caller. Calls block the awaiting task until the driver returns and carry
//! no internal timeout.

use crate::Result;
use crate::error::ProfilerError;
use crate::models::RowSet;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use zeroize::Zeroizing;

pub mod backends;
pub mod config;
pub mod placeholder;

#[cfg(feature = "postgresql")]
pub mod postgres;


pub use backends::{
    Backend, ConnectionDescriptor, Db2Backend, OracleBackend, PostgresBackend, backend_for,
};
pub use config::{BackendKind, ConnectionSpec};
pub use placeholder::UnavailableDriver;

/// Low-level capability to open a native connection.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Opens a session for the given descriptor.
    ///
    /// # Errors
    /// Returns a connection error when the backend is unreachable or rejects
    /// the credentials.
    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn Session>>;
}

/// An open native connection.
#[async_trait]
pub trait Session: Send {
    /// Runs `sql` and returns every row along with the result's column names.
    async fn query(&mut self, sql: &str) -> Result<RowSet>;

    /// Releases the native connection.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Maps backend kinds to the drivers that serve them.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<BackendKind, Arc<dyn Driver>>,
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("kinds", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DriverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every driver compiled into this build.
    ///
    /// Backends without a native driver are registered with an
    /// [`UnavailableDriver`] so that opening them fails with a clear error.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in BackendKind::ALL {
            registry.register(kind, Arc::new(UnavailableDriver::new(kind)));
        }

        #[cfg(feature = "postgresql")]
        registry.register(BackendKind::Postgres, Arc::new(postgres::PostgresDriver));

        registry
    }

    /// Registers (or replaces) the driver for `kind`.
    pub fn register(&mut self, kind: BackendKind, driver: Arc<dyn Driver>) {
        self.drivers.insert(kind, driver);
    }

    /// Looks up the driver for `kind`.
    ///
    /// # Errors
    /// Returns `UnsupportedFeature` when no driver is registered.
    pub fn driver(&self, kind: BackendKind) -> Result<Arc<dyn Driver>> {
        self.drivers.get(&kind).cloned().ok_or_else(|| {
            ProfilerError::unsupported_feature("database driver", kind.as_str())
        })
    }
}

/// A connection to one database, polymorphic over backend kind.
///
/// # Example
/// ```rust,no_run
/// use dataprofiler_core::connector::{BackendKind, ConnectionSpec, DatabaseConnector, DriverRegistry};
///
/// # async fn example() -> dataprofiler_core::Result<()> {
/// let spec = ConnectionSpec::new(BackendKind::Postgres, "localhost", 5432, "sales", "analyst");
/// let driver = DriverRegistry::with_defaults().driver(spec.kind)?;
/// let mut connector = DatabaseConnector::new(spec, "secret", driver);
///
/// connector.connect().await?;
/// let rows = connector.execute("SELECT 1").await;
/// connector.close().await;
/// # rows.map(|_| ())
/// # }
/// ```
pub struct DatabaseConnector {
    spec: ConnectionSpec,
    password: Zeroizing<String>,
    backend: Box<dyn Backend>,
    driver: Arc<dyn Driver>,
    session: Option<Box<dyn Session>>,
}

impl std::fmt::Debug for DatabaseConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConnector")
            .field("spec", &self.spec)
            .field("connected", &self.is_connected())
            // Note: password is intentionally omitted
            .finish_non_exhaustive()
    }
}

impl DatabaseConnector {
    /// Creates a connector; no connection is attempted until [`connect`](Self::connect).
    pub fn new(spec: ConnectionSpec, password: &str, driver: Arc<dyn Driver>) -> Self {
        let backend = backend_for(spec.kind);
        Self {
            spec,
            password: Zeroizing::new(password.to_string()),
            backend,
            driver,
            session: None,
        }
    }

    /// The connection parameters (no password).
    pub fn spec(&self) -> &ConnectionSpec {
        &self.spec
    }

    /// Whether a session is currently open.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Opens the connection. Calling it on an open connector is a no-op.
    ///
    /// # Errors
    /// Returns a connection error when the driver cannot open the backend,
    /// or `UnsupportedFeature` when no native driver is available.
    pub async fn connect(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        self.spec.validate()?;
        let descriptor = self.backend.descriptor(&self.spec, &self.password);

        tracing::debug!("Connecting to {}", self.spec);
        let session = self.driver.open(&descriptor).await?;
        self.session = Some(session);
        tracing::info!("Connected to {} backend", self.backend.kind());

        Ok(())
    }

    /// Runs a query on the open connection.
    ///
    /// # Errors
    /// Returns `NotConnected` before [`connect`](Self::connect) and a query
    /// error when the backend rejects or fails the statement.
    pub async fn execute(&mut self, query: &str) -> Result<RowSet> {
        let session = self
            .session
            .as_mut()
            .ok_or(ProfilerError::NotConnected)?;

        tracing::debug!("Executing query on {} backend", self.spec.kind);
        session.query(query).await
    }

    /// Releases the connection. Safe to call repeatedly or before connecting.
    ///
    /// Close failures are logged rather than returned; the session is gone
    /// either way.
    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            match session.close().await {
                Ok(()) => tracing::debug!("Closed connection to {}", self.spec),
                Err(e) => tracing::warn!("Error while closing connection: {}", e),
            }
        }
    }
}
