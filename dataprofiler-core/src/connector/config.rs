//! Backend kinds and connection parameters.
//!
//! This module provides [`BackendKind`] and [`ConnectionSpec`], the
//! non-secret half of what is needed to reach a database instance.

use serde::{Deserialize, Serialize};

/// Relational backends the profiler knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Db2,
    Oracle,
    Postgres,
}

impl BackendKind {
    /// All recognised kinds, in display order.
    pub const ALL: [Self; 3] = [Self::Db2, Self::Oracle, Self::Postgres];

    /// Stable label used in the credential store and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Db2 => "db2",
            Self::Oracle => "oracle",
            Self::Postgres => "postgres",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = crate::error::ProfilerError;

    /// Parses a backend label case-insensitively.
    ///
    /// # Errors
    /// Returns `UnsupportedBackend` for any label that is not recognised.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "db2" => Ok(Self::Db2),
            "oracle" => Ok(Self::Oracle),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            _ => Err(crate::error::ProfilerError::unsupported_backend(s)),
        }
    }
}

/// Parameters needed to address a database instance.
///
/// # Security
/// This struct intentionally does NOT hold a password. The password is
/// supplied fresh for each connection and never stored alongside the spec.
///
/// # Example
/// ```rust
/// use dataprofiler_core::connector::{BackendKind, ConnectionSpec};
///
/// let spec = ConnectionSpec::new(BackendKind::Postgres, "localhost", 5432, "sales", "analyst");
/// assert!(spec.validate().is_ok());
/// assert_eq!(spec.to_string(), "postgres://localhost:5432/sales");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    /// Backend family
    pub kind: BackendKind,
    /// Database host address
    pub host: String,
    /// Listener port
    pub port: u16,
    /// Database (or Oracle service) name
    pub database: String,
    /// Login name (password handled separately)
    pub username: String,
}

impl std::fmt::Display for ConnectionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}://{}:{}/{}",
            self.kind, self.host, self.port, self.database
        )
        // Intentionally omit username and never include credentials
    }
}

impl ConnectionSpec {
    /// Creates a new connection spec.
    pub fn new(
        kind: BackendKind,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            host: host.into(),
            port,
            database: database.into(),
            username: username.into(),
        }
    }

    /// Validates connection parameters.
    ///
    /// # Errors
    /// Returns error if any field is empty or the port is zero
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(crate::error::ProfilerError::configuration(
                "host cannot be empty",
            ));
        }

        if self.port == 0 {
            return Err(crate::error::ProfilerError::configuration(
                "port must be greater than 0",
            ));
        }

        if self.database.trim().is_empty() {
            return Err(crate::error::ProfilerError::configuration(
                "database cannot be empty",
            ));
        }

        if self.username.trim().is_empty() {
            return Err(crate::error::ProfilerError::configuration(
                "username cannot be empty",
            ));
        }

        Ok(())
    }
}
