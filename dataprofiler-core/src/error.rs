//! Error types with credential sanitization.
//!
//! Every failure the profiler can surface has its own variant so callers
//! (notably the command-line front end) can tell them apart. None of the
//! messages carry passwords, password hashes or rendered connection
//! descriptors.

use thiserror::Error;

/// Boxed error used as the source of driver and store failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for profiling operations.
///
/// # Security
/// Connection descriptors and passwords are never included in error output.
#[derive(Debug, Error)]
pub enum ProfilerError {
    /// Backend label is not one of the recognised kinds
    #[error("Unsupported database backend: {kind}")]
    UnsupportedBackend { kind: String },

    /// Backend unreachable or credentials rejected (credentials sanitized)
    #[error("Database connection failed: {context}")]
    Connection {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Malformed SQL or backend-side execution failure
    #[error("Query execution failed: {context}")]
    QueryExecution {
        context: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Operation attempted before `connect()`
    #[error("Connection not established: call connect() first")]
    NotConnected,

    /// No stored credential for the requested backend kind
    #[error("No credentials found for {kind}")]
    CredentialNotFound { kind: String },

    /// Supplied password does not match the stored hash
    #[error("Invalid password")]
    Authentication,

    /// Unreadable file or invalid source-type argument
    #[error("Source error: {context}")]
    Source {
        context: String,
        #[source]
        source: Option<BoxError>,
    },

    /// One or more required configuration values are absent
    #[error("Missing required configuration: {}", keys.join(", "))]
    MissingConfiguration { keys: Vec<String> },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Password hashing failed or produced an unusable hash
    #[error("Password hashing failed: {context}")]
    Hashing { context: String },

    /// Credential or profiling store operation failed
    #[error("Store operation failed: {context}")]
    Store {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backend recognised but not usable in this build
    #[error("Unsupported operation: {feature} not supported for {database_type}")]
    UnsupportedFeature {
        feature: String,
        database_type: String,
    },
}

/// Convenience type alias for Results with ProfilerError
pub type Result<T> = std::result::Result<T, ProfilerError>;

impl ProfilerError {
    /// Creates a connection error with sanitized context
    pub fn connection_failed<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Connection {
            context: "backend unreachable or credentials rejected".to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a query execution error without an underlying cause
    pub fn query_failed(context: impl Into<String>) -> Self {
        Self::QueryExecution {
            context: context.into(),
            source: None,
        }
    }

    /// Creates a query execution error wrapping the driver error
    pub fn query_error<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::QueryExecution {
            context: context.into(),
            source: Some(Box::new(error)),
        }
    }

    /// Creates a source error, e.g. for an unreadable file
    pub fn source_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Source {
            context: context.into(),
            source: Some(Box::new(error)),
        }
    }

    /// Creates a source error without an underlying cause
    pub fn invalid_source(context: impl Into<String>) -> Self {
        Self::Source {
            context: context.into(),
            source: None,
        }
    }

    /// Creates a store error with context
    pub fn store_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an unsupported backend error for an unrecognised label
    pub fn unsupported_backend(kind: impl Into<String>) -> Self {
        Self::UnsupportedBackend { kind: kind.into() }
    }

    /// Creates a credential lookup miss
    pub fn credential_not_found(kind: impl std::fmt::Display) -> Self {
        Self::CredentialNotFound {
            kind: kind.to_string(),
        }
    }

    /// Creates a hashing error
    pub fn hashing(context: impl Into<String>) -> Self {
        Self::Hashing {
            context: context.into(),
        }
    }

    /// Creates an unsupported feature error
    pub fn unsupported_feature(
        feature: impl Into<String>,
        database_type: impl Into<String>,
    ) -> Self {
        Self::UnsupportedFeature {
            feature: feature.into(),
            database_type: database_type.into(),
        }
    }
}
