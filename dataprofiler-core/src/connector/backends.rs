//! Backend-specific connection descriptor rendering.
//!
//! The supported backends differ only in how a [`ConnectionSpec`] and
//! password become a native connection descriptor. Each backend implements
//! [`Backend`]; [`backend_for`] picks the implementation once, when a
//! connector is built.

use super::config::{BackendKind, ConnectionSpec};
use crate::security::Credentials;
use zeroize::Zeroizing;

/// A backend-native connection target, ready to hand to a driver.
///
/// # Security
/// `target` may embed the password (DB2, PostgreSQL). It is held in a
/// zeroizing container and redacted from `Debug` output.
pub struct ConnectionDescriptor {
    /// Connection string, TNS descriptor or libpq conninfo
    pub target: Zeroizing<String>,
    /// Login supplied beside the target when the backend keeps it separate
    pub credentials: Option<Credentials>,
}

impl std::fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("target", &"<redacted>")
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Renders connection descriptors for one backend family.
pub trait Backend: Send + Sync {
    /// The backend kind this implementation serves.
    fn kind(&self) -> BackendKind;

    /// Builds the native descriptor for `spec` authenticated by `password`.
    fn descriptor(&self, spec: &ConnectionSpec, password: &str) -> ConnectionDescriptor;
}

/// Returns the backend implementation for `kind`.
pub fn backend_for(kind: BackendKind) -> Box<dyn Backend> {
    match kind {
        BackendKind::Db2 => Box::new(Db2Backend),
        BackendKind::Oracle => Box::new(OracleBackend),
        BackendKind::Postgres => Box::new(PostgresBackend),
    }
}

/// IBM DB2 CLI connection string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Db2Backend;

impl Backend for Db2Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::Db2
    }

    fn descriptor(&self, spec: &ConnectionSpec, password: &str) -> ConnectionDescriptor {
        ConnectionDescriptor {
            target: Zeroizing::new(format!(
                "DATABASE={};HOSTNAME={};PORT={};PROTOCOL=TCPIP;UID={};PWD={};",
                quote_db2_value(&spec.database),
                quote_db2_value(&spec.host),
                spec.port,
                quote_db2_value(&spec.username),
                Zeroizing::new(quote_db2_value(password)).as_str()
            )),
            credentials: None,
        }
    }
}

/// Oracle TNS descriptor addressing a service name; credentials travel separately.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleBackend;

impl Backend for OracleBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Oracle
    }

    fn descriptor(&self, spec: &ConnectionSpec, password: &str) -> ConnectionDescriptor {
        ConnectionDescriptor {
            target: Zeroizing::new(format!(
                "(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST={})(PORT={}))(CONNECT_DATA=(SERVICE_NAME={})))",
                spec.host, spec.port, spec.database
            )),
            credentials: Some(Credentials::new(
                spec.username.clone(),
                password.to_string(),
            )),
        }
    }
}

/// libpq keyword/value conninfo string.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresBackend;

impl Backend for PostgresBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn descriptor(&self, spec: &ConnectionSpec, password: &str) -> ConnectionDescriptor {
        let port = spec.port.to_string();
        let pairs = [
            ("host", spec.host.as_str()),
            ("port", port.as_str()),
            ("dbname", spec.database.as_str()),
            ("user", spec.username.as_str()),
            ("password", password),
        ];

        let conninfo = pairs
            .iter()
            .map(|(key, value)| format!("{}={}", key, quote_conninfo_value(value)))
            .collect::<Vec<_>>()
            .join(" ");

        ConnectionDescriptor {
            target: Zeroizing::new(conninfo),
            credentials: None,
        }
    }
}

/// Quotes a conninfo value when libpq would otherwise misread it.
///
/// Empty values and values containing whitespace, quotes or backslashes are
/// wrapped in single quotes with `'` and `\` backslash-escaped.
pub fn quote_conninfo_value(value: &str) -> String {
    let needs_quoting = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');

    if !needs_quoting {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// Braces a DB2 CLI keyword value when it could be misread.
///
/// Empty values, values with `;`, `=`, braces or surrounding whitespace are
/// wrapped in `{...}` with `}` doubled.
pub fn quote_db2_value(value: &str) -> String {
    let needs_braces = value.is_empty()
        || value.trim() != value
        || value.chars().any(|c| matches!(c, ';' | '=' | '{' | '}'));

    if !needs_braces {
        return value.to_string();
    }

    let mut braced = String::with_capacity(value.len() + 2);
    braced.push('{');
    for c in value.chars() {
        if c == '}' {
            braced.push('}');
        }
        braced.push(c);
    }
    braced.push('}');
    braced
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: BackendKind) -> ConnectionSpec {
        ConnectionSpec::new(kind, "db.example.com", 50000, "SAMPLE", "db2inst1")
    }

    #[test]
    fn test_backend_for_selects_matching_kind() {
        for kind in BackendKind::ALL {
            assert_eq!(backend_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_db2_connection_string() {
        let descriptor = Db2Backend.descriptor(&spec(BackendKind::Db2), "pw");
        assert_eq!(
            descriptor.target.as_str(),
            "DATABASE=SAMPLE;HOSTNAME=db.example.com;PORT=50000;PROTOCOL=TCPIP;UID=db2inst1;PWD=pw;"
        );
        assert!(descriptor.credentials.is_none());
    }

    #[test]
    fn test_db2_connection_string_braces_awkward_values() {
        let mut db2 = spec(BackendKind::Db2);
        db2.username = "svc user".to_string();
        let descriptor = Db2Backend.descriptor(&db2, "pw;UID=admin");

        assert_eq!(
            descriptor.target.as_str(),
            "DATABASE=SAMPLE;HOSTNAME=db.example.com;PORT=50000;PROTOCOL=TCPIP;UID=svc user;PWD={pw;UID=admin};"
        );
    }

    #[test]
    fn test_quote_db2_value() {
        assert_eq!(quote_db2_value("plain"), "plain");
        assert_eq!(quote_db2_value(""), "{}");
        assert_eq!(quote_db2_value("a;b"), "{a;b}");
        assert_eq!(quote_db2_value("x}y"), "{x}}y}");
        assert_eq!(quote_db2_value(" padded"), "{ padded}");
    }

    #[test]
    fn test_oracle_descriptor_keeps_credentials_separate() {
        let mut oracle = spec(BackendKind::Oracle);
        oracle.port = 1521;
        oracle.database = "ORCLPDB1".to_string();

        let descriptor = OracleBackend.descriptor(&oracle, "tiger");
        assert_eq!(
            descriptor.target.as_str(),
            "(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST=db.example.com)(PORT=1521))(CONNECT_DATA=(SERVICE_NAME=ORCLPDB1)))"
        );
        assert!(!descriptor.target.contains("tiger"));

        let creds = descriptor.credentials.as_ref().unwrap();
        assert_eq!(creds.username(), "db2inst1");
        assert_eq!(creds.password(), "tiger");
    }

    #[test]
    fn test_postgres_conninfo() {
        let mut pg = spec(BackendKind::Postgres);
        pg.port = 5432;
        let descriptor = PostgresBackend.descriptor(&pg, "secret");
        assert_eq!(
            descriptor.target.as_str(),
            "host=db.example.com port=5432 dbname=SAMPLE user=db2inst1 password=secret"
        );
    }

    #[test]
    fn test_postgres_conninfo_quotes_awkward_values() {
        let pg = spec(BackendKind::Postgres);
        let descriptor = PostgresBackend.descriptor(&pg, "it's a \\secret");
        assert!(
            descriptor
                .target
                .ends_with(r"password='it\'s a \\secret'")
        );
    }

    #[test]
    fn test_quote_conninfo_value() {
        assert_eq!(quote_conninfo_value("plain"), "plain");
        assert_eq!(quote_conninfo_value(""), "''");
        assert_eq!(quote_conninfo_value("two words"), "'two words'");
    }

    #[test]
    fn test_descriptor_debug_is_redacted() {
        let descriptor = Db2Backend.descriptor(&spec(BackendKind::Db2), "topsecret");
        assert!(!format!("{:?}", descriptor).contains("topsecret"));

        let descriptor = OracleBackend.descriptor(&spec(BackendKind::Oracle), "topsecret");
        assert!(!format!("{:?}", descriptor).contains("topsecret"));
    }
}
