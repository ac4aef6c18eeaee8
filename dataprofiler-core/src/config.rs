//! Credential bootstrap settings read from the environment.
//!
//! Storing a credential needs six values. They are read together and every
//! missing one is reported in a single error, so a misconfigured
//! environment is fixed in one pass.

use crate::Result;
use crate::connector::{BackendKind, ConnectionSpec};
use crate::error::ProfilerError;
use zeroize::Zeroizing;

/// Environment keys read by [`CredentialSettings::from_env`], in report order.
pub const CREDENTIAL_KEYS: [&str; 6] = [
    "DB_TYPE",
    "DB_HOST",
    "DB_PORT",
    "DB_DATABASE",
    "DB_USERNAME",
    "DB_PASSWORD",
];

/// Connection parameters and plaintext password to be stored.
pub struct CredentialSettings {
    pub spec: ConnectionSpec,
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSettings")
            .field("spec", &self.spec)
            .field("password", &"****")
            .finish()
    }
}

impl CredentialSettings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    /// See [`from_lookup`](Self::from_lookup).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`.
    ///
    /// Values are trimmed; empty values count as missing. The password is
    /// taken verbatim.
    ///
    /// # Errors
    /// - `MissingConfiguration` listing every absent key
    /// - `UnsupportedBackend` for an unrecognised `DB_TYPE`
    /// - `Configuration` for a port that is not a number in 1..=65535
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = Vec::with_capacity(CREDENTIAL_KEYS.len());
        let mut missing = Vec::new();

        for key in CREDENTIAL_KEYS {
            let value = lookup(key).map(Zeroizing::new);
            let present = value.as_ref().is_some_and(|v| !v.trim().is_empty());
            if !present {
                missing.push(key.to_string());
            }
            values.push(value.unwrap_or_default());
        }

        if !missing.is_empty() {
            return Err(ProfilerError::MissingConfiguration { keys: missing });
        }

        let [kind, host, port, database, username, password]: [Zeroizing<String>; 6] = values
            .try_into()
            .map_err(|_| ProfilerError::configuration("credential settings are incomplete"))?;

        let kind: BackendKind = kind.trim().parse()?;
        let port = port
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| {
                ProfilerError::configuration(format!(
                    "DB_PORT must be a number between 1 and 65535, got '{}'",
                    port.trim()
                ))
            })?;

        let spec = ConnectionSpec::new(
            kind,
            host.trim(),
            port,
            database.trim(),
            username.trim(),
        );
        spec.validate()?;

        Ok(Self { spec, password })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn complete() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DB_TYPE", "postgres"),
            ("DB_HOST", "localhost"),
            ("DB_PORT", "5432"),
            ("DB_DATABASE", "sales"),
            ("DB_USERNAME", "analyst"),
            ("DB_PASSWORD", "secret"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<CredentialSettings> {
        CredentialSettings::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_complete_settings() {
        let settings = load(&complete()).unwrap();
        assert_eq!(
            settings.spec,
            ConnectionSpec::new(BackendKind::Postgres, "localhost", 5432, "sales", "analyst")
        );
        assert_eq!(settings.password.as_str(), "secret");
        assert!(!format!("{:?}", settings).contains("secret"));
    }

    #[test]
    fn test_every_missing_key_is_reported() {
        let mut vars = complete();
        vars.remove("DB_HOST");
        vars.insert("DB_PASSWORD", "  ");

        match load(&vars) {
            Err(ProfilerError::MissingConfiguration { keys }) => {
                assert_eq!(keys, vec!["DB_HOST".to_string(), "DB_PASSWORD".to_string()]);
            }
            other => panic!("expected missing configuration, got {other:?}"),
        }
    }

    #[test]
    fn test_nothing_set_lists_all_keys() {
        let err = CredentialSettings::from_lookup(|_| None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required configuration: DB_TYPE, DB_HOST, DB_PORT, DB_DATABASE, DB_USERNAME, DB_PASSWORD"
        );
    }

    #[test]
    fn test_bad_port_is_configuration_error() {
        for port in ["abc", "0", "70000"] {
            let mut vars = complete();
            vars.insert("DB_PORT", port);
            assert!(
                matches!(load(&vars), Err(ProfilerError::Configuration { .. })),
                "port {port} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_backend_kind() {
        let mut vars = complete();
        vars.insert("DB_TYPE", "mysql");
        assert!(matches!(
            load(&vars),
            Err(ProfilerError::UnsupportedBackend { .. })
        ));
    }

    #[test]
    fn test_from_env() {
        let vars: Vec<(&str, Option<&str>)> = complete()
            .into_iter()
            .map(|(k, v)| (k, Some(v)))
            .collect();

        temp_env::with_vars(vars, || {
            let settings = CredentialSettings::from_env().unwrap();
            assert_eq!(settings.spec.kind, BackendKind::Postgres);
            assert_eq!(settings.spec.port, 5432);
        });
    }

    #[test]
    fn test_from_env_with_missing_password() {
        let mut vars: Vec<(&str, Option<&str>)> = complete()
            .into_iter()
            .filter(|(k, _)| *k != "DB_PASSWORD")
            .map(|(k, v)| (k, Some(v)))
            .collect();
        vars.push(("DB_PASSWORD", None));

        temp_env::with_vars(vars, || {
            let err = CredentialSettings::from_env().unwrap_err();
            assert!(matches!(
                err,
                ProfilerError::MissingConfiguration { ref keys } if keys == &["DB_PASSWORD"]
            ));
        });
    }
}
