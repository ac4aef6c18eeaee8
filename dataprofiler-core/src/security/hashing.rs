//! Argon2id password hashing for stored database credentials.
//!
//! Stored credentials keep only a PHC-format hash string
//! (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`), which embeds the
//! algorithm, parameters and salt next to the digest. Verification re-derives
//! the digest with those embedded values and compares in constant time.
//!
//! # Cryptographic Standards
//! - Argon2id: RFC 9106
//! - Salt: 128 bits from the operating system RNG

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::Result;
use crate::error::ProfilerError;
use zeroize::Zeroizing;

/// Argon2id memory cost: 64 MiB (65536 KiB)
///
/// **Rationale:** OWASP guidance recommends 19 MiB minimum for interactive
/// logins; 64 MiB raises the cost of GPU/ASIC guessing considerably.
const ARGON2_MEMORY_COST: u32 = 65536;

/// Argon2id time cost: 3 iterations
///
/// **Standard:** RFC 9106 §4
const ARGON2_TIME_COST: u32 = 3;

/// Argon2id parallelism: 4 lanes
const ARGON2_PARALLELISM: u32 = 4;

fn hasher() -> Result<Argon2<'static>> {
    let params = Params::new(
        ARGON2_MEMORY_COST,
        ARGON2_TIME_COST,
        ARGON2_PARALLELISM,
        None,
    )
    .map_err(|e| ProfilerError::hashing(format!("invalid Argon2 parameters: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh random salt.
///
/// # Returns
/// A self-describing PHC string containing salt, parameters and digest.
///
/// # Errors
/// Returns a hashing error if Argon2 rejects the input.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ProfilerError::hashing(e.to_string()))?;

    Ok(hash.to_string())
}

/// Checks a password against a stored PHC hash string.
///
/// A malformed stored hash never verifies; it is reported in the log
/// without echoing either input.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Hashes on the blocking thread pool so async workers stay responsive.
///
/// # Errors
/// Returns a hashing error if Argon2 fails or the worker thread panics.
pub async fn spawn_hash_password(password: &str) -> Result<String> {
    let password = Zeroizing::new(password.to_string());
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ProfilerError::hashing(format!("hashing task failed: {}", e)))?
}

/// Verifies on the blocking thread pool; a failed worker never verifies.
pub async fn spawn_verify_password(password: &str, stored_hash: &str) -> bool {
    let password = Zeroizing::new(password.to_string());
    let stored_hash = stored_hash.to_string();
    match tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash)).await {
        Ok(verified) => verified,
        Err(e) => {
            tracing::warn!("Password verification task failed: {}", e);
            false
        }
    }
}
