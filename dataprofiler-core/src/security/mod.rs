//! Security utilities for credential protection.
//!
//! This module provides:
//! - A credential container with automatic memory zeroing
//! - Argon2id hashing and constant-time verification of stored passwords
//!
//! # Security Guarantees
//! - Passwords are held in `Zeroizing` containers while in memory
//! - Only salted one-way hashes are ever persisted
//! - Passwords are redacted from debug output, logs and error messages

mod credentials;
mod hashing;

pub use credentials::Credentials;
pub use hashing::{hash_password, spawn_hash_password, spawn_verify_password, verify_password};
