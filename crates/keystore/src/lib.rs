//! EIP-2335 version 4 keystores
//!
//! This crate provides:
//! - Password normalization (NFKD with control codes removed)
//! - PBKDF2 and scrypt key derivation
//! - AES-128-CTR encryption with SHA-256 checksums
//! - A strict JSON codec for keystore documents
//! - Secret wrappers that zero memory on drop

pub mod keystore;
pub mod random;
pub mod secure;

// Keystore exports
pub use keystore::{
    normalize_password, ErrorKind, KdfFunction, KdfParam, KeystoreBuilder, KeystoreDocument,
    KeystoreError, KeystoreResult,
};

// Randomness exports
pub use random::{OsRandom, SecureRandom};

// Secure memory exports
pub use secure::{ExposeSecret, IntoSecret, SecretBytes, SecretString};
