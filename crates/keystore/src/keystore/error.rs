//! Keystore error types

use std::fmt;

use thiserror::Error;

/// Errors that can occur during keystore operations
#[derive(Error, Debug)]
pub enum KeystoreError {
    /// Checksum did not match: wrong password or corrupted ciphertext
    #[error("decryption failed: checksum mismatch")]
    ChecksumMismatch,

    /// Unsupported KDF function
    #[error("unsupported KDF function: {0}")]
    UnsupportedKdf(String),

    /// Unsupported PBKDF2 pseudo-random function
    #[error("unsupported pseudo-random function: {0}")]
    UnsupportedPrf(String),

    /// Unsupported cipher function
    #[error("unsupported cipher function: {0}")]
    UnsupportedCipher(String),

    /// Unsupported checksum function
    #[error("unsupported checksum function: {0}")]
    UnsupportedChecksum(String),

    /// Keystore schema version other than 4
    #[error("unsupported keystore version: {0}")]
    UnsupportedVersion(u32),

    /// Invalid KDF parameters
    #[error("invalid KDF parameters: {0}")]
    InvalidKdfParams(String),

    /// Invalid cipher parameters
    #[error("invalid cipher parameters: {0}")]
    InvalidCipherParams(String),

    /// Key derivation failed
    #[error("key derivation failed: {0}")]
    KdfError(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed JSON or a document that does not match the keystore schema
    #[error("invalid keystore: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid hex encoding
    #[error("invalid hex encoding: {0}")]
    HexError(String),
}

impl KeystoreError {
    /// Classify the error for reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ChecksumMismatch => ErrorKind::Decryption,
            Self::IoError(_) => ErrorKind::Io,
            Self::JsonError(e) if e.is_io() => ErrorKind::Io,
            _ => ErrorKind::Validation,
        }
    }
}

/// Coarse error category shared by everything that reports keystore failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed document, unsupported function tag or out-of-range parameter
    Validation,
    /// Wrong password or tampered ciphertext
    Decryption,
    /// Missing, unreadable or unwritable file
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Decryption => "decryption",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

/// Result type for keystore operations
pub type KeystoreResult<T> = Result<T, KeystoreError>;
