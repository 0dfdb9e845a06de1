//! `crypto.checksum` module: SHA-256 over the upper half of the derived key
//! followed by the ciphertext.
//!
//! A mismatch means either the password was wrong or the ciphertext was
//! altered; the two cases cannot be told apart.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use super::error::{KeystoreError, KeystoreResult};

/// Byte range of the derived key that feeds the checksum
const CHECKSUM_KEY_RANGE: std::ops::Range<usize> = 16..32;

/// Checksum function identifier as it appears in `crypto.checksum.function`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumFunction {
    Sha256,
}

impl ChecksumFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl FromStr for ChecksumFunction {
    type Err = KeystoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            other => Err(KeystoreError::UnsupportedChecksum(other.to_string())),
        }
    }
}

impl fmt::Display for ChecksumFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checksum module for EIP-2335 keystore
///
/// Its `params` object is always empty and therefore not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    /// Checksum function
    pub function: ChecksumFunction,
    /// Digest bytes
    pub message: Vec<u8>,
}

impl Checksum {
    /// Wrap a digest produced by [`compute_checksum`]
    pub fn new(digest: Vec<u8>) -> Self {
        Self {
            function: ChecksumFunction::Sha256,
            message: digest,
        }
    }

    /// Verify the stored digest against the provided derived key and ciphertext
    pub fn verify(&self, derived_key: &[u8], ciphertext: &[u8]) -> KeystoreResult<bool> {
        let computed = compute_checksum(derived_key, ciphertext)?;
        Ok(constant_time_eq(&self.message, &computed))
    }
}

/// SHA-256 of `derived_key[16..32] || ciphertext`.
///
/// Fails with `InvalidKdfParams` when fewer than 32 key bytes are supplied.
pub fn compute_checksum(derived_key: &[u8], ciphertext: &[u8]) -> KeystoreResult<Vec<u8>> {
    if derived_key.len() < CHECKSUM_KEY_RANGE.end {
        return Err(KeystoreError::InvalidKdfParams(format!(
            "derived key must be at least {} bytes, got {}",
            CHECKSUM_KEY_RANGE.end,
            derived_key.len()
        )));
    }

    let mut hasher = Sha256::new();
    hasher.update(&derived_key[CHECKSUM_KEY_RANGE]);
    hasher.update(ciphertext);

    Ok(hasher.finalize().to_vec())
}

/// Like [`Checksum::verify`] but reports a mismatch as `ChecksumMismatch`.
pub fn verify_checksum(
    derived_key: &[u8],
    ciphertext: &[u8],
    expected: &[u8],
) -> KeystoreResult<()> {
    let computed = compute_checksum(derived_key, ciphertext)?;

    if constant_time_eq(&computed, expected) {
        Ok(())
    } else {
        Err(KeystoreError::ChecksumMismatch)
    }
}

/// Full-length comparison that does not exit early on the first differing byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
