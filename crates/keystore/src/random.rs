//! Secure random byte source.
//!
//! Salt and IV generation draws from a [`SecureRandom`] handed in by the
//! caller, so concurrent workers can share one source without locking.

use rand::rngs::OsRng;
use rand::RngCore;

/// A cryptographically secure byte source that is safe to share between threads.
pub trait SecureRandom: Send + Sync {
    /// Fill `dest` with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Operating system CSPRNG.
///
/// Every draw goes to the OS, so there is no shared state between callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

/// Generate `len` random bytes from `rng`.
pub fn random_bytes(rng: &dyn SecureRandom, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rng.fill_bytes(&mut buf);
    buf
}
