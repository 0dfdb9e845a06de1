//! Secure memory handling for key material
//!
//! Derived keys, decrypted secret keys and passwords are held in
//! `secrecy` containers that:
//! - zero their memory on drop via `zeroize`
//! - print `[REDACTED]` in debug output
//! - only hand out the inner value through `expose_secret()`

mod secret;

pub use secrecy::ExposeSecret;
pub use secret::{IntoSecret, SecretBytes, SecretString};
