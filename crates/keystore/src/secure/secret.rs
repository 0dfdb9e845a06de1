//! Owned secret containers used across the keystore codec
//!
//! Password text read from disk and every byte buffer derived from it
//! (normalized password, decryption key, recovered signing key) moves
//! straight into one of these wrappers.

use secrecy::{SecretBox, SecretString as SecrecySecretString};

/// Heap bytes wiped when dropped.
///
/// Holds normalized passwords, derived keys and decrypted keystore secrets.
///
/// ```rust
/// use v4convert_keystore::{ExposeSecret, IntoSecret};
///
/// let key = vec![0x5a; 32].into_secret();
/// assert_eq!(key.expose_secret().len(), 32);
/// ```
pub type SecretBytes = SecretBox<Vec<u8>>;

/// Password text as read from a password file.
pub type SecretString = SecrecySecretString;

/// Moves an owned buffer into its secret container without copying it.
pub trait IntoSecret {
    type Secret;

    fn into_secret(self) -> Self::Secret;
}

impl IntoSecret for String {
    type Secret = SecretString;

    fn into_secret(self) -> SecretString {
        SecretString::from(self)
    }
}

impl IntoSecret for Vec<u8> {
    type Secret = SecretBytes;

    fn into_secret(self) -> SecretBytes {
        SecretBox::new(Box::new(self))
    }
}
