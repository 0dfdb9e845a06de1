//! EIP-2335 version 4 keystore codec
//!
//! A keystore holds one secret key encrypted under a password:
//!
//! - PBKDF2-HMAC-SHA256 or scrypt derives a key from the normalized password
//! - AES-128-CTR encrypts the secret under the first half of that key
//! - SHA-256 over the second half plus the ciphertext detects a wrong password
//!
//! # Example
//!
//! ```rust,no_run
//! use v4convert_keystore::keystore::{KdfParam, KeystoreBuilder, KeystoreDocument};
//! use v4convert_keystore::random::OsRandom;
//! use v4convert_keystore::ExposeSecret;
//!
//! # fn main() -> Result<(), v4convert_keystore::KeystoreError> {
//! let keystore = KeystoreBuilder::new()
//!     .secret(&[0x42; 32])
//!     .password("my-strong-password")
//!     .pubkey(&[0x11; 48])
//!     .kdf(KdfParam::pbkdf2(262144, &OsRandom))
//!     .build()?;
//!
//! keystore.save("./keys/validator.json")?;
//!
//! let loaded = KeystoreDocument::load("./keys/validator.json")?;
//! let secret = loaded.decrypt("my-strong-password")?;
//! assert_eq!(secret.expose_secret(), &[0x42; 32]);
//! # Ok(())
//! # }
//! ```

mod checksum;
mod cipher;
mod codec;
mod document;
mod error;
mod kdf;
mod password;

pub use checksum::{compute_checksum, verify_checksum, Checksum, ChecksumFunction};
pub use cipher::{
    decrypt_secret, encrypt_secret, generate_iv, Cipher, CipherFunction, CipherParam, IV_LENGTH,
};
pub use codec::{parse, serialize};
pub use document::{Crypto, KeystoreBuilder, KeystoreDocument, KEYSTORE_VERSION};
pub use error::{ErrorKind, KeystoreError, KeystoreResult};
pub use kdf::{
    check_scrypt_memory, generate_salt, pbkdf2_derive_key, scrypt_derive_key, scrypt_memory, Kdf,
    KdfFunction, KdfParam, Pbkdf2Param, Prf, ScryptParam, MAX_DKLEN, MAX_SCRYPT_MEMORY, PBKDF2_C,
    SCRYPT_N, SCRYPT_P, SCRYPT_R,
};
pub use password::normalize_password;
