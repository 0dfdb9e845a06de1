//! `crypto.cipher` module: AES-128-CTR keyed by `derived_key[0..16]`.
//!
//! Ciphertext length always equals the secret length. The IV may be 8 to 16
//! bytes; shorter IVs fill the leading bytes of the 128-bit counter block
//! and the remainder starts at zero.

use std::fmt;
use std::str::FromStr;

use aes::Aes128;
use cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use zeroize::{Zeroize, Zeroizing};

use super::error::{KeystoreError, KeystoreResult};
use crate::random::{random_bytes, SecureRandom};
use crate::secure::{IntoSecret, SecretBytes};

/// IV length used for newly generated keystores
pub const IV_LENGTH: usize = 16;

/// Shortest IV accepted for CTR mode
pub const MIN_IV_LENGTH: usize = 8;

/// Longest IV accepted for CTR mode (one AES block)
pub const MAX_IV_LENGTH: usize = 16;

/// AES-128 key length
pub const AES_KEY_LENGTH: usize = 16;

type Aes128Ctr = Ctr128BE<Aes128>;

/// Cipher function identifier as it appears in `crypto.cipher.function`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherFunction {
    Aes128Ctr,
}

impl CipherFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes128Ctr => "aes-128-ctr",
        }
    }
}

impl FromStr for CipherFunction {
    type Err = KeystoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aes-128-ctr" => Ok(Self::Aes128Ctr),
            other => Err(KeystoreError::UnsupportedCipher(other.to_string())),
        }
    }
}

impl fmt::Display for CipherFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cipher parameters for AES-128-CTR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherParam {
    /// Initialization vector
    pub iv: Vec<u8>,
}

impl CipherParam {
    /// Validate the parameters
    pub fn validate(&self) -> KeystoreResult<()> {
        validate_iv(&self.iv)
    }
}

/// Cipher module for EIP-2335 keystore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cipher {
    /// Cipher function
    pub function: CipherFunction,
    /// Cipher parameters
    pub params: CipherParam,
    /// Encrypted secret key
    pub message: Vec<u8>,
}

impl Cipher {
    /// Module holding `ciphertext` encrypted under `iv`
    pub fn new(iv: Vec<u8>, ciphertext: Vec<u8>) -> Self {
        Self {
            function: CipherFunction::Aes128Ctr,
            params: CipherParam { iv },
            message: ciphertext,
        }
    }

    pub fn iv(&self) -> &[u8] {
        &self.params.iv
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.message
    }

    pub fn validate(&self) -> KeystoreResult<()> {
        self.params.validate()
    }

    /// Recover the secret; no integrity check happens here
    pub fn decrypt(&self, decryption_key: &[u8]) -> KeystoreResult<SecretBytes> {
        decrypt_secret(&self.message, decryption_key, &self.params.iv)
    }
}

/// Encrypt `secret` under the first 16 bytes of `encryption_key`.
pub fn encrypt_secret(secret: &[u8], encryption_key: &[u8], iv: &[u8]) -> KeystoreResult<Vec<u8>> {
    let mut ciphertext = secret.to_vec();
    if let Err(e) = apply_keystream(&mut ciphertext, encryption_key, iv) {
        // buffer still holds the plaintext
        ciphertext.zeroize();
        return Err(e);
    }
    Ok(ciphertext)
}

/// Inverse of [`encrypt_secret`]. The plaintext is handed back already wrapped.
pub fn decrypt_secret(
    ciphertext: &[u8],
    decryption_key: &[u8],
    iv: &[u8],
) -> KeystoreResult<SecretBytes> {
    let mut plaintext = ciphertext.to_vec();
    if let Err(e) = apply_keystream(&mut plaintext, decryption_key, iv) {
        plaintext.zeroize();
        return Err(e);
    }
    Ok(plaintext.into_secret())
}

fn apply_keystream(buf: &mut [u8], key: &[u8], iv: &[u8]) -> KeystoreResult<()> {
    if key.len() < AES_KEY_LENGTH {
        return Err(KeystoreError::InvalidCipherParams(format!(
            "key must be at least {} bytes, got {}",
            AES_KEY_LENGTH,
            key.len()
        )));
    }
    validate_iv(iv)?;

    let mut key_arr = Zeroizing::new([0u8; AES_KEY_LENGTH]);
    key_arr.copy_from_slice(&key[..AES_KEY_LENGTH]);

    let mut counter_block = [0u8; MAX_IV_LENGTH];
    counter_block[..iv.len()].copy_from_slice(iv);

    let mut cipher = Aes128Ctr::new(&(*key_arr).into(), &counter_block.into());
    cipher.apply_keystream(buf);
    Ok(())
}

fn validate_iv(iv: &[u8]) -> KeystoreResult<()> {
    if !(MIN_IV_LENGTH..=MAX_IV_LENGTH).contains(&iv.len()) {
        return Err(KeystoreError::InvalidCipherParams(format!(
            "IV must be between {} and {} bytes, got {}",
            MIN_IV_LENGTH,
            MAX_IV_LENGTH,
            iv.len()
        )));
    }
    Ok(())
}

/// Generate a random IV
pub fn generate_iv(rng: &dyn SecureRandom) -> Vec<u8> {
    random_bytes(rng, IV_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::OsRandom;
    use secrecy::ExposeSecret;

    #[test]
    fn test_bls_sized_secret_roundtrip() {
        let secret: Vec<u8> = (1u8..=32).collect();
        let key = [0x5A; 32];
        let iv = [0xC3; 16];

        let ciphertext = encrypt_secret(&secret, &key, &iv).unwrap();
        assert_eq!(ciphertext.len(), 32);
        assert_ne!(ciphertext, secret);

        let decrypted = decrypt_secret(&ciphertext, &key, &iv).unwrap();
        assert_eq!(decrypted.expose_secret(), &secret);
    }

    #[test]
    fn test_nist_sp800_38a_ctr_vector() {
        // NIST SP 800-38A F.5.1 CTR-AES128.Encrypt, first block
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let iv = hex::decode("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff").unwrap();
        let plaintext = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();

        let ciphertext = encrypt_secret(&plaintext, &key, &iv).unwrap();
        assert_eq!(hex::encode(ciphertext), "874d6191b620e3261bef6864990db6ce");
    }

    #[test]
    fn test_length_preserved_across_block_boundaries() {
        let key = [0x0F; 32];
        let iv = [0xF0; 12];
        for len in [0, 1, 15, 16, 17, 48, 100] {
            let secret = vec![0x42; len];

            let ciphertext = encrypt_secret(&secret, &key, &iv).unwrap();
            assert_eq!(ciphertext.len(), len);

            let decrypted = decrypt_secret(&ciphertext, &key, &iv).unwrap();
            assert_eq!(decrypted.expose_secret(), &secret);
        }
    }

    #[test]
    fn test_short_iv_is_zero_extended() {
        let secret = [0x42u8; 40];
        let key = vec![0xAA; 32];
        let short_iv = vec![0x11; 8];
        let mut padded_iv = vec![0x11; 8];
        padded_iv.extend_from_slice(&[0u8; 8]);

        let a = encrypt_secret(&secret, &key, &short_iv).unwrap();
        let b = encrypt_secret(&secret, &key, &padded_iv).unwrap();
        assert_eq!(a, b);

        let decrypted = decrypt_secret(&a, &key, &short_iv).unwrap();
        assert_eq!(decrypted.expose_secret(), &secret.to_vec());
    }

    #[test]
    fn test_only_first_16_key_bytes_used() {
        let secret = b"same-plaintext";
        let iv = vec![0x01; 16];
        let mut key_a = vec![0xAA; 32];
        let mut key_b = vec![0xAA; 32];
        key_a[16..].copy_from_slice(&[0x00; 16]);
        key_b[16..].copy_from_slice(&[0xFF; 16]);

        assert_eq!(
            encrypt_secret(secret, &key_a, &iv).unwrap(),
            encrypt_secret(secret, &key_b, &iv).unwrap()
        );
    }

    #[test]
    fn test_iv_changes_keystream() {
        let key = [0xAA; 32];
        let mut iv = [0x11; 16];
        let first = encrypt_secret(&[0u8; 16], &key, &iv).unwrap();
        iv[15] ^= 0x01;
        assert_ne!(first, encrypt_secret(&[0u8; 16], &key, &iv).unwrap());
    }

    #[test]
    fn test_invalid_key_length() {
        let result = encrypt_secret(b"test", &[0xAA; 8], &[0xBB; 16]);
        assert!(matches!(result, Err(KeystoreError::InvalidCipherParams(_))));
    }

    #[test]
    fn test_iv_length_bounds() {
        for len in [8, 12, 16] {
            assert!(CipherParam { iv: vec![0; len] }.validate().is_ok());
        }
        for len in [0, 7, 17, 32] {
            assert!(
                CipherParam { iv: vec![0; len] }.validate().is_err(),
                "IV of {} bytes should be rejected",
                len
            );
        }
        assert!(encrypt_secret(b"test", &[0xAA; 32], &[0xBB; 7]).is_err());
    }

    #[test]
    fn test_cipher_module() {
        let iv = vec![0xCC; 16];
        let ciphertext = vec![0xDD; 32];

        let module = Cipher::new(iv.clone(), ciphertext.clone());

        assert_eq!(module.function, CipherFunction::Aes128Ctr);
        assert_eq!(module.function.to_string(), "aes-128-ctr");
        assert_eq!(module.iv(), iv.as_slice());
        assert_eq!(module.ciphertext(), ciphertext.as_slice());
    }

    #[test]
    fn test_cipher_module_decrypt() {
        let key = vec![0x33; 32];
        let iv = vec![0x44; 16];
        let ciphertext = encrypt_secret(b"secret", &key, &iv).unwrap();

        let module = Cipher::new(iv, ciphertext);
        assert_eq!(module.decrypt(&key).unwrap().expose_secret(), b"secret");
    }

    #[test]
    fn test_unsupported_cipher_tag() {
        match "aes-256-gcm".parse::<CipherFunction>() {
            Err(KeystoreError::UnsupportedCipher(tag)) => assert_eq!(tag, "aes-256-gcm"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_generate_iv() {
        let ivs: Vec<_> = (0..4).map(|_| generate_iv(&OsRandom)).collect();
        assert!(ivs.iter().all(|iv| iv.len() == IV_LENGTH));
        assert_ne!(ivs[0], ivs[1]);
        assert!(CipherParam { iv: ivs[3].clone() }.validate().is_ok());
    }
}
