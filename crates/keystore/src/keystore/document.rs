//! EIP-2335 keystore document
//!
//! This module provides the top-level keystore struct that combines KDF,
//! cipher and checksum modules, plus the encrypt/decrypt flows over them.

use std::fs;
use std::path::Path;

use secrecy::ExposeSecret;
use uuid::Uuid;

use super::checksum::{compute_checksum, Checksum};
use super::cipher::{encrypt_secret, generate_iv, Cipher, CipherParam};
use super::codec;
use super::error::{KeystoreError, KeystoreResult};
use super::kdf::{Kdf, KdfParam, SCRYPT_N, SCRYPT_P, SCRYPT_R};
use super::password::normalize_password;
use crate::random::OsRandom;
use crate::secure::SecretBytes;

/// Version number for EIP-2335 keystores
pub const KEYSTORE_VERSION: u32 = 4;

/// Combined crypto parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crypto {
    /// Key derivation function parameters
    pub kdf: Kdf,
    /// Checksum for integrity verification
    pub checksum: Checksum,
    /// Cipher parameters and encrypted data
    pub cipher: Cipher,
}

impl Crypto {
    /// Encrypt `secret` under `password` with the given KDF parameters and IV
    pub fn encrypt(
        secret: &[u8],
        password: &str,
        kdf_param: KdfParam,
        iv: Vec<u8>,
    ) -> KeystoreResult<Self> {
        let params = CipherParam { iv };
        params.validate()?;

        let password = normalize_password(password);
        let derived_key = kdf_param.derive_key(password.expose_secret())?;
        let dk_bytes = derived_key.expose_secret();

        // AES key is dk[0..16], checksum key is dk[16..32]
        let ciphertext = encrypt_secret(secret, dk_bytes, &params.iv)?;
        let checksum = compute_checksum(dk_bytes, &ciphertext)?;

        Ok(Self {
            kdf: Kdf::new(kdf_param),
            checksum: Checksum::new(checksum),
            cipher: Cipher::new(params.iv, ciphertext),
        })
    }

    /// Recover the secret, verifying the checksum before decrypting
    pub fn decrypt(&self, password: &str) -> KeystoreResult<SecretBytes> {
        let password = normalize_password(password);
        let derived_key = self.kdf.param.derive_key(password.expose_secret())?;
        let dk_bytes = derived_key.expose_secret();

        if !self.checksum.verify(dk_bytes, self.cipher.ciphertext())? {
            return Err(KeystoreError::ChecksumMismatch);
        }

        self.cipher.decrypt(dk_bytes)
    }

    pub fn validate(&self) -> KeystoreResult<()> {
        self.kdf.validate()?;
        self.cipher.validate()
    }
}

/// EIP-2335 keystore document
///
/// Documents coming out of [`KeystoreDocument::from_json`] or
/// [`KeystoreBuilder::build`] have already been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystoreDocument {
    /// Crypto parameters (KDF + checksum + cipher)
    pub crypto: Crypto,
    /// Optional description
    pub description: Option<String>,
    /// Compressed public key bytes
    pub pubkey: Vec<u8>,
    /// Derivation path, may be empty
    pub path: String,
    /// Unique identifier
    pub uuid: String,
    /// Schema version
    pub version: u32,
}

impl KeystoreDocument {
    /// Create a new keystore by encrypting a secret with the given KDF parameters
    pub fn encrypt(
        secret: &[u8],
        password: &str,
        pubkey: &[u8],
        path: &str,
        kdf_param: KdfParam,
        iv: Vec<u8>,
    ) -> KeystoreResult<Self> {
        KeystoreBuilder::new()
            .secret(secret)
            .password(password)
            .pubkey(pubkey)
            .path(path)
            .kdf(kdf_param)
            .iv(iv)
            .build()
    }

    /// Decrypt the keystore and return the secret
    pub fn decrypt(&self, password: &str) -> KeystoreResult<SecretBytes> {
        self.crypto.decrypt(password)
    }

    /// Encrypt `secret` under new KDF parameters and IV, keeping every
    /// non-crypto field of this document.
    pub fn reencrypt(
        &self,
        secret: &[u8],
        password: &str,
        kdf_param: KdfParam,
        iv: Vec<u8>,
    ) -> KeystoreResult<Self> {
        let document = Self {
            crypto: Crypto::encrypt(secret, password, kdf_param, iv)?,
            description: self.description.clone(),
            pubkey: self.pubkey.clone(),
            path: self.path.clone(),
            uuid: self.uuid.clone(),
            version: self.version,
        };
        document.validate()?;
        Ok(document)
    }

    pub fn validate(&self) -> KeystoreResult<()> {
        if self.version != KEYSTORE_VERSION {
            return Err(KeystoreError::UnsupportedVersion(self.version));
        }
        self.crypto.validate()
    }

    /// Parse and validate a JSON keystore
    pub fn from_json(json: &[u8]) -> KeystoreResult<Self> {
        codec::parse(json)
    }

    /// Pretty-printed JSON form
    pub fn to_json(&self) -> KeystoreResult<String> {
        codec::serialize(self)
    }

    /// Save keystore to a file
    ///
    /// The file is written with restricted permissions (0600) on Unix.
    /// The parent directory must already exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> KeystoreResult<()> {
        let path = path.as_ref();
        let json = self.to_json()?;

        fs::write(path, &json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, permissions)?;
        }

        Ok(())
    }

    /// Load and validate a keystore from a file
    pub fn load<P: AsRef<Path>>(path: P) -> KeystoreResult<Self> {
        let contents = fs::read(path)?;
        Self::from_json(&contents)
    }

    pub fn pubkey_hex(&self) -> String {
        hex::encode(&self.pubkey)
    }
}

/// Builder for creating KeystoreDocument instances
#[derive(Default)]
pub struct KeystoreBuilder {
    secret: Option<SecretBytes>,
    password: Option<String>,
    pubkey: Vec<u8>,
    path: String,
    description: Option<String>,
    uuid: Option<String>,
    kdf: Option<KdfParam>,
    iv: Option<Vec<u8>>,
}

impl KeystoreBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the secret to encrypt
    pub fn secret(mut self, secret: &[u8]) -> Self {
        self.secret = Some(SecretBytes::new(Box::new(secret.to_vec())));
        self
    }

    /// Set the password for key derivation
    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Set the public key bytes
    pub fn pubkey(mut self, pubkey: &[u8]) -> Self {
        self.pubkey = pubkey.to_vec();
        self
    }

    /// Set the derivation path
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Set an optional description
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Set a custom UUID (normally auto-generated)
    pub fn uuid(mut self, uuid: &str) -> Self {
        self.uuid = Some(uuid.to_string());
        self
    }

    /// Set the KDF parameters (defaults to EIP-2335 scrypt with a fresh salt)
    pub fn kdf(mut self, param: KdfParam) -> Self {
        self.kdf = Some(param);
        self
    }

    /// Set the cipher IV (defaults to 16 fresh random bytes)
    pub fn iv(mut self, iv: Vec<u8>) -> Self {
        self.iv = Some(iv);
        self
    }

    /// Build the keystore
    pub fn build(self) -> KeystoreResult<KeystoreDocument> {
        let secret = self
            .secret
            .ok_or_else(|| KeystoreError::InvalidCipherParams("secret is required".to_string()))?;
        let password = self
            .password
            .ok_or_else(|| KeystoreError::InvalidKdfParams("password is required".to_string()))?;

        let kdf_param = self
            .kdf
            .unwrap_or_else(|| KdfParam::scrypt(SCRYPT_N, SCRYPT_P, SCRYPT_R, &OsRandom));
        let iv = self.iv.unwrap_or_else(|| generate_iv(&OsRandom));

        let crypto = Crypto::encrypt(secret.expose_secret(), &password, kdf_param, iv)?;

        let document = KeystoreDocument {
            crypto,
            description: self.description,
            pubkey: self.pubkey,
            path: self.path,
            uuid: self.uuid.unwrap_or_else(|| Uuid::new_v4().to_string()),
            version: KEYSTORE_VERSION,
        };
        document.validate()?;
        Ok(document)
    }
}
