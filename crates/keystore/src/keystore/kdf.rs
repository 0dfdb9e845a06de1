//! Key Derivation Function (KDF) implementation
//!
//! EIP-2335 keystores name their KDF in `crypto.kdf.function` and carry the
//! matching parameter set in `crypto.kdf.params`. Two functions are
//! supported: PBKDF2-HMAC-SHA256 and scrypt.

use std::fmt;
use std::str::FromStr;

use sha2::Sha256;

use super::error::{KeystoreError, KeystoreResult};
use crate::random::{random_bytes, SecureRandom};
use crate::secure::{IntoSecret, SecretBytes};

/// Standard scrypt parameters from EIP-2335
pub const SCRYPT_N: u32 = 262144; // 2^18
pub const SCRYPT_R: u32 = 8;
pub const SCRYPT_P: u32 = 1;

/// Standard PBKDF2 iteration count from EIP-2335
pub const PBKDF2_C: u32 = 262144;

/// Derived key length produced for new keystores
pub const DEFAULT_DKLEN: u32 = 32;

/// Smallest accepted derived key length: 16 bytes of AES key plus 16 bytes of checksum key
pub const MIN_DKLEN: u32 = 32;

/// Largest accepted derived key length
pub const MAX_DKLEN: u32 = 64;

/// Upper bound on the working memory a scrypt parameter set may ask for (2 GiB)
///
/// The EIP-2335 defaults need 256 MiB.
pub const MAX_SCRYPT_MEMORY: u64 = 2 << 30;

/// Salt length in bytes
pub const SALT_LENGTH: usize = 32;

/// KDF function identifier as it appears in `crypto.kdf.function`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KdfFunction {
    Pbkdf2,
    Scrypt,
}

impl KdfFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pbkdf2 => "pbkdf2",
            Self::Scrypt => "scrypt",
        }
    }
}

impl FromStr for KdfFunction {
    type Err = KeystoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pbkdf2" => Ok(Self::Pbkdf2),
            "scrypt" => Ok(Self::Scrypt),
            other => Err(KeystoreError::UnsupportedKdf(other.to_string())),
        }
    }
}

impl fmt::Display for KdfFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pseudo-random function used by PBKDF2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prf {
    HmacSha256,
}

impl Prf {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacSha256 => "hmac-sha256",
        }
    }
}

impl FromStr for Prf {
    type Err = KeystoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hmac-sha256" => Ok(Self::HmacSha256),
            other => Err(KeystoreError::UnsupportedPrf(other.to_string())),
        }
    }
}

/// PBKDF2 parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbkdf2Param {
    /// Derived key length in bytes
    pub dklen: u32,
    /// Iteration count
    pub c: u32,
    /// Pseudo-random function
    pub prf: Prf,
    /// Salt bytes
    pub salt: Vec<u8>,
}

/// scrypt parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScryptParam {
    /// Derived key length in bytes
    pub dklen: u32,
    /// CPU/memory cost parameter (power of 2, greater than 1)
    pub n: u32,
    /// Parallelization parameter
    pub p: u32,
    /// Block size parameter
    pub r: u32,
    /// Salt bytes
    pub salt: Vec<u8>,
}

/// KDF parameters, one variant per supported function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KdfParam {
    Pbkdf2(Pbkdf2Param),
    Scrypt(ScryptParam),
}

impl KdfParam {
    /// PBKDF2-HMAC-SHA256 parameters with a fresh salt
    pub fn pbkdf2(c: u32, rng: &dyn SecureRandom) -> Self {
        Self::Pbkdf2(Pbkdf2Param {
            dklen: DEFAULT_DKLEN,
            c,
            prf: Prf::HmacSha256,
            salt: generate_salt(rng),
        })
    }

    /// scrypt parameters with a fresh salt
    pub fn scrypt(n: u32, p: u32, r: u32, rng: &dyn SecureRandom) -> Self {
        Self::Scrypt(ScryptParam {
            dklen: DEFAULT_DKLEN,
            n,
            p,
            r,
            salt: generate_salt(rng),
        })
    }

    /// The function tag this parameter set belongs to
    pub fn function(&self) -> KdfFunction {
        match self {
            Self::Pbkdf2(_) => KdfFunction::Pbkdf2,
            Self::Scrypt(_) => KdfFunction::Scrypt,
        }
    }

    pub fn dklen(&self) -> u32 {
        match self {
            Self::Pbkdf2(p) => p.dklen,
            Self::Scrypt(p) => p.dklen,
        }
    }

    pub fn salt(&self) -> &[u8] {
        match self {
            Self::Pbkdf2(p) => &p.salt,
            Self::Scrypt(p) => &p.salt,
        }
    }

    /// Validate the parameters
    pub fn validate(&self) -> KeystoreResult<()> {
        if self.dklen() < MIN_DKLEN {
            return Err(KeystoreError::InvalidKdfParams(format!(
                "dklen must be at least {}, got {}",
                MIN_DKLEN,
                self.dklen()
            )));
        }
        if self.dklen() > MAX_DKLEN {
            return Err(KeystoreError::InvalidKdfParams(format!(
                "dklen must be at most {}, got {}",
                MAX_DKLEN,
                self.dklen()
            )));
        }
        if self.salt().is_empty() {
            return Err(KeystoreError::InvalidKdfParams(
                "salt must not be empty".to_string(),
            ));
        }

        match self {
            Self::Pbkdf2(param) => {
                if param.c < 1 {
                    return Err(KeystoreError::InvalidKdfParams(
                        "iteration count c must be >= 1".to_string(),
                    ));
                }
            }
            Self::Scrypt(param) => {
                if param.n <= 1 || !param.n.is_power_of_two() {
                    return Err(KeystoreError::InvalidKdfParams(format!(
                        "cost parameter n must be > 1 and a power of 2, got {}",
                        param.n
                    )));
                }
                if param.p < 1 {
                    return Err(KeystoreError::InvalidKdfParams(
                        "parallelization parameter p must be >= 1".to_string(),
                    ));
                }
                if param.r < 1 {
                    return Err(KeystoreError::InvalidKdfParams(
                        "block size parameter r must be >= 1".to_string(),
                    ));
                }
                check_scrypt_memory(param.n, param.r, param.p)?;
            }
        }

        Ok(())
    }

    /// Derive `dklen` bytes of key material from an already normalized password
    pub fn derive_key(&self, password: &[u8]) -> KeystoreResult<SecretBytes> {
        self.validate()?;
        match self {
            Self::Pbkdf2(param) => Ok(pbkdf2_derive_key(
                password,
                &param.salt,
                param.c,
                param.dklen as usize,
            )),
            Self::Scrypt(param) => scrypt_derive_key(
                password,
                &param.salt,
                param.n,
                param.r,
                param.p,
                param.dklen as usize,
            ),
        }
    }
}

/// KDF module for EIP-2335 keystore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kdf {
    /// KDF parameters; the function tag is implied by the variant
    pub param: KdfParam,
    /// Opaque message, empty for every known KDF but kept for round trips
    pub message: String,
}

impl Kdf {
    pub fn new(param: KdfParam) -> Self {
        Self {
            param,
            message: String::new(),
        }
    }

    pub fn function(&self) -> KdfFunction {
        self.param.function()
    }

    pub fn validate(&self) -> KeystoreResult<()> {
        self.param.validate()
    }
}

/// Derive a key using PBKDF2-HMAC-SHA256
pub fn pbkdf2_derive_key(password: &[u8], salt: &[u8], c: u32, dklen: usize) -> SecretBytes {
    let mut output = vec![0u8; dklen];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, c, &mut output);
    output.into_secret()
}

/// Derive a key using scrypt KDF
///
/// # Arguments
///
/// * `password` - Normalized password bytes
/// * `salt` - Random salt bytes
/// * `n` - CPU/memory cost parameter (must be power of 2)
/// * `r` - Block size parameter
/// * `p` - Parallelization parameter
/// * `dklen` - Desired key length in bytes
pub fn scrypt_derive_key(
    password: &[u8],
    salt: &[u8],
    n: u32,
    r: u32,
    p: u32,
    dklen: usize,
) -> KeystoreResult<SecretBytes> {
    if !n.is_power_of_two() {
        return Err(KeystoreError::InvalidKdfParams(format!(
            "cost parameter n must be a power of 2, got {}",
            n
        )));
    }
    check_scrypt_memory(n, r, p)?;
    let log_n = n.trailing_zeros() as u8;

    let params = scrypt::Params::new(log_n, r, p, dklen)
        .map_err(|e| KeystoreError::InvalidKdfParams(format!("scrypt: {}", e)))?;

    let mut output = vec![0u8; dklen];
    scrypt::scrypt(password, salt, &params, &mut output)
        .map_err(|e| KeystoreError::KdfError(e.to_string()))?;

    Ok(output.into_secret())
}

/// Bytes of working memory scrypt allocates for `n`, `r` and `p`
///
/// Covers the `n`-block lookup table, the `p` mixing blocks and the scratch
/// pair; `None` when the product does not fit in a `u64`.
pub fn scrypt_memory(n: u32, r: u32, p: u32) -> Option<u64> {
    let blocks = u64::from(n) + u64::from(p) + 2;
    128u64.checked_mul(u64::from(r))?.checked_mul(blocks)
}

/// Reject parameter sets whose working memory exceeds [`MAX_SCRYPT_MEMORY`]
pub fn check_scrypt_memory(n: u32, r: u32, p: u32) -> KeystoreResult<()> {
    match scrypt_memory(n, r, p) {
        Some(bytes) if bytes <= MAX_SCRYPT_MEMORY => Ok(()),
        _ => Err(KeystoreError::InvalidKdfParams(format!(
            "scrypt parameters n={}, r={}, p={} need more than {} bytes of memory",
            n, r, p, MAX_SCRYPT_MEMORY
        ))),
    }
}

/// Generate a random salt
pub fn generate_salt(rng: &dyn SecureRandom) -> Vec<u8> {
    random_bytes(rng, SALT_LENGTH)
}
