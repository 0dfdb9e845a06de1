//! Conversion run configuration
//!
//! A run is described by the source, password and destination locations,
//! the directory layout they follow and the KDF the keystores are converted
//! to. Everything here is checked before any keystore is touched.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::ValueEnum;
use thiserror::Error;
use v4convert_keystore::keystore::{scrypt_memory, KdfFunction, KdfParam, MAX_SCRYPT_MEMORY};
use v4convert_keystore::SecureRandom;

/// Environment variable for the source keystore directory.
///
/// # Example
///
/// ```bash
/// V4CONVERT_SRC=/var/lib/web3signer/keys v4convert --password-src ... --dest ...
/// ```
pub const V4CONVERT_SRC_ENV: &str = "V4CONVERT_SRC";

/// Environment variable for the password directory (or single password file).
pub const V4CONVERT_PASSWORD_SRC_ENV: &str = "V4CONVERT_PASSWORD_SRC";

/// Environment variable for the destination directory.
pub const V4CONVERT_DEST_ENV: &str = "V4CONVERT_DEST";

/// Exit code for invalid parameters or an unusable destination.
pub const EXIT_CONFIG_ERROR: i32 = 1;

/// Default PBKDF2 iteration count for converted keystores
pub const DEFAULT_PBKDF2_C: u32 = 1;

/// Default scrypt cost parameters for converted keystores
pub const DEFAULT_SCRYPT_N: u32 = 2;
pub const DEFAULT_SCRYPT_P: u32 = 1;
pub const DEFAULT_SCRYPT_R: u32 = 8;

/// On-disk pairing of keystores with their password files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LayoutMode {
    /// `<pk>.json` keystores with `<pk>.txt` password files
    #[default]
    Web3signer,
    /// `<pk>/keystore.json` keystores with `<pk>` password files
    Nimbus,
}

/// KDF function selector as given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TargetKdfFunction {
    #[default]
    Pbkdf2,
    Scrypt,
}

/// Errors in the run configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("-c must be a positive integer, got {0}")]
    InvalidIterationCount(u32),

    #[error("-n must be greater than 1 and a power of 2, got {0}")]
    InvalidCostFactor(u32),

    #[error("-p must be a positive integer, got {0}")]
    InvalidParallelization(u32),

    #[error("-r must be a positive integer, got {0}")]
    InvalidBlockSize(u32),

    #[error(
        "-n {n} -r {r} -p {p} needs more than {max} bytes of scrypt memory",
        max = MAX_SCRYPT_MEMORY
    )]
    ScryptMemoryExceeded { n: u32, r: u32, p: u32 },

    #[error("--jobs must be a positive integer")]
    InvalidJobs,

    #[error("source directory not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("password source not found: {0}")]
    PasswordSourceNotFound(PathBuf),
}

/// KDF the keystores are re-encrypted under, with its cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKdf {
    Pbkdf2 { c: u32 },
    Scrypt { n: u32, p: u32, r: u32 },
}

impl TargetKdf {
    /// Pick the parameters relevant to `function`, ignoring the others
    pub fn from_options(function: TargetKdfFunction, c: u32, n: u32, p: u32, r: u32) -> Self {
        match function {
            TargetKdfFunction::Pbkdf2 => Self::Pbkdf2 { c },
            TargetKdfFunction::Scrypt => Self::Scrypt { n, p, r },
        }
    }

    pub fn function(&self) -> KdfFunction {
        match self {
            Self::Pbkdf2 { .. } => KdfFunction::Pbkdf2,
            Self::Scrypt { .. } => KdfFunction::Scrypt,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Pbkdf2 { c } => {
                if c < 1 {
                    return Err(ConfigError::InvalidIterationCount(c));
                }
            }
            Self::Scrypt { n, p, r } => {
                if n <= 1 || !n.is_power_of_two() {
                    return Err(ConfigError::InvalidCostFactor(n));
                }
                if p < 1 {
                    return Err(ConfigError::InvalidParallelization(p));
                }
                if r < 1 {
                    return Err(ConfigError::InvalidBlockSize(r));
                }
                if !scrypt_memory(n, r, p).is_some_and(|bytes| bytes <= MAX_SCRYPT_MEMORY) {
                    return Err(ConfigError::ScryptMemoryExceeded { n, r, p });
                }
            }
        }
        Ok(())
    }

    /// Fresh KDF parameters with a new random salt
    pub fn build_param(&self, rng: &dyn SecureRandom) -> KdfParam {
        match *self {
            Self::Pbkdf2 { c } => KdfParam::pbkdf2(c, rng),
            Self::Scrypt { n, p, r } => KdfParam::scrypt(n, p, r, rng),
        }
    }
}

impl Default for TargetKdf {
    fn default() -> Self {
        Self::Pbkdf2 {
            c: DEFAULT_PBKDF2_C,
        }
    }
}

/// Complete description of one conversion run
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Directory holding the source keystores
    pub source: PathBuf,
    /// Password directory, or a single file holding the password for every keystore
    pub password_source: PathBuf,
    /// Directory the converted keystores are written to
    pub destination: PathBuf,
    pub mode: LayoutMode,
    pub target: TargetKdf,
    /// Maximum number of keystores processed at once
    pub jobs: usize,
}

impl ConvertConfig {
    pub fn new(source: PathBuf, password_source: PathBuf, destination: PathBuf) -> Self {
        Self {
            source,
            password_source,
            destination,
            mode: LayoutMode::default(),
            target: TargetKdf::default(),
            jobs: default_jobs(),
        }
    }

    pub fn with_mode(mut self, mode: LayoutMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_target(mut self, target: TargetKdf) -> Self {
        self.target = target;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Check parameters and input locations
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target.validate()?;

        if self.jobs == 0 {
            return Err(ConfigError::InvalidJobs);
        }
        if !self.source.is_dir() {
            return Err(ConfigError::SourceNotFound(self.source.clone()));
        }
        if !self.password_source.exists() {
            return Err(ConfigError::PasswordSourceNotFound(
                self.password_source.clone(),
            ));
        }

        Ok(())
    }
}

/// Worker count matching the available CPUs
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> ConvertConfig {
        ConvertConfig::new(
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
            dir.path().join("out"),
        )
    }

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        assert_eq!(config.mode, LayoutMode::Web3signer);
        assert_eq!(config.target, TargetKdf::Pbkdf2 { c: 1 });
        assert!(config.jobs >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_options_picks_relevant_params() {
        assert_eq!(
            TargetKdf::from_options(TargetKdfFunction::Pbkdf2, 10, 3, 0, 0),
            TargetKdf::Pbkdf2 { c: 10 }
        );
        assert_eq!(
            TargetKdf::from_options(TargetKdfFunction::Scrypt, 0, 16, 1, 8),
            TargetKdf::Scrypt { n: 16, p: 1, r: 8 }
        );
    }

    #[test]
    fn test_pbkdf2_validation() {
        assert!(TargetKdf::Pbkdf2 { c: 1 }.validate().is_ok());
        assert!(matches!(
            TargetKdf::Pbkdf2 { c: 0 }.validate(),
            Err(ConfigError::InvalidIterationCount(0))
        ));
    }

    #[test]
    fn test_scrypt_validation() {
        assert!(TargetKdf::Scrypt { n: 2, p: 1, r: 8 }.validate().is_ok());
        assert!(TargetKdf::Scrypt { n: 16, p: 1, r: 8 }.validate().is_ok());

        for n in [0, 1, 3, 24] {
            assert!(matches!(
                TargetKdf::Scrypt { n, p: 1, r: 8 }.validate(),
                Err(ConfigError::InvalidCostFactor(_))
            ));
        }
        assert!(matches!(
            TargetKdf::Scrypt { n: 2, p: 0, r: 8 }.validate(),
            Err(ConfigError::InvalidParallelization(0))
        ));
        assert!(matches!(
            TargetKdf::Scrypt { n: 2, p: 1, r: 0 }.validate(),
            Err(ConfigError::InvalidBlockSize(0))
        ));
    }

    #[test]
    fn test_scrypt_memory_budget() {
        assert!(TargetKdf::Scrypt { n: 1 << 18, p: 1, r: 8 }.validate().is_ok());
        assert!(matches!(
            TargetKdf::Scrypt { n: 1 << 30, p: 1, r: 8 }.validate(),
            Err(ConfigError::ScryptMemoryExceeded { n: 1073741824, r: 8, p: 1 })
        ));
        assert!(matches!(
            TargetKdf::Scrypt { n: 2, p: u32::MAX, r: 8 }.validate(),
            Err(ConfigError::ScryptMemoryExceeded { .. })
        ));
    }

    #[test]
    fn test_build_param_uses_fresh_salt() {
        let rng = v4convert_keystore::OsRandom;
        let target = TargetKdf::Scrypt { n: 16, p: 1, r: 8 };

        let a = target.build_param(&rng);
        let b = target.build_param(&rng);

        assert_eq!(a.function(), KdfFunction::Scrypt);
        assert_eq!(a.dklen(), 32);
        assert_eq!(a.salt().len(), 32);
        assert_ne!(a.salt(), b.salt());
    }

    #[test]
    fn test_missing_locations_rejected() {
        let dir = TempDir::new().unwrap();

        let config = ConvertConfig::new(
            dir.path().join("missing"),
            dir.path().to_path_buf(),
            dir.path().join("out"),
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SourceNotFound(_))
        ));

        let config = ConvertConfig::new(
            dir.path().to_path_buf(),
            dir.path().join("missing"),
            dir.path().join("out"),
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PasswordSourceNotFound(_))
        ));
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir).with_jobs(0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidJobs)));
    }

    #[test]
    fn test_invalid_target_checked_first() {
        let dir = TempDir::new().unwrap();
        let config = ConvertConfig::new(
            dir.path().join("missing"),
            dir.path().join("missing"),
            dir.path().join("out"),
        )
        .with_target(TargetKdf::Scrypt { n: 3, p: 1, r: 8 });

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCostFactor(3))
        ));
    }
}
