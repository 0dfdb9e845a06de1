//! Per-keystore conversion errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use v4convert_keystore::{ErrorKind, KeystoreError};

/// Failure while converting a single keystore, or while preparing the run
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to read password file {path}: {source}")]
    PasswordRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read keystore {path}: {source}")]
    KeystoreRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write keystore {path}: {source}")]
    KeystoreWrite {
        path: PathBuf,
        #[source]
        source: KeystoreError,
    },

    #[error("{path}: {source}")]
    Keystore {
        path: PathBuf,
        #[source]
        source: KeystoreError,
    },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list source directory {path}: {source}")]
    ListSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("worker for {path} did not complete: {reason}")]
    Worker { path: PathBuf, reason: String },
}

impl ConvertError {
    /// Coarse classification used in logs and reports
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Keystore { source, .. } | Self::KeystoreWrite { source, .. } => source.kind(),
            _ => ErrorKind::Io,
        }
    }

    pub fn is_decryption_failure(&self) -> bool {
        self.kind() == ErrorKind::Decryption
    }
}
