//! Bulk conversion of EIP-2335 v4 keystores to a different KDF
//!
//! The converter reads a directory of keystores together with their password
//! files, decrypts each keystore and writes it back out encrypted under the
//! requested PBKDF2 or scrypt parameters. Public keys, derivation paths and
//! UUIDs are kept.

pub mod config;
pub mod error;
pub mod layout;
pub mod pipeline;

pub use config::{
    default_jobs, ConfigError, ConvertConfig, LayoutMode, TargetKdf, TargetKdfFunction,
    DEFAULT_PBKDF2_C, DEFAULT_SCRYPT_N, DEFAULT_SCRYPT_P, DEFAULT_SCRYPT_R, EXIT_CONFIG_ERROR,
    V4CONVERT_DEST_ENV, V4CONVERT_PASSWORD_SRC_ENV, V4CONVERT_SRC_ENV,
};
pub use error::ConvertError;
pub use layout::{layout_for, Discovery, FlatLayout, KeystoreLayout, NestedLayout, PasswordSource};
pub use pipeline::{ConversionPipeline, ConversionReport, KeyStoreRecord};
