//! Directory layouts pairing keystores with password files
//!
//! - [`FlatLayout`] (web3signer): `<pk>.json` keystores, `<pk>.txt` passwords
//! - [`NestedLayout`] (nimbus): `<pk>/keystore.json` keystores, `<pk>` passwords
//!
//! The layout is picked once per run; the pipeline only asks it where
//! things live.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use v4convert_keystore::KeystoreDocument;

use crate::config::LayoutMode;
use crate::error::ConvertError;

/// Keystore file name inside a nimbus validator directory
pub const NESTED_KEYSTORE_FILE: &str = "keystore.json";

/// Extension of web3signer password files
pub const PASSWORD_FILE_EXTENSION: &str = "txt";

/// Result of scanning a source directory
#[derive(Debug, Default)]
pub struct Discovery {
    /// Keystore files to convert, sorted by path
    pub keystores: Vec<PathBuf>,
    /// Entries that do not follow the layout's naming pattern
    pub skipped: Vec<PathBuf>,
}

/// Resolution of keystore, password and output locations for one layout
pub trait KeystoreLayout: Send + Sync + fmt::Debug {
    /// Layout name for logs
    fn name(&self) -> &'static str;

    /// List the keystores under `source`
    fn discover(&self, source: &Path) -> Result<Discovery, ConvertError>;

    /// Password file for `keystore` inside `password_dir`
    fn password_path(&self, keystore: &Path, password_dir: &Path) -> PathBuf;

    /// Output file for the converted form of `keystore`
    fn destination_path(
        &self,
        keystore: &Path,
        document: &KeystoreDocument,
        destination: &Path,
    ) -> PathBuf;
}

/// Web3signer layout: `<pk>.json` next to `<pk>.txt`
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatLayout;

impl KeystoreLayout for FlatLayout {
    fn name(&self) -> &'static str {
        "web3signer"
    }

    fn discover(&self, source: &Path) -> Result<Discovery, ConvertError> {
        let mut discovery = Discovery::default();

        for path in list_dir(source)? {
            let is_keystore = path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(is_flat_keystore_name);

            if is_keystore {
                discovery.keystores.push(path);
            } else {
                discovery.skipped.push(path);
            }
        }

        Ok(discovery)
    }

    fn password_path(&self, keystore: &Path, password_dir: &Path) -> PathBuf {
        let stem = keystore.file_stem().unwrap_or_default();
        password_dir
            .join(stem)
            .with_extension(PASSWORD_FILE_EXTENSION)
    }

    fn destination_path(
        &self,
        keystore: &Path,
        _document: &KeystoreDocument,
        destination: &Path,
    ) -> PathBuf {
        destination.join(keystore.file_name().unwrap_or_default())
    }
}

/// Nimbus layout: `<pk>/keystore.json` with a password file named `<pk>`
#[derive(Debug, Default, Clone, Copy)]
pub struct NestedLayout;

impl KeystoreLayout for NestedLayout {
    fn name(&self) -> &'static str {
        "nimbus"
    }

    fn discover(&self, source: &Path) -> Result<Discovery, ConvertError> {
        let mut discovery = Discovery::default();

        for path in list_dir(source)? {
            let keystore = path.join(NESTED_KEYSTORE_FILE);
            let is_validator_dir = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(is_pubkey_name);

            if is_validator_dir && path.is_dir() && keystore.is_file() {
                discovery.keystores.push(keystore);
            } else {
                discovery.skipped.push(path);
            }
        }

        Ok(discovery)
    }

    fn password_path(&self, keystore: &Path, password_dir: &Path) -> PathBuf {
        let validator_dir = keystore
            .parent()
            .and_then(Path::file_name)
            .unwrap_or_default();
        password_dir.join(validator_dir)
    }

    fn destination_path(
        &self,
        _keystore: &Path,
        document: &KeystoreDocument,
        destination: &Path,
    ) -> PathBuf {
        destination
            .join(format!("0x{}", document.pubkey_hex()))
            .join(NESTED_KEYSTORE_FILE)
    }
}

/// Layout implementation for `mode`
pub fn layout_for(mode: LayoutMode) -> Arc<dyn KeystoreLayout> {
    match mode {
        LayoutMode::Web3signer => Arc::new(FlatLayout),
        LayoutMode::Nimbus => Arc::new(NestedLayout),
    }
}

/// Where keystore passwords come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordSource {
    /// One file whose contents unlock every keystore
    Shared(PathBuf),
    /// A directory of per-keystore password files named by the layout
    Directory(PathBuf),
}

impl PasswordSource {
    /// A regular file is shared by all keystores, anything else is a directory
    pub fn from_path(path: &Path) -> Self {
        if path.is_file() {
            Self::Shared(path.to_path_buf())
        } else {
            Self::Directory(path.to_path_buf())
        }
    }

    /// Password file for `keystore`
    pub fn resolve(&self, layout: &dyn KeystoreLayout, keystore: &Path) -> PathBuf {
        match self {
            Self::Shared(file) => file.clone(),
            Self::Directory(dir) => layout.password_path(keystore, dir),
        }
    }
}

/// `<hex>.json` with an optional `0x` prefix on the stem
fn is_flat_keystore_name(name: &str) -> bool {
    name.strip_suffix(".json").is_some_and(is_pubkey_name)
}

/// Non-empty hex digits, optionally `0x` prefixed
fn is_pubkey_name(name: &str) -> bool {
    let hex = name.strip_prefix("0x").unwrap_or(name);
    !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let list_error = |source| ConvertError::ListSource {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = fs::read_dir(dir)
        .map_err(list_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(list_error)?;
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use v4convert_keystore::keystore::KdfParam;
    use v4convert_keystore::{KeystoreBuilder, OsRandom};

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"{}").unwrap();
    }

    fn document_with_pubkey(pubkey: &[u8]) -> KeystoreDocument {
        KeystoreBuilder::new()
            .secret(&[1; 32])
            .password("pw")
            .pubkey(pubkey)
            .kdf(KdfParam::pbkdf2(1, &OsRandom))
            .build()
            .unwrap()
    }

    #[test]
    fn test_flat_keystore_names() {
        assert!(is_flat_keystore_name("abc123.json"));
        assert!(is_flat_keystore_name("0xABCdef.json"));
        assert!(!is_flat_keystore_name("deposit_data-123.json"));
        assert!(!is_flat_keystore_name(".json"));
        assert!(!is_flat_keystore_name("0x.json"));
        assert!(!is_flat_keystore_name("abc123.txt"));
        assert!(!is_flat_keystore_name("abc123.json.bak"));
    }

    #[test]
    fn test_flat_discovery() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("bb.json"));
        touch(&dir.path().join("aa.json"));
        touch(&dir.path().join("deposit_data-123.json"));
        touch(&dir.path().join("notes.txt"));
        fs::create_dir(dir.path().join("cc.json")).unwrap();

        let discovery = FlatLayout.discover(dir.path()).unwrap();

        assert_eq!(
            discovery.keystores,
            vec![dir.path().join("aa.json"), dir.path().join("bb.json")]
        );
        assert_eq!(discovery.skipped.len(), 3);
    }

    #[test]
    fn test_nested_discovery() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("0xaa").join(NESTED_KEYSTORE_FILE));
        touch(&dir.path().join("cc").join(NESTED_KEYSTORE_FILE));
        touch(&dir.path().join("0xbb").join("other.json"));
        touch(&dir.path().join("backup").join(NESTED_KEYSTORE_FILE));
        touch(&dir.path().join("0x").join(NESTED_KEYSTORE_FILE));
        touch(&dir.path().join("stray.json"));

        let discovery = NestedLayout.discover(dir.path()).unwrap();

        assert_eq!(
            discovery.keystores,
            vec![
                dir.path().join("0xaa").join(NESTED_KEYSTORE_FILE),
                dir.path().join("cc").join(NESTED_KEYSTORE_FILE),
            ]
        );
        assert_eq!(
            discovery.skipped,
            vec![
                dir.path().join("0x"),
                dir.path().join("0xbb"),
                dir.path().join("backup"),
                dir.path().join("stray.json"),
            ]
        );
    }

    #[test]
    fn test_pubkey_names() {
        assert!(is_pubkey_name("0xa99a76ed"));
        assert!(is_pubkey_name("A99A76ED"));
        assert!(!is_pubkey_name("0x"));
        assert!(!is_pubkey_name("backup"));
        assert!(!is_pubkey_name("0xaa.bak"));
    }

    #[test]
    fn test_discover_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = FlatLayout.discover(&dir.path().join("missing"));
        assert!(matches!(result, Err(ConvertError::ListSource { .. })));
    }

    #[test]
    fn test_flat_paths() {
        let keystore = Path::new("/src/abc123.json");
        assert_eq!(
            FlatLayout.password_path(keystore, Path::new("/pw")),
            PathBuf::from("/pw/abc123.txt")
        );

        let document = document_with_pubkey(&[0xab; 4]);
        assert_eq!(
            FlatLayout.destination_path(keystore, &document, Path::new("/out")),
            PathBuf::from("/out/abc123.json")
        );
    }

    #[test]
    fn test_nested_paths() {
        let keystore = Path::new("/src/0xabab/keystore.json");
        assert_eq!(
            NestedLayout.password_path(keystore, Path::new("/pw")),
            PathBuf::from("/pw/0xabab")
        );

        let document = document_with_pubkey(&[0xab; 2]);
        assert_eq!(
            NestedLayout.destination_path(keystore, &document, Path::new("/out")),
            PathBuf::from("/out/0xabab/keystore.json")
        );
    }

    #[test]
    fn test_password_source() {
        let dir = TempDir::new().unwrap();
        let shared = dir.path().join("password.txt");
        touch(&shared);

        let source = PasswordSource::from_path(&shared);
        assert_eq!(source, PasswordSource::Shared(shared.clone()));
        assert_eq!(
            source.resolve(&FlatLayout, Path::new("/src/abc.json")),
            shared
        );

        let source = PasswordSource::from_path(dir.path());
        assert_eq!(
            source.resolve(&FlatLayout, Path::new("/src/abc.json")),
            dir.path().join("abc.txt")
        );
    }

    #[test]
    fn test_layout_for_mode() {
        assert_eq!(layout_for(LayoutMode::Web3signer).name(), "web3signer");
        assert_eq!(layout_for(LayoutMode::Nimbus).name(), "nimbus");
    }
}
