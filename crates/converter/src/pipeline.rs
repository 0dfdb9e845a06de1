//! Bulk keystore conversion
//!
//! A run has two phases. Every discovered keystore is first loaded and
//! decrypted with its password; the keystores that decrypted are then
//! re-encrypted under the target KDF with a fresh salt and IV and written
//! to the destination.
//!
//! Items run on blocking worker threads, at most `jobs` at a time. A failing
//! item is logged and recorded in the [`ConversionReport`]; it never stops
//! the others. Only an unusable destination or an unreadable source
//! directory aborts the run.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use secrecy::ExposeSecret;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};
use v4convert_keystore::keystore::generate_iv;
use v4convert_keystore::{IntoSecret, KeystoreDocument, SecretBytes, SecretString, SecureRandom};

use crate::config::{ConvertConfig, TargetKdf};
use crate::error::ConvertError;
use crate::layout::{layout_for, KeystoreLayout, PasswordSource};

/// A decrypted keystore waiting to be re-encrypted
pub struct KeyStoreRecord {
    /// Keystore file the record was read from
    pub source: PathBuf,
    /// Parsed source document
    pub document: KeystoreDocument,
    secret: SecretBytes,
    password: SecretString,
}

impl KeyStoreRecord {
    pub fn secret(&self) -> &SecretBytes {
        &self.secret
    }
}

impl fmt::Debug for KeyStoreRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStoreRecord")
            .field("source", &self.source)
            .field("pubkey", &self.document.pubkey_hex())
            .field("secret", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Outcome of a conversion run
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Written keystore files
    pub converted: Vec<PathBuf>,
    /// Source keystores that could not be converted
    pub failed: Vec<(PathBuf, ConvertError)>,
    /// Source entries that are not keystores under the selected layout
    pub skipped: Vec<PathBuf>,
}

impl ConversionReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Converts every keystore of a source directory to the target KDF
#[derive(Clone)]
pub struct ConversionPipeline {
    layout: Arc<dyn KeystoreLayout>,
    passwords: PasswordSource,
    source: PathBuf,
    destination: PathBuf,
    target: TargetKdf,
    jobs: usize,
    rng: Arc<dyn SecureRandom>,
}

impl ConversionPipeline {
    /// Build a pipeline for a validated configuration
    ///
    /// `rng` supplies every salt and IV of the run and is shared by all workers.
    pub fn new(config: &ConvertConfig, rng: Arc<dyn SecureRandom>) -> Self {
        Self {
            layout: layout_for(config.mode),
            passwords: PasswordSource::from_path(&config.password_source),
            source: config.source.clone(),
            destination: config.destination.clone(),
            target: config.target,
            jobs: config.jobs.max(1),
            rng,
        }
    }

    pub fn layout(&self) -> &dyn KeystoreLayout {
        self.layout.as_ref()
    }

    /// Run both phases over the source directory
    pub async fn run(&self) -> Result<ConversionReport, ConvertError> {
        let started = Instant::now();

        fs::create_dir_all(&self.destination).map_err(|source| ConvertError::CreateDir {
            path: self.destination.clone(),
            source,
        })?;

        info!(
            source = %self.source.display(),
            layout = self.layout.name(),
            "Reading keystore paths"
        );
        let discovery = self.layout.discover(&self.source)?;
        for path in &discovery.skipped {
            debug!(path = %path.display(), "Skipping entry that is not a keystore");
        }

        let mut report = ConversionReport {
            skipped: discovery.skipped,
            ..Default::default()
        };

        info!(count = discovery.keystores.len(), "Decrypting keystores");
        let items: Vec<(PathBuf, PathBuf)> = discovery
            .keystores
            .into_iter()
            .map(|path| (path.clone(), path))
            .collect();

        let mut records = Vec::new();
        for (path, result) in self.run_pool(items, Self::decrypt_item).await {
            match result {
                Ok(record) => records.push((path, record)),
                Err(e) => {
                    if e.is_decryption_failure() {
                        error!(
                            keystore = %path.display(),
                            kind = %e.kind(),
                            "Wrong password or corrupted keystore"
                        );
                    } else {
                        error!(keystore = %path.display(), kind = %e.kind(), "Error decrypting keystore: {}", e);
                    }
                    report.failed.push((path, e));
                }
            }
        }
        info!(
            decrypted = records.len(),
            failed = report.failed.len(),
            elapsed = ?started.elapsed(),
            "Decryption finished"
        );

        info!(
            count = records.len(),
            kdf = %self.target.function(),
            "Converting keystores"
        );
        for (path, result) in self.run_pool(records, Self::convert_record).await {
            match result {
                Ok(output) => report.converted.push(output),
                Err(e) => {
                    error!(keystore = %path.display(), kind = %e.kind(), "Error converting keystore: {}", e);
                    report.failed.push((path, e));
                }
            }
        }

        report.converted.sort();
        report.failed.sort_by(|a, b| a.0.cmp(&b.0));

        info!(
            converted = report.converted.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            elapsed = ?started.elapsed(),
            "Conversion finished"
        );

        Ok(report)
    }

    /// Load a keystore and recover its secret
    pub fn decrypt_item(&self, keystore: PathBuf) -> Result<KeyStoreRecord, ConvertError> {
        let password_path = self.passwords.resolve(self.layout.as_ref(), &keystore);
        let password = fs::read_to_string(&password_path)
            .map_err(|source| ConvertError::PasswordRead {
                path: password_path,
                source,
            })?
            .into_secret();

        let json = fs::read(&keystore).map_err(|source| ConvertError::KeystoreRead {
            path: keystore.clone(),
            source,
        })?;

        let keystore_error = |source| ConvertError::Keystore {
            path: keystore.clone(),
            source,
        };
        let document = KeystoreDocument::from_json(&json).map_err(keystore_error)?;
        let secret = document
            .decrypt(password.expose_secret())
            .map_err(keystore_error)?;

        debug!(
            keystore = %keystore.display(),
            kdf = %document.crypto.kdf.function(),
            "Decrypted keystore"
        );

        Ok(KeyStoreRecord {
            source: keystore,
            document,
            secret,
            password,
        })
    }

    /// Re-encrypt a decrypted keystore under the target KDF and write it out
    pub fn convert_record(&self, record: KeyStoreRecord) -> Result<PathBuf, ConvertError> {
        let kdf_param = self.target.build_param(self.rng.as_ref());
        let iv = generate_iv(self.rng.as_ref());

        let converted = record
            .document
            .reencrypt(
                record.secret.expose_secret(),
                record.password.expose_secret(),
                kdf_param,
                iv,
            )
            .map_err(|source| ConvertError::Keystore {
                path: record.source.clone(),
                source,
            })?;

        let output = self
            .layout
            .destination_path(&record.source, &converted, &self.destination);
        ensure_parent_dir(&output)?;

        converted
            .save(&output)
            .map_err(|source| ConvertError::KeystoreWrite {
                path: output.clone(),
                source,
            })?;

        debug!(
            keystore = %record.source.display(),
            output = %output.display(),
            "Converted keystore"
        );

        Ok(output)
    }

    /// Run `work` over `items` on blocking threads, at most `jobs` at once
    ///
    /// Each item is paired with the path it is reported under. Results come
    /// back in completion order.
    async fn run_pool<T, R, F>(
        &self,
        items: Vec<(PathBuf, T)>,
        work: F,
    ) -> Vec<(PathBuf, Result<R, ConvertError>)>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(&Self, T) -> Result<R, ConvertError> + Copy + Send + 'static,
    {
        let permits = Arc::new(Semaphore::new(self.jobs));
        let mut set = JoinSet::new();

        for (path, item) in items {
            let pipeline = self.clone();
            let permits = Arc::clone(&permits);

            set.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        let err = ConvertError::Worker {
                            path: path.clone(),
                            reason: e.to_string(),
                        };
                        return (path, Err(err));
                    }
                };

                let result = tokio::task::spawn_blocking(move || work(&pipeline, item))
                    .await
                    .unwrap_or_else(|e| {
                        Err(ConvertError::Worker {
                            path: path.clone(),
                            reason: e.to_string(),
                        })
                    });
                (path, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!("Conversion task join error: {}", e),
            }
        }
        results
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), ConvertError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConvertError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
