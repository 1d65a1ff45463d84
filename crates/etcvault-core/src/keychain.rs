//! Flat-directory key store.
//!
//! Keys live at `<dir>/<name>.pem` (private half, which implies the public
//! half) and `<dir>/<name>.pub` (public half only). Lookups probe `.pem`
//! first, and the results are cached process-wide — but only when a private
//! half was found: a public-only result stays uncached so a `.pem` file
//! appearing later is picked up on the next lookup.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::KeychainError;
use crate::key::Key;

const PRIVATE_EXT: &str = "pem";
const PUBLIC_EXT: &str = "pub";

/// A directory of PEM key files with an in-memory cache.
#[derive(Debug)]
pub struct Keychain {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<Key>>>,
}

impl Keychain {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Keychain {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up a key by logical name.
    ///
    /// Probes the cache, then `<name>.pem`, then `<name>.pub`. A loaded key
    /// whose PEM carried no `Name` header takes the requested name.
    ///
    /// # Errors
    ///
    /// [`KeychainError::NotFound`] when neither file exists; load errors
    /// otherwise.
    pub fn find(&self, name: &str) -> Result<Arc<Key>, KeychainError> {
        if let Some(key) = self.read_cache().get(name) {
            return Ok(Arc::clone(key));
        }

        let private_path = self.key_path(name, PRIVATE_EXT);
        let public_path = self.key_path(name, PUBLIC_EXT);

        let path = if private_path.exists() {
            private_path
        } else if public_path.exists() {
            public_path
        } else {
            return Err(KeychainError::NotFound);
        };

        let mut key = Key::from_pem(&fs::read(&path)?)?;
        if key.name.is_empty() {
            key.name = name.to_owned();
        }
        debug!(name, path = %path.display(), private = key.private.is_some(), "loaded key");

        let key = Arc::new(key);
        if key.private.is_some() {
            self.write_cache().insert(name.to_owned(), Arc::clone(&key));
        }

        Ok(key)
    }

    /// Persist a key under its logical name, refusing to overwrite an
    /// existing entry of either polarity.
    ///
    /// Private keys are written to `<name>.pem` with mode 0600, public-only
    /// keys to `<name>.pub` with mode 0644.
    pub fn save(&self, key: &Key) -> Result<(), KeychainError> {
        match self.find(&key.name) {
            Ok(_) => {
                return Err(KeychainError::AlreadyExists {
                    name: key.name.clone(),
                })
            }
            Err(KeychainError::NotFound) => {}
            Err(err) => return Err(err),
        }

        if let Some(pem) = key.private_pem()? {
            write_new(
                &self.key_path(&key.name, PRIVATE_EXT),
                pem.as_bytes(),
                0o600,
            )?;
        } else {
            write_new(
                &self.key_path(&key.name, PUBLIC_EXT),
                key.public_pem()?.as_bytes(),
                0o644,
            )?;
        }

        Ok(())
    }

    /// All key names present in the directory, sorted.
    pub fn list(&self) -> Result<Vec<String>, KeychainError> {
        self.stems(|ext| ext == PRIVATE_EXT || ext == PUBLIC_EXT)
    }

    /// Names usable for encryption by local convention: only those whose
    /// private half is present (encryption itself needs just the public
    /// half, but suggesting a key we cannot decrypt would strand the data).
    pub fn list_for_encryption(&self) -> Result<Vec<String>, KeychainError> {
        self.stems(|ext| ext == PRIVATE_EXT)
    }

    fn stems(&self, wanted: impl Fn(&str) -> bool) -> Result<Vec<String>, KeychainError> {
        let mut names = BTreeSet::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|s| s.to_str()),
            ) else {
                continue;
            };
            if wanted(ext) {
                names.insert(stem.to_owned());
            }
        }

        Ok(names.into_iter().collect())
    }

    fn key_path(&self, name: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{name}.{ext}"))
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Key>>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Key>>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(unix)]
fn write_new(path: &Path, contents: &[u8], mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_new(path: &Path, contents: &[u8], _mode: u32) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(contents)
}
