use std::path::{Path, PathBuf};

use keyward_core::types::EntityKind;
use keyward_sign::keys::parse_public_key;
use keyward_sign::KeyPair;

use super::atomic::atomic_write;
use super::{KeyStore, StoreError};

const SEED_EXT: &str = "nk";

/// Seed files at `<root>/<kind>/<public key>.nk`, mode 0600.
#[derive(Debug, Clone)]
pub struct FsKeyStore {
    root: PathBuf,
}

impl FsKeyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, kind: EntityKind, public_key: &str) -> PathBuf {
        self.root
            .join(kind.as_str())
            .join(format!("{public_key}.{SEED_EXT}"))
    }
}

impl KeyStore for FsKeyStore {
    fn store(&self, key: &KeyPair) -> Result<PathBuf, StoreError> {
        let path = self.path_for(key.kind(), &key.public_key());
        atomic_write(&path, key.seed().as_bytes(), Some(0o600))?;
        tracing::info!(kind = %key.kind(), path = %path.display(), "stored seed");
        Ok(path)
    }

    fn find(&self, public_key: &str) -> Result<Option<KeyPair>, StoreError> {
        // an unparsable public key simply has no seed here
        let Ok((kind, _)) = parse_public_key(public_key) else {
            return Ok(None);
        };
        let path = self.path_for(kind, public_key.trim());
        if !path.is_file() {
            return Ok(None);
        }
        let seed = std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        let key = KeyPair::from_seed(&seed).map_err(|e| StoreError::CorruptKey {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        if key.public_key() != public_key.trim() {
            return Err(StoreError::CorruptKey {
                path,
                reason: "seed does not match its public key".into(),
            });
        }
        Ok(Some(key))
    }

    fn list(&self, kind: EntityKind) -> Result<Vec<String>, StoreError> {
        let dir = self.root.join(kind.as_str());
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == SEED_EXT) {
                if let Some(stem) = path.file_stem() {
                    keys.push(stem.to_string_lossy().to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
