//! Durable persistence for claims and key material.

pub mod atomic;
mod fs;
mod keys;

use std::path::{Path, PathBuf};

use keyward_core::types::EntityKind;
use keyward_sign::KeyPair;

pub use self::fs::FsStore;
pub use self::keys::FsKeyStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no operator defined - add an operator first")]
    NoOperator,
    #[error("{kind} {name:?} is not in the store")]
    Missing { kind: EntityKind, name: String },
    #[error("invalid {kind} name {name:?}")]
    InvalidName { kind: EntityKind, name: String },
    #[error("store is locked by another process (lock: {})", .0.display())]
    Locked(PathBuf),
    #[error("corrupt key file {}: {reason}", .path.display())]
    CorruptKey { path: PathBuf, reason: String },
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Addresses one entity in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRef<'a> {
    Operator(&'a str),
    Account(&'a str),
    User { account: &'a str, name: &'a str },
}

impl EntryRef<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntryRef::Operator(_) => EntityKind::Operator,
            EntryRef::Account(_) => EntityKind::Account,
            EntryRef::User { .. } => EntityKind::User,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EntryRef::Operator(name) | EntryRef::Account(name) => name,
            EntryRef::User { name, .. } => name,
        }
    }
}

/// Signed claims, one per entity.
pub trait EntityStore {
    fn operator_name(&self) -> Result<Option<String>, StoreError>;

    /// Account names, sorted. Empty when no operator exists yet.
    fn list_accounts(&self) -> Result<Vec<String>, StoreError>;

    fn list_users(&self, account: &str) -> Result<Vec<String>, StoreError>;

    fn has(&self, entry: EntryRef<'_>) -> Result<bool, StoreError>;

    fn read_token(&self, entry: EntryRef<'_>) -> Result<String, StoreError>;

    /// Persist a token, returning the file it was written to.
    fn write_token(&self, entry: EntryRef<'_>, token: &str) -> Result<PathBuf, StoreError>;
}

/// Seeds, addressed by public key.
pub trait KeyStore {
    fn store(&self, key: &KeyPair) -> Result<PathBuf, StoreError>;

    fn find(&self, public_key: &str) -> Result<Option<KeyPair>, StoreError>;

    /// Public keys with a stored seed for one role, sorted.
    fn list(&self, kind: EntityKind) -> Result<Vec<String>, StoreError>;
}
