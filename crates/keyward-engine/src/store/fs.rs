use std::path::{Path, PathBuf};

use keyward_core::types::EntityKind;

use super::atomic::{atomic_write, StoreLock};
use super::{EntityStore, EntryRef, StoreError};

const TOKEN_EXT: &str = "jwt";

/// Directory-per-entity claim store.
///
/// ```text
/// <root>/<operator>/<operator>.jwt
/// <root>/<operator>/accounts/<account>/<account>.jwt
/// <root>/<operator>/accounts/<account>/users/<user>.jwt
/// ```
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn operator_dir(&self) -> Result<PathBuf, StoreError> {
        let name = self.operator_name()?.ok_or(StoreError::NoOperator)?;
        Ok(self.root.join(name))
    }

    fn token_path(&self, entry: EntryRef<'_>) -> Result<PathBuf, StoreError> {
        check_name(entry.kind(), entry.name())?;
        let file = format!("{}.{TOKEN_EXT}", entry.name());
        Ok(match entry {
            EntryRef::Operator(name) => self.root.join(name).join(file),
            EntryRef::Account(name) => self.operator_dir()?.join("accounts").join(name).join(file),
            EntryRef::User { account, .. } => {
                check_name(EntityKind::Account, account)?;
                self.operator_dir()?
                    .join("accounts")
                    .join(account)
                    .join("users")
                    .join(file)
            }
        })
    }
}

impl EntityStore for FsStore {
    fn operator_name(&self) -> Result<Option<String>, StoreError> {
        let mut names = sub_dirs(&self.root)?
            .into_iter()
            .filter(|name| self.root.join(name).join(format!("{name}.{TOKEN_EXT}")).is_file());
        Ok(names.next())
    }

    fn list_accounts(&self) -> Result<Vec<String>, StoreError> {
        let Some(op) = self.operator_name()? else {
            return Ok(Vec::new());
        };
        let dir = self.root.join(op).join("accounts");
        Ok(sub_dirs(&dir)?
            .into_iter()
            .filter(|name| dir.join(name).join(format!("{name}.{TOKEN_EXT}")).is_file())
            .collect())
    }

    fn list_users(&self, account: &str) -> Result<Vec<String>, StoreError> {
        check_name(EntityKind::Account, account)?;
        let dir = self.operator_dir()?.join("accounts").join(account).join("users");
        token_stems(&dir)
    }

    fn has(&self, entry: EntryRef<'_>) -> Result<bool, StoreError> {
        match self.token_path(entry) {
            Ok(path) => Ok(path.is_file()),
            Err(StoreError::NoOperator) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn read_token(&self, entry: EntryRef<'_>) -> Result<String, StoreError> {
        let path = self.token_path(entry)?;
        if !path.is_file() {
            return Err(StoreError::Missing {
                kind: entry.kind(),
                name: entry.name().to_string(),
            });
        }
        std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))
    }

    fn write_token(&self, entry: EntryRef<'_>, token: &str) -> Result<PathBuf, StoreError> {
        let path = self.token_path(entry)?;
        let _lock = StoreLock::acquire(&self.root)?;
        atomic_write(&path, token.as_bytes(), None)?;
        tracing::debug!(
            kind = %entry.kind(),
            name = entry.name(),
            path = %path.display(),
            "stored claim"
        );
        Ok(path)
    }
}

/// Names become directory and file names, so they must be a single path component.
fn check_name(kind: EntityKind, name: &str) -> Result<(), StoreError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

fn sub_dirs(dir: &Path) -> Result<Vec<String>, StoreError> {
    let mut names = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(StoreError::io(dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn token_stems(dir: &Path) -> Result<Vec<String>, StoreError> {
    let mut names = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(StoreError::io(dir, e)),
    };
    for entry in entries {
        let path = entry.map_err(|e| StoreError::io(dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == TOKEN_EXT) {
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().join("store"));
        (dir, store)
    }

    #[test]
    fn empty_store_has_no_operator_or_accounts() {
        let (_dir, store) = store();
        assert_eq!(store.operator_name().unwrap(), None);
        assert!(store.list_accounts().unwrap().is_empty());
        assert!(!store.has(EntryRef::Account("A")).unwrap());
        assert!(matches!(
            store.write_token(EntryRef::Account("A"), "t"),
            Err(StoreError::NoOperator)
        ));
    }

    #[test]
    fn hierarchy_layout() {
        let (_dir, store) = store();
        let op = store.write_token(EntryRef::Operator("O"), "op-token").unwrap();
        assert!(op.ends_with("O/O.jwt"));
        store.write_token(EntryRef::Account("B"), "b").unwrap();
        store.write_token(EntryRef::Account("A"), "a").unwrap();
        let user = store
            .write_token(EntryRef::User { account: "A", name: "u" }, "u-token")
            .unwrap();
        assert!(user.ends_with("O/accounts/A/users/u.jwt"));

        assert_eq!(store.operator_name().unwrap().as_deref(), Some("O"));
        assert_eq!(store.list_accounts().unwrap(), vec!["A", "B"]);
        assert_eq!(store.list_users("A").unwrap(), vec!["u"]);
        assert!(store.list_users("B").unwrap().is_empty());
        assert_eq!(
            store
                .read_token(EntryRef::User { account: "A", name: "u" })
                .unwrap(),
            "u-token"
        );
        assert!(!store.root().join(".lock").exists());
    }

    #[test]
    fn missing_token() {
        let (_dir, store) = store();
        store.write_token(EntryRef::Operator("O"), "t").unwrap();
        assert!(matches!(
            store.read_token(EntryRef::Account("nope")),
            Err(StoreError::Missing {
                kind: EntityKind::Account,
                ..
            })
        ));
    }

    #[test]
    fn names_must_be_single_components() {
        let (_dir, store) = store();
        for bad in ["", "..", "a/b", ".hidden"] {
            assert!(matches!(
                store.write_token(EntryRef::Operator(bad), "t"),
                Err(StoreError::InvalidName { .. })
            ));
        }
    }
}
