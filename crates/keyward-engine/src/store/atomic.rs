use std::io::Write;
use std::path::{Path, PathBuf};

use super::StoreError;

/// Write content atomically: write to temp file, fsync, rename.
///
/// `mode` sets unix permissions on the temp file before any content is
/// written, so secrets never exist with a wider mode.
pub fn atomic_write(path: &Path, content: &[u8], mode: Option<u32>) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
    let temp_path = dir.join(format!(".{}.tmp", temp_suffix()));

    let mut file = open_new(&temp_path, mode).map_err(|e| StoreError::io(&temp_path, e))?;
    let written = file
        .write_all(content)
        .and_then(|()| file.sync_all());
    drop(file);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(StoreError::io(&temp_path, e));
    }

    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        StoreError::io(path, e)
    })
}

#[cfg(unix)]
fn open_new(path: &Path, mode: Option<u32>) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    let mut opts = std::fs::OpenOptions::new();
    opts.write(true).create_new(true);
    if let Some(mode) = mode {
        opts.mode(mode);
    }
    opts.open(path)
}

#[cfg(not(unix))]
fn open_new(path: &Path, _mode: Option<u32>) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
}

/// Advisory lock over a store directory. Prevents concurrent writers.
///
/// The `.lock` file holds the PID and a timestamp; locks older than
/// [`StoreLock::STALE_SECS`] are taken over.
pub struct StoreLock {
    lock_path: PathBuf,
}

impl StoreLock {
    pub const STALE_SECS: i64 = 60;

    pub fn acquire(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        let lock_path = dir.join(".lock");

        if lock_path.exists() {
            let content = std::fs::read_to_string(&lock_path).unwrap_or_default();
            let stamped = content.lines().nth(1).and_then(|ts| ts.parse::<i64>().ok());
            match stamped {
                Some(ts) if chrono::Utc::now().timestamp() - ts <= Self::STALE_SECS => {
                    return Err(StoreError::Locked(lock_path));
                }
                _ => {
                    tracing::warn!(path = %lock_path.display(), "removing stale store lock");
                    let _ = std::fs::remove_file(&lock_path);
                }
            }
        }

        let content = format!("{}\n{}\n", std::process::id(), chrono::Utc::now().timestamp());
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => StoreError::Locked(lock_path.clone()),
                _ => StoreError::io(&lock_path, e),
            })?;
        file.write_all(content.as_bytes())
            .map_err(|e| StoreError::io(&lock_path, e))?;

        Ok(Self { lock_path })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

fn temp_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{nanos:x}-{}", std::process::id())
}
