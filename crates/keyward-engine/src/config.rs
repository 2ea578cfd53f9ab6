use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::atomic::atomic_write;

/// Environment variable overriding the tool home directory.
pub const HOME_ENV: &str = "KEYWARD_HOME";
const CONFIG_FILE: &str = "config.json";

/// Persistent tool configuration (`<home>/config.json`).
///
/// Relative directories are resolved against the home directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    #[serde(default = "default_keys_dir")]
    pub keys_dir: PathBuf,
    /// Currently selected account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("store")
}

fn default_keys_dir() -> PathBuf {
    PathBuf::from("keys")
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            keys_dir: default_keys_dir(),
            account: None,
        }
    }
}

impl ToolConfig {
    /// Load `<home>/config.json`, falling back to defaults when it does not exist.
    pub fn load(home: &Path) -> Result<Self> {
        let path = home.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("{}: invalid config JSON", path.display()))
    }

    pub fn save(&self, home: &Path) -> Result<()> {
        std::fs::create_dir_all(home)
            .with_context(|| format!("cannot create {}", home.display()))?;
        let path = home.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(&path, json.as_bytes(), None)
            .with_context(|| format!("cannot write config {}", path.display()))
    }

    pub fn store_path(&self, home: &Path) -> PathBuf {
        home.join(&self.store_dir)
    }

    pub fn keys_path(&self, home: &Path) -> PathBuf {
        home.join(&self.keys_dir)
    }
}

/// Resolve the tool home: explicit flag, then `KEYWARD_HOME`, then `~/.keyward`.
pub fn resolve_home(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(env) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(env));
    }
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .context("cannot determine home directory - set KEYWARD_HOME or pass --home")?;
    Ok(PathBuf::from(home).join(".keyward"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ToolConfig::load(dir.path()).unwrap();
        assert_eq!(cfg, ToolConfig::default());
        assert_eq!(cfg.store_path(dir.path()), dir.path().join("store"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ToolConfig {
            account: Some("A".into()),
            ..ToolConfig::default()
        };
        cfg.save(dir.path()).unwrap();
        assert_eq!(ToolConfig::load(dir.path()).unwrap(), cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), r#"{"account":"B"}"#).unwrap();
        let cfg = ToolConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.account.as_deref(), Some("B"));
        assert_eq!(cfg.keys_dir, PathBuf::from("keys"));
    }

    #[test]
    fn explicit_home_wins() {
        let home = resolve_home(Some(Path::new("/tmp/kw-home"))).unwrap();
        assert_eq!(home, PathBuf::from("/tmp/kw-home"));
    }
}
