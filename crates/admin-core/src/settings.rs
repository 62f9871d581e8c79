//! Stored settings.
//!
//! One JSON object in the per-user configuration directory. The directory
//! is overridable through `APPLOCK_ADMIN_CONFIG`, mostly for tests and
//! portable installs; otherwise it resolves under the user profile.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_DIR_ENV: &str = "APPLOCK_ADMIN_CONFIG";
const SETTINGS_FILE: &str = "settings.json";
const POLICIES_SUBDIR: &str = "policies";

pub const KNOWN_KEYS: &[&str] = &[
    "accesschk_path",
    "known_admins",
    "default_output_path",
    "active_policy",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Location of the Sysinternals AccessChk binary.
    pub accesschk_path: Option<PathBuf>,
    /// Principals treated as administrative during writable-directory
    /// enumeration, in addition to the built-in system accounts.
    pub known_admins: Vec<String>,
    /// Directory exported rule sets default into.
    pub default_output_path: Option<PathBuf>,
    /// Name of the active policy, mirrored from the policy store.
    pub active_policy: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_dir()?)
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading settings file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing settings file {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_dir()?)
    }

    pub fn save_to(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed creating config directory {}", dir.display()))?;
        let path = dir.join(SETTINGS_FILE);
        let content = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("failed writing {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("failed replacing {}", path.display()))?;
        Ok(())
    }

    /// Apply one `key=value` assignment from the command line.
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "accesschk_path" => self.accesschk_path = non_empty_path(value),
            "known_admins" => {
                self.known_admins = value
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(ToString::to_string)
                    .collect();
            }
            "default_output_path" => self.default_output_path = non_empty_path(value),
            "active_policy" => {
                let value = value.trim();
                self.active_policy = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            _ => bail!(
                "unrecognized settings key '{}'; known keys: {}",
                key,
                KNOWN_KEYS.join(", ")
            ),
        }
        Ok(())
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        let dir = dir.trim();
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    #[cfg(target_os = "windows")]
    {
        let base = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot locate the configuration directory")?;
        Ok(PathBuf::from(base).join("applock-admin"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME")
            .context("HOME is not set; cannot locate the configuration directory")?;
        Ok(PathBuf::from(home).join(".config").join("applock-admin"))
    }
}

pub fn policies_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join(POLICIES_SUBDIR))
}
