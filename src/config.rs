//! Configuration primitives for profile synchronization.
//!
//! Stored in a machine-readable TOML file located at:
//!   %APPDATA%/ProfileSync/config/config.toml on Windows
//!   $XDG_DATA_HOME/ProfileSync/config/config.toml on Linux
//!   ~/Library/Application Support/ProfileSync/config/config.toml on macOS
//!
//! The config tracks debounce timing, local validation bounds, OTP shape and
//! whether the sync journal is mirrored to disk.

use serde::{Deserialize, Serialize};

use crate::profile::model::FieldName;

/// Root configuration persisted per installation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    /// Quiescence windows applied before an edit is treated as stable.
    #[serde(default)]
    pub debounce: DebounceSettings,
    /// Bounds used by local validation before any remote call.
    #[serde(default)]
    pub validation: ValidationSettings,
    /// One-time passcode shape.
    #[serde(default)]
    pub otp: OtpSettings,
    /// Event journal persistence.
    #[serde(default)]
    pub journal: JournalSettings,
}

/// Debounce timing per field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebounceSettings {
    /// Milliseconds an edit must stay unchanged before it is pushed.
    #[serde(default = "default_quiescence_ms")]
    pub quiescence_ms: u64,
    /// Fields committed on the next tick without waiting (select inputs).
    #[serde(default = "default_immediate_fields")]
    pub immediate_fields: Vec<FieldName>,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            quiescence_ms: default_quiescence_ms(),
            immediate_fields: default_immediate_fields(),
        }
    }
}

impl DebounceSettings {
    /// Quiescence window for a single field.
    pub fn window_for(&self, field: FieldName) -> u64 {
        if self.immediate_fields.contains(&field) {
            0
        } else {
            self.quiescence_ms
        }
    }
}

const fn default_quiescence_ms() -> u64 {
    1_000
}

fn default_immediate_fields() -> Vec<FieldName> {
    vec![FieldName::Gender]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSettings {
    #[serde(default = "default_min_phone_digits")]
    pub min_phone_digits: usize,
    #[serde(default = "default_max_phone_digits")]
    pub max_phone_digits: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            min_phone_digits: default_min_phone_digits(),
            max_phone_digits: default_max_phone_digits(),
        }
    }
}

const fn default_min_phone_digits() -> usize {
    7
}

const fn default_max_phone_digits() -> usize {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpSettings {
    /// Number of digits in codes issued by the in-memory store.
    #[serde(default = "default_code_length")]
    pub code_length: usize,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
        }
    }
}

const fn default_code_length() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalSettings {
    /// Mirror journal events to a JSONL file under the workspace root.
    #[serde(default)]
    pub persist: bool,
    #[serde(default = "default_journal_file_name")]
    pub file_name: String,
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            persist: false,
            file_name: default_journal_file_name(),
        }
    }
}

fn default_journal_file_name() -> String {
    "sync_events.jsonl".into()
}

/// Standard relative path to the config file (resolved per OS at runtime).
pub const CONFIG_FILE_NAME: &str = "config.toml";

use anyhow::{Context, Result};
use directories::BaseDirs;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Returns the root directory where ProfileSync stores data.
///
/// Order of precedence:
/// 1. `PROFILESYNC_HOME` environment variable.
/// 2. OS-specific data directory via `directories::BaseDirs`.
pub fn workspace_root() -> Result<PathBuf> {
    if let Ok(path) = env::var("PROFILESYNC_HOME") {
        return Ok(PathBuf::from(path));
    }
    let base_dirs = BaseDirs::new().context("Unable to determine OS data directory")?;
    Ok(base_dirs.data_dir().join("ProfileSync"))
}

pub fn config_dir() -> Result<PathBuf> {
    let root = workspace_root()?;
    Ok(root.join("config"))
}

/// Path to the config file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Path of the JSONL journal mirror.
pub fn journal_file_path(config: &SyncConfig) -> Result<PathBuf> {
    Ok(workspace_root()?.join(&config.journal.file_name))
}

/// Loads the configuration from disk or returns defaults.
pub fn load_or_default() -> Result<SyncConfig> {
    let path = config_file_path()?;
    if path.exists() {
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let cfg: SyncConfig = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(cfg)
    } else {
        Ok(SyncConfig::default())
    }
}

/// Persists the configuration to disk.
pub fn save(config: &SyncConfig) -> Result<()> {
    let dir = config_dir()?;
    fs::create_dir_all(&dir)?;
    let path = config_file_path()?;
    let data = toml::to_string_pretty(config)?;
    fs::write(&path, data)?;
    Ok(())
}
