//! Configuration file handling.
//!
//! Reads from `~/.config/acctkeep/acctkeep.toml`

use acctkeep_core::{DuplicateVisibility, FaultPolicy, ImportOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Color scheme of the terminal UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// How import conflicts are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConflictMode {
    /// Ask for every conflict.
    #[default]
    Ask,
    /// Always replace the stored record.
    Replace,
    /// Always keep the stored record.
    Skip,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the record store file.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Directory exports are written to.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    #[serde(default)]
    pub theme: Theme,
    /// Whether duplicate checks during import see entries added earlier in the same file.
    #[serde(default)]
    pub duplicate_visibility: DuplicateVisibility,
    /// What to do with invalid entries in an import file.
    #[serde(default)]
    pub fault_policy: FaultPolicy,
    #[serde(default)]
    pub conflict_policy: ConflictMode,
    /// Where this config was loaded from; saved back to the same place.
    #[serde(skip)]
    source: Option<PathBuf>,
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("acctkeep")
}

fn default_store_path() -> PathBuf {
    data_dir().join("accounts.db.json")
}

fn default_export_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            export_dir: default_export_dir(),
            theme: Theme::default(),
            duplicate_visibility: DuplicateVisibility::default(),
            fault_policy: FaultPolicy::default(),
            conflict_policy: ConflictMode::default(),
            source: None,
        }
    }
}

/// Directory for the log file written while the TUI runs: next to the store in use.
pub fn log_dir(store_path: &Path) -> PathBuf {
    store_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(data_dir)
}

impl Config {
    /// Load configuration from the config file.
    ///
    /// If `custom_path` is provided, load from that path.
    /// Otherwise, load from the default XDG config location.
    /// Creates a default config file if it doesn't exist (only for default path).
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self> {
        let is_custom = custom_path.is_some();
        let config_path = match custom_path {
            Some(path) => path,
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            if is_custom {
                anyhow::bail!("Config file not found: {}", config_path.display());
            }
            let config = Config {
                source: Some(config_path),
                ..Config::default()
            };
            config.save()?;
            return Ok(config);
        }

        let mut config = Self::from_file(&config_path)?;
        config.source = Some(config_path);
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration back to the file it came from.
    pub fn save(&self) -> Result<()> {
        let config_path = match &self.source {
            Some(path) => path.clone(),
            None => Self::config_path()?,
        };

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            visibility: self.duplicate_visibility,
            faults: self.fault_policy,
        }
    }

    /// File this config was loaded from or created at.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Get the path to the config file.
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("acctkeep").join("acctkeep.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: Config = toml::from_str(r#"store_path = "/tmp/a.json""#).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/a.json"));
        assert_eq!(config.theme, Theme::Light);
        assert_eq!(config.conflict_policy, ConflictMode::Ask);
        assert_eq!(config.import_options(), ImportOptions::default());
    }

    #[test]
    fn parses_policies() {
        let config: Config = toml::from_str(
            r#"
            theme = "dark"
            duplicate_visibility = "snapshot"
            fault_policy = "abort"
            conflict_policy = "replace"
            "#,
        )
        .unwrap();
        assert_eq!(config.theme, Theme::Dark);
        assert_eq!(config.conflict_policy, ConflictMode::Replace);
        assert_eq!(
            config.import_options(),
            ImportOptions {
                visibility: DuplicateVisibility::Snapshot,
                faults: FaultPolicy::Abort,
            }
        );
    }

    #[test]
    fn log_dir_follows_the_store_in_use() {
        assert_eq!(
            log_dir(Path::new("/srv/other/accounts.db.json")),
            PathBuf::from("/srv/other")
        );
        assert_eq!(log_dir(Path::new("accounts.db.json")), data_dir());
    }

    #[test]
    fn custom_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn saves_back_to_the_loaded_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acctkeep.toml");
        std::fs::write(&path, "theme = \"light\"\n").unwrap();

        let mut config = Config::load(Some(path.clone())).unwrap();
        config.theme = config.theme.toggled();
        config.save().unwrap();

        let reloaded = Config::load(Some(path.clone())).unwrap();
        assert_eq!(reloaded.source(), Some(path.as_path()));
        assert_eq!(reloaded.theme, Theme::Dark);
    }
}
