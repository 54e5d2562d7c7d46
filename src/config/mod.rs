//! Configuration management for modkeeper
//!
//! Uses XDG-compliant paths:
//! - Config: ~/.config/modkeeper/config.toml
//! - Data: ~/.local/share/modkeeper/

mod paths;

pub use paths::Paths;

use crate::collection::DEFAULT_ALWAYS_ACTIVE_EXCEPTION;
use crate::view::SortBy;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Profile opened when no `--profile` is given
    pub active_profile: Option<String>,

    /// User preferences consulted by the engines
    pub settings: Settings,

    /// The one base mod that may be deactivated
    pub always_active_exception: String,

    /// Paths configuration
    #[serde(skip)]
    pub paths: Paths,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_paths(Paths::new())
    }
}

/// Preferences that change engine behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ask before a toggle cascades to dependencies or dependents
    pub dependency_confirmation: bool,

    /// Active sort mode of the mod list
    pub sort_by: SortBy,

    /// Show the version column
    pub toggle_version: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dependency_confirmation: true,
            sort_by: SortBy::LoadOrder,
            toggle_version: false,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => bail!("Invalid value '{}' for {}. Expected true or false", other, key),
    }
}

impl Config {
    /// Configuration rooted at explicit paths, with defaults for everything
    pub fn with_paths(paths: Paths) -> Self {
        Self {
            active_profile: None,
            settings: Settings::default(),
            always_active_exception: DEFAULT_ALWAYS_ACTIVE_EXCEPTION.to_string(),
            paths,
        }
    }

    /// Update a setting by its CLI key
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "dependency_confirmation" => {
                self.settings.dependency_confirmation = parse_bool(key, value)?
            }
            "sort_by" => self.settings.sort_by = SortBy::from_cli(value)?,
            "toggle_version" => self.settings.toggle_version = parse_bool(key, value)?,
            "always_active_exception" => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    bail!("always_active_exception cannot be empty");
                }
                self.always_active_exception = trimmed.to_string();
            }
            "active_profile" => {
                let trimmed = value.trim();
                self.active_profile = (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
            other => bail!(
                "Unknown setting '{}'. Valid keys: dependency_confirmation, sort_by, toggle_version, always_active_exception, active_profile",
                other
            ),
        }
        Ok(())
    }

    /// Load configuration from disk or create default
    pub async fn load() -> Result<Self> {
        Self::load_from(Paths::new()).await
    }

    /// Load configuration stored under `paths`, creating it if missing
    pub async fn load_from(paths: Paths) -> Result<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            let config = Config::with_paths(paths.clone());
            config.save().await?;
            config
        };

        config.paths = paths;
        Ok(config)
    }

    /// Save configuration to disk
    pub async fn save(&self) -> Result<()> {
        let config_path = self.paths.config_file();

        // Ensure config directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .await
            .context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_creates_default_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::under(dir.path());

        let mut config = Config::load_from(paths.clone()).await.unwrap();
        assert!(paths.config_file().exists());
        assert!(config.settings.dependency_confirmation);
        assert_eq!(config.always_active_exception, DEFAULT_ALWAYS_ACTIVE_EXCEPTION);

        config.set_value("sort_by", "title").unwrap();
        config.set_value("dependency_confirmation", "off").unwrap();
        config.save().await.unwrap();

        let reloaded = Config::load_from(paths).await.unwrap();
        assert_eq!(reloaded.settings.sort_by, SortBy::Title);
        assert!(!reloaded.settings.dependency_confirmation);
    }

    #[test]
    fn test_set_value_rejects_unknown() {
        let mut config = Config::with_paths(Paths::under("/tmp/unused"));
        assert!(config.set_value("colour", "blue").is_err());
        assert!(config.set_value("toggle_version", "maybe").is_err());
        assert!(config.set_value("always_active_exception", "  ").is_err());
    }
}
