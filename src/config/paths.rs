//! XDG-compliant path management

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Manages all application paths using XDG base directory specification
#[derive(Debug, Clone)]
pub struct Paths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    /// Create a new Paths instance
    pub fn new() -> Self {
        let dirs = ProjectDirs::from("", "", "modkeeper")
            .expect("Failed to determine project directories");
        Self {
            config_dir: dirs.config_dir().to_path_buf(),
            data_dir: dirs.data_dir().to_path_buf(),
        }
    }

    /// Keep config and data together under `root` (portable installs, tests)
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
        }
    }

    // ========== Config Paths ==========

    /// Config directory: ~/.config/modkeeper/
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Main config file: ~/.config/modkeeper/config.toml
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    // ========== Data Paths ==========

    /// Data directory: ~/.local/share/modkeeper/
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    /// Database file: ~/.local/share/modkeeper/modkeeper.db
    pub fn database_file(&self) -> PathBuf {
        self.data_dir.join("modkeeper.db")
    }

    /// Log file: ~/.local/share/modkeeper/modkeeper.log
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("modkeeper.log")
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
