//! Application orchestration for the command line

mod actions;

use crate::config::Config;
use crate::db::Database;
use crate::session::{Notifier, Session};

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Profile used when neither `--profile` nor the config names one
pub const DEFAULT_PROFILE: &str = "default";

/// Reports background save failures on the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
        eprintln!("ERROR: {}", message);
    }
}

/// Main application struct that wires config, storage and sessions together
pub struct App {
    /// Application configuration
    pub config: Arc<RwLock<Config>>,

    /// Database connection
    pub db: Arc<Database>,

    /// Profile chosen on the command line
    profile_override: Option<String>,
}

impl App {
    /// Create a new App instance
    pub async fn new(config: Config) -> Result<Self> {
        // Ensure directories exist
        config
            .paths
            .ensure_dirs()
            .context("Failed to create directories")?;

        let db = Database::open(&config.paths.database_file()).context("Failed to open database")?;
        Ok(Self::with_database(config, db))
    }

    /// App over an already opened database
    pub fn with_database(config: Config, db: Database) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            db: Arc::new(db),
            profile_override: None,
        }
    }

    pub fn set_profile_override(&mut self, profile: Option<String>) {
        self.profile_override = profile
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
    }

    /// Profile the next command works on
    pub async fn profile_id(&self) -> String {
        if let Some(profile) = &self.profile_override {
            return profile.clone();
        }
        self.config
            .read()
            .await
            .active_profile
            .clone()
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    /// Load the current profile into a fresh session
    pub async fn open_session(&self) -> Result<Session> {
        let profile_id = self.profile_id().await;
        let config = self.config.read().await.clone();
        Session::load(self.db.clone(), &profile_id, &config, Arc::new(ConsoleNotifier))
            .await
            .with_context(|| format!("Failed to open profile '{}'", profile_id))
    }
}
