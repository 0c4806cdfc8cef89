use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

/// Configuration for one engine instance, loaded from an optional TOML file.
/// There is no process-wide singleton; each component takes the piece of
/// config it needs at construction.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Remote catalog settings.
    pub catalog: CatalogConfig,
    /// Identifications below this confidence get the actionable placeholder
    /// instead of metadata. Scores are uncapped; see `parser::HIGH_CONFIDENCE`.
    pub confidence_threshold: f32,
    /// Custom item-store database path (overrides XDG default).
    pub db_path: Option<PathBuf>,
}

/// Remote catalog API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Attached to every request as a query parameter; never logged.
    pub api_key: String,
    /// Minimum interval between requests in milliseconds.
    pub rate_limit_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.phish.net/v5".to_string(),
            api_key: String::new(),
            rate_limit_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/showrun/config.toml`.
    /// Returns defaults if the file doesn't exist; logs a warning if it
    /// exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default item-store database path using the XDG data directory.
pub fn default_db_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).ok();
        data_dir.join("showrun.db")
    } else {
        PathBuf::from("showrun.db")
    }
}
