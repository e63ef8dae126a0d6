use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use serde::{Deserialize, Serialize};

use crate::services::transfer::ImportOptions;
use crate::services::transfer::retry::RetryPolicy;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spotify: SpotifyConfig,
    pub yandex: YandexConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Must match a redirect URI registered for the Spotify app
    pub redirect_uri: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: "https://open.spotify.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YandexConfig {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub request_timeout_secs: u64,
    pub max_timeout_retries: u32,
    /// Pause after every item added one by one
    pub add_item_delay_ms: u64,
    pub json_chunk_size: usize,
    pub json_playlist_name: String,
    /// Requested size of downloaded playlist covers, e.g. `400x400`
    pub cover_size: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            max_timeout_retries: 5,
            add_item_delay_ms: 1000,
            json_chunk_size: 50,
            json_playlist_name: "Imported from JSON".to_string(),
            cover_size: "400x400".to_string(),
        }
    }
}

impl ImportConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn import_options(&self, strict_search: bool, only_unavailable: bool) -> ImportOptions {
        ImportOptions {
            strict_search,
            only_unavailable,
            retry: RetryPolicy {
                max_timeout_retries: self.max_timeout_retries,
                ..RetryPolicy::default()
            },
            add_item_delay: Duration::from_millis(self.add_item_delay_ms),
            json_chunk_size: self.json_chunk_size,
            json_playlist_name: self.json_playlist_name.clone(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Default location of the config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("music-migrate").join("config.toml"))
    }

    /// Load the default config file, or built-in defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                log::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                log::debug!("No config directory found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the default config to the default location, if it doesn't exist
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_else(|| eyre!("No config directory found"))?;
        Self::default().write_if_missing(&path)?;
        Ok(path)
    }

    fn write_if_missing(&self, path: &Path) -> Result<()> {
        if path.exists() {
            log::info!("Config file already exists at {}", path.display());
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).wrap_err("Failed to serialize config")?;
        std::fs::write(path, contents)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))?;
        log::info!("Wrote default config to {}", path.display());
        Ok(())
    }
}
