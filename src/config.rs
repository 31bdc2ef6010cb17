use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default release cache time-to-live in milliseconds (1 hour)
pub const DEFAULT_CACHE_TTL_MS: u64 = 60 * 60 * 1000;

/// Timeout for fetch operations in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// Upstream constants
// =============================================================================

/// Releases endpoint of the Unity release API
pub const DEFAULT_API_URL: &str = "https://services.api.unity.com/unity/editor/release/v1/releases";

/// Release notes page, `{version}` is replaced with the full version string
pub const DEFAULT_RELEASE_NOTES_URL_TEMPLATE: &str =
    "https://unity.com/releases/editor/whats-new/{version}";

/// Largest page the release API serves
pub const MAX_PAGE_SIZE: usize = 25;

pub const USER_AGENT: &str = concat!("unity-releases/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Application configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub cache: CacheConfig,
    pub upstream: UpstreamConfig,
    pub log: LogConfig,
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Time-to-live of an aggregated release list in milliseconds
    pub ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL_MS,
        }
    }
}

/// Upstream release API configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UpstreamConfig {
    pub base_url: String,
    pub release_notes_url_template: String,
    /// Requested page size, clamped to [`MAX_PAGE_SIZE`]
    pub page_size: usize,
    /// Request timeout in milliseconds
    pub timeout: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            release_notes_url_template: DEFAULT_RELEASE_NOTES_URL_TEMPLATE.to_string(),
            page_size: MAX_PAGE_SIZE,
            timeout: FETCH_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LogConfig {
    /// Emit log lines as JSON
    pub json: bool,
}

impl Config {
    /// Load configuration from a JSON file, using defaults for missing fields
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load `path` if given, otherwise the default config file if it exists
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Returns the path to the data directory for unity-releases.
/// Uses $XDG_DATA_HOME/unity-releases if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/unity-releases,
/// or ./unity-releases if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the default config file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("unity-releases.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("unity-releases")
}
