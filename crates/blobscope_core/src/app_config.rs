use crate::{CacheError, ViewerKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_MAX_RECENT_CACHES: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Viewer selected when a cache is opened.
    #[serde(default)]
    pub default_viewer: ViewerKind,

    /// `env_logger` filter used when `RUST_LOG` is not set.
    #[serde(default)]
    pub log_filter: Option<String>,

    #[serde(default = "default_max_recent_caches")]
    pub max_recent_caches: usize,
}

fn default_max_recent_caches() -> usize {
    DEFAULT_MAX_RECENT_CACHES
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_viewer: ViewerKind::default(),
            log_filter: None,
            max_recent_caches: DEFAULT_MAX_RECENT_CACHES,
        }
    }
}

impl AppConfig {
    pub fn log_filter_or_default(&self) -> &str {
        self.log_filter.as_deref().unwrap_or("info")
    }
}

/// Directory holding every blobscope settings file, created on demand.
pub fn app_config_dir() -> Result<PathBuf, CacheError> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        CacheError::IoError(std::io::Error::other("Could not find config directory"))
    })?;

    let app_dir = config_dir.join("blobscope");
    fs::create_dir_all(&app_dir).map_err(CacheError::IoError)?;

    Ok(app_dir)
}

pub struct AppConfigStore {
    path: PathBuf,
}

impl AppConfigStore {
    pub fn new() -> Result<Self, CacheError> {
        Ok(Self {
            path: app_config_dir()?.join("config.json"),
        })
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<AppConfig, CacheError> {
        if !self.path.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.path).map_err(CacheError::IoError)?;
        let config: AppConfig =
            serde_json::from_str(&content).map_err(|e| CacheError::InvalidConfig(e.to_string()))?;

        Ok(config)
    }

    pub fn save(&self, config: &AppConfig) -> Result<(), CacheError> {
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| CacheError::InvalidConfig(e.to_string()))?;

        fs::write(&self.path, content).map_err(CacheError::IoError)?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
