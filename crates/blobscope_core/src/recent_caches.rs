use crate::{CacheError, CacheLayout, app_config_dir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentCache {
    pub path: PathBuf,
    #[serde(default)]
    pub layout: CacheLayout,
    pub last_opened: i64,
}

pub struct RecentCachesStore {
    storage_path: PathBuf,
    entries: Vec<RecentCache>,
    limit: usize,
}

impl RecentCachesStore {
    pub fn new(limit: usize) -> Result<Self, CacheError> {
        Ok(Self::from_path(
            app_config_dir()?.join("recent_caches.json"),
            limit,
        ))
    }

    pub fn from_path(storage_path: impl Into<PathBuf>, limit: usize) -> Self {
        let storage_path = storage_path.into();
        let entries = Self::load_from_path(&storage_path);

        Self {
            storage_path,
            entries,
            limit: limit.max(1),
        }
    }

    fn load_from_path(path: &Path) -> Vec<RecentCache> {
        if !path.exists() {
            return Vec::new();
        }

        match fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()))
        {
            Ok(entries) => entries,
            Err(error) => {
                log::warn!(
                    "Ignoring unreadable recent caches file {}: {}",
                    path.display(),
                    error
                );
                Vec::new()
            }
        }
    }

    pub fn save(&self) {
        let result = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| e.to_string())
            .and_then(|content| fs::write(&self.storage_path, content).map_err(|e| e.to_string()));

        if let Err(error) = result {
            log::warn!("Failed to save recent caches: {}", error);
        }
    }

    /// Record that a cache was opened. Moves existing entries to the top.
    pub fn record_open(&mut self, path: PathBuf, layout: CacheLayout) {
        self.entries.retain(|e| e.path != path);

        self.entries.insert(
            0,
            RecentCache {
                path,
                layout,
                last_opened: chrono::Utc::now().timestamp(),
            },
        );

        if self.entries.len() > self.limit {
            self.entries.truncate(self.limit);
        }

        self.save();
    }

    pub fn entries(&self) -> &[RecentCache] {
        &self.entries
    }

    pub fn remove(&mut self, path: &Path) {
        self.entries.retain(|e| e.path != path);
        self.save();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.save();
    }
}
