use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::CacheError;

/// On-disk shape of a cache location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CacheLayout {
    /// The path points at the database file itself.
    #[default]
    DatabaseFile,

    /// The path points at a cache directory holding the database.
    Directory,
}

/// Everything needed to open a cache for browsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenCacheRequest {
    pub path: PathBuf,
    pub layout: CacheLayout,
    pub encrypted: bool,
}

impl OpenCacheRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            layout: CacheLayout::DatabaseFile,
            encrypted: false,
        }
    }

    pub fn with_layout(mut self, layout: CacheLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    /// Check that the location exists and has the expected shape.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.path.as_os_str().is_empty() {
            return Err(CacheError::InvalidLocation("no cache path given".to_string()));
        }

        if self.encrypted {
            return Err(CacheError::NotSupported(
                "encrypted caches cannot be opened".to_string(),
            ));
        }

        let exists = match self.layout {
            CacheLayout::DatabaseFile => self.path.is_file(),
            CacheLayout::Directory => self.path.is_dir(),
        };

        if !exists {
            let expected = match self.layout {
                CacheLayout::DatabaseFile => "file",
                CacheLayout::Directory => "directory",
            };
            return Err(CacheError::InvalidLocation(format!(
                "{} is not an existing {}",
                self.path.display(),
                expected
            )));
        }

        Ok(())
    }

    /// Title shown for the opened cache: the last component of its path.
    pub fn title(&self) -> Option<String> {
        cache_title(&self.path)
    }
}

pub fn cache_title(path: &Path) -> Option<String> {
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return None;
    }

    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
