use std::sync::Arc;

use crate::{CacheError, OpenCacheRequest};

/// Factory for read-only cache handles.
///
/// Each storage backend (SQLite blob cache, in-memory fakes) provides its own
/// opener. Opening may touch the filesystem, so callers run it off the UI task.
pub trait CacheOpener: Send + Sync {
    /// Human-readable name for UI display (e.g., "SQLite blob cache").
    fn display_name(&self) -> &'static str;

    /// Open the cache described by `request`.
    ///
    /// `CacheBrowser::open_cache` validates the request before calling this,
    /// but openers may be used on their own and should not rely on it.
    fn open(&self, request: &OpenCacheRequest) -> Result<Arc<dyn CacheHandle>, CacheError>;
}

/// An open key-value blob cache.
///
/// The browser only ever reads through this trait. Both calls may block on
/// disk I/O and are executed on the blocking worker pool, so implementations
/// must be thread-safe (`Send + Sync`).
pub trait CacheHandle: Send + Sync {
    /// Enumerate every key currently stored in the cache.
    fn list_keys(&self) -> Result<Vec<String>, CacheError>;

    /// Read the raw bytes bound to `key`.
    ///
    /// Returns `Ok(None)` when the key does not exist.
    fn get_value(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Location shown in logs and task descriptions.
    fn location(&self) -> String {
        String::from("<memory>")
    }
}
