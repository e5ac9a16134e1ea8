use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use blobscope_core::{CacheError, CacheHandle, CacheLayout, CacheOpener, OpenCacheRequest};
use rusqlite::{Connection as RusqliteConnection, OpenFlags, OptionalExtension};

/// Database file name inside a cache directory.
pub const CACHE_DATABASE_FILE: &str = "blobs.db";

const LIST_KEYS_SQL: &str = "SELECT Key FROM CacheElement ORDER BY Key";
const GET_VALUE_SQL: &str = "SELECT Value FROM CacheElement WHERE Key = ?1";

/// Opens blob caches stored as SQLite databases with a `CacheElement` table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteCacheOpener;

impl SqliteCacheOpener {
    pub fn new() -> Self {
        Self
    }
}

impl CacheOpener for SqliteCacheOpener {
    fn display_name(&self) -> &'static str {
        "SQLite blob cache"
    }

    fn open(&self, request: &OpenCacheRequest) -> Result<Arc<dyn CacheHandle>, CacheError> {
        request.validate()?;

        let path = database_path(&request.path, request.layout);
        let handle = SqliteCacheHandle::open(&path)?;

        Ok(Arc::new(handle))
    }
}

fn database_path(path: &Path, layout: CacheLayout) -> PathBuf {
    match layout {
        CacheLayout::DatabaseFile => path.to_path_buf(),
        CacheLayout::Directory => path.join(CACHE_DATABASE_FILE),
    }
}

/// Read-only view of one cache database.
///
/// Entries are listed regardless of their expiration, so keys that the owning
/// application would already consider stale remain visible for inspection.
pub struct SqliteCacheHandle {
    conn: Mutex<RusqliteConnection>,
    path: PathBuf,
}

impl SqliteCacheHandle {
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if !path.is_file() {
            return Err(CacheError::InvalidLocation(format!(
                "{} does not exist",
                path.display()
            )));
        }

        let conn = RusqliteConnection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| CacheError::InvalidLocation(format!("{}: {}", path.display(), e)))?;

        log::info!("[OPEN] SQLite cache {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheHandle for SqliteCacheHandle {
    fn list_keys(&self) -> Result<Vec<String>, CacheError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CacheError::enumeration(format!("Lock error: {}", e)))?;

        let mut stmt = conn
            .prepare(LIST_KEYS_SQL)
            .map_err(|e| CacheError::enumeration(e.to_string()))?;

        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| CacheError::enumeration(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CacheError::enumeration(e.to_string()))?;

        log::debug!("[SCAN] {} keys in {}", keys.len(), self.path.display());

        Ok(keys)
    }

    fn get_value(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CacheError::fetch(format!("Lock error: {}", e)))?;

        let value = conn
            .query_row(GET_VALUE_SQL, [key], |row| row.get::<_, Option<Vec<u8>>>(0))
            .optional()
            .map_err(|e| CacheError::fetch(e.to_string()))?;

        // A row holding NULL is treated like a missing entry.
        Ok(value.flatten())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
