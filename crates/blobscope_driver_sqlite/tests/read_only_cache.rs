use std::path::{Path, PathBuf};

use blobscope_core::{CacheError, CacheHandle, CacheLayout, CacheOpener, OpenCacheRequest};
use blobscope_driver_sqlite::{CACHE_DATABASE_FILE, SqliteCacheHandle, SqliteCacheOpener};
use rusqlite::Connection;

fn write_cache(path: &Path, entries: &[(&str, Option<&[u8]>, i64)]) -> Result<(), CacheError> {
    let conn = Connection::open(path).map_err(|e| CacheError::InvalidLocation(e.to_string()))?;

    conn.execute_batch(
        "CREATE TABLE CacheElement (
            Key TEXT PRIMARY KEY NOT NULL,
            TypeName TEXT,
            Value BLOB,
            Expiration INTEGER NOT NULL,
            CreatedAt INTEGER NOT NULL
        )",
    )
    .map_err(|e| CacheError::InvalidLocation(e.to_string()))?;

    for (key, value, expiration) in entries {
        conn.execute(
            "INSERT INTO CacheElement (Key, TypeName, Value, Expiration, CreatedAt)
             VALUES (?1, NULL, ?2, ?3, 0)",
            rusqlite::params![key, value, expiration],
        )
        .map_err(|e| CacheError::InvalidLocation(e.to_string()))?;
    }

    Ok(())
}

fn cache_dir_with(entries: &[(&str, Option<&[u8]>, i64)]) -> Result<tempfile::TempDir, CacheError> {
    let dir = tempfile::tempdir()?;
    write_cache(&dir.path().join(CACHE_DATABASE_FILE), entries)?;
    Ok(dir)
}

fn db_file(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join(CACHE_DATABASE_FILE)
}

// ---------------------------------------------------------------------------
// Opening
// ---------------------------------------------------------------------------

#[test]
fn opens_database_file_and_directory_layouts() -> Result<(), CacheError> {
    let dir = cache_dir_with(&[("k", Some(b"v"), i64::MAX)])?;
    let opener = SqliteCacheOpener::new();

    let from_file = opener.open(&OpenCacheRequest::new(db_file(&dir)))?;
    assert_eq!(from_file.list_keys()?, vec!["k".to_string()]);

    let from_dir =
        opener.open(&OpenCacheRequest::new(dir.path()).with_layout(CacheLayout::Directory))?;
    assert_eq!(from_dir.list_keys()?, vec!["k".to_string()]);
    assert_eq!(from_dir.location(), db_file(&dir).display().to_string());

    Ok(())
}

#[test]
fn directory_without_database_is_rejected() -> Result<(), CacheError> {
    let dir = tempfile::tempdir()?;
    let request = OpenCacheRequest::new(dir.path()).with_layout(CacheLayout::Directory);

    let result = SqliteCacheOpener::new().open(&request);
    assert!(matches!(result, Err(CacheError::InvalidLocation(_))));

    Ok(())
}

#[test]
fn encrypted_request_is_not_supported() -> Result<(), CacheError> {
    let dir = cache_dir_with(&[])?;
    let request = OpenCacheRequest::new(db_file(&dir)).encrypted(true);

    let result = SqliteCacheOpener::new().open(&request);
    assert!(matches!(result, Err(CacheError::NotSupported(_))));

    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

#[test]
fn lists_keys_in_order_including_expired_entries() -> Result<(), CacheError> {
    let dir = cache_dir_with(&[
        ("zeta", Some(b"z"), i64::MAX),
        ("alpha", Some(b"a"), 0),
        ("Mid", Some(b"m"), 1),
    ])?;
    let handle = SqliteCacheHandle::open(&db_file(&dir))?;

    assert_eq!(handle.list_keys()?, vec!["Mid", "alpha", "zeta"]);

    Ok(())
}

#[test]
fn reads_values_and_reports_missing_keys_as_none() -> Result<(), CacheError> {
    let dir = cache_dir_with(&[("json", Some(br#"{"x":1}"#), 0), ("null", None, 0)])?;
    let handle = SqliteCacheHandle::open(&db_file(&dir))?;

    assert_eq!(handle.get_value("json")?, Some(br#"{"x":1}"#.to_vec()));
    assert_eq!(handle.get_value("null")?, None);
    assert_eq!(handle.get_value("absent")?, None);

    Ok(())
}

#[test]
fn database_without_cache_table_fails_enumeration() -> Result<(), CacheError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("other.db");
    Connection::open(&path)
        .and_then(|conn| conn.execute_batch("CREATE TABLE unrelated (id INTEGER)"))
        .map_err(|e| CacheError::InvalidLocation(e.to_string()))?;

    let handle = SqliteCacheHandle::open(&path)?;

    assert!(matches!(handle.list_keys(), Err(CacheError::Enumeration(_))));
    assert!(matches!(handle.get_value("k"), Err(CacheError::Fetch(_))));

    Ok(())
}

#[test]
fn opened_cache_is_left_untouched() -> Result<(), CacheError> {
    let dir = cache_dir_with(&[("k", Some(b"v"), 0)])?;
    let before = std::fs::read(db_file(&dir))?;

    let handle = SqliteCacheHandle::open(&db_file(&dir))?;
    handle.list_keys()?;
    handle.get_value("k")?;
    drop(handle);

    assert_eq!(std::fs::read(db_file(&dir))?, before);

    Ok(())
}
