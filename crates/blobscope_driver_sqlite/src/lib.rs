mod driver;

pub use driver::{CACHE_DATABASE_FILE, SqliteCacheHandle, SqliteCacheOpener};
