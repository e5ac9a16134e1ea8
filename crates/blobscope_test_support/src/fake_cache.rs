use blobscope_core::{CacheError, CacheHandle, CacheOpener, OpenCacheRequest};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum FakeValueOutcome {
    Value(Vec<u8>),
    Error(String),
    Panic(String),
}

#[derive(Debug, Clone, Default)]
pub struct FakeCacheStats {
    pub list_calls: usize,
    pub get_calls: Vec<String>,
}

#[derive(Default)]
struct FakeCacheState {
    location: RwLock<Option<String>>,
    keys: RwLock<Vec<String>>,
    values: RwLock<HashMap<String, FakeValueOutcome>>,
    list_error: RwLock<Option<String>>,
    list_delay: RwLock<Duration>,
    get_delays: RwLock<HashMap<String, Duration>>,
    list_calls: AtomicUsize,
    get_calls: Mutex<Vec<String>>,
}

/// In-memory cache handle with scripted latency and failures.
///
/// Clones share state, so a test can keep one clone for assertions while the
/// browser holds another.
#[derive(Clone, Default)]
pub struct FakeCache {
    state: Arc<FakeCacheState>,
}

impl FakeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache listing `keys`, each bound to its own name as UTF-8 bytes.
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        keys.into_iter().fold(Self::new(), |cache, key| {
            let key = key.into();
            let bytes = key.clone().into_bytes();
            cache.with_value(key, bytes)
        })
    }

    pub fn with_location(self, location: impl Into<String>) -> Self {
        *rwlock_write(&self.state.location) = Some(location.into());
        self
    }

    pub fn with_value(self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let key = key.into();
        self.push_key(&key);
        rwlock_write(&self.state.values).insert(key, FakeValueOutcome::Value(bytes.into()));
        self
    }

    /// Key shows up in the enumeration but has no value behind it.
    pub fn with_dangling_key(self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.push_key(&key);
        rwlock_write(&self.state.values).remove(&key);
        self
    }

    pub fn with_get_error(self, key: impl Into<String>, message: impl Into<String>) -> Self {
        let key = key.into();
        self.push_key(&key);
        rwlock_write(&self.state.values).insert(key, FakeValueOutcome::Error(message.into()));
        self
    }

    pub fn with_get_panic(self, key: impl Into<String>, message: impl Into<String>) -> Self {
        let key = key.into();
        self.push_key(&key);
        rwlock_write(&self.state.values).insert(key, FakeValueOutcome::Panic(message.into()));
        self
    }

    pub fn with_list_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.list_error) = Some(message.into());
        self
    }

    pub fn with_list_delay(self, delay: Duration) -> Self {
        *rwlock_write(&self.state.list_delay) = delay;
        self
    }

    pub fn with_get_delay(self, key: impl Into<String>, delay: Duration) -> Self {
        rwlock_write(&self.state.get_delays).insert(key.into(), delay);
        self
    }

    /// Replace the value of `key` after construction.
    pub fn set_value(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let key = key.into();
        self.push_key(&key);
        rwlock_write(&self.state.values).insert(key, FakeValueOutcome::Value(bytes.into()));
    }

    pub fn stats(&self) -> FakeCacheStats {
        FakeCacheStats {
            list_calls: self.state.list_calls.load(Ordering::Relaxed),
            get_calls: mutex_lock(&self.state.get_calls).clone(),
        }
    }

    pub fn as_handle(&self) -> Arc<dyn CacheHandle> {
        Arc::new(self.clone())
    }

    fn push_key(&self, key: &str) {
        let mut keys = rwlock_write(&self.state.keys);
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
}

impl CacheHandle for FakeCache {
    fn list_keys(&self) -> Result<Vec<String>, CacheError> {
        self.state.list_calls.fetch_add(1, Ordering::Relaxed);

        let delay = *rwlock_read(&self.state.list_delay);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        if let Some(message) = rwlock_read(&self.state.list_error).clone() {
            return Err(CacheError::enumeration(message));
        }

        Ok(rwlock_read(&self.state.keys).clone())
    }

    fn get_value(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        mutex_lock(&self.state.get_calls).push(key.to_string());

        let delay = rwlock_read(&self.state.get_delays).get(key).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let outcome = rwlock_read(&self.state.values).get(key).cloned();
        match outcome {
            Some(FakeValueOutcome::Value(bytes)) => Ok(Some(bytes)),
            Some(FakeValueOutcome::Error(message)) => Err(CacheError::fetch(message)),
            Some(FakeValueOutcome::Panic(message)) => panic!("{}", message),
            None => Ok(None),
        }
    }

    fn location(&self) -> String {
        rwlock_read(&self.state.location)
            .clone()
            .unwrap_or_else(|| String::from("<fake>"))
    }
}

/// Opener that always hands out the same fake cache, or fails.
#[derive(Clone)]
pub struct FakeOpener {
    cache: FakeCache,
    error: Option<String>,
    opened: Arc<Mutex<Vec<OpenCacheRequest>>>,
}

impl FakeOpener {
    pub fn new(cache: FakeCache) -> Self {
        Self {
            cache,
            error: None,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(FakeCache::new())
        }
    }

    pub fn opened_requests(&self) -> Vec<OpenCacheRequest> {
        mutex_lock(&self.opened).clone()
    }

    pub fn as_opener(&self) -> Arc<dyn CacheOpener> {
        Arc::new(self.clone())
    }
}

impl CacheOpener for FakeOpener {
    fn display_name(&self) -> &'static str {
        "Fake cache"
    }

    fn open(&self, request: &OpenCacheRequest) -> Result<Arc<dyn CacheHandle>, CacheError> {
        mutex_lock(&self.opened).push(request.clone());

        if let Some(message) = &self.error {
            return Err(CacheError::InvalidLocation(message.clone()));
        }

        Ok(self.cache.as_handle())
    }
}

fn rwlock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn rwlock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_values_and_failures() {
        let cache = FakeCache::new()
            .with_value("alpha", b"1".to_vec())
            .with_dangling_key("ghost")
            .with_get_error("broken", "disk on fire");

        assert_eq!(
            cache.list_keys().expect("list"),
            vec!["alpha".to_string(), "ghost".to_string(), "broken".to_string()]
        );
        assert_eq!(cache.get_value("alpha").expect("get"), Some(b"1".to_vec()));
        assert_eq!(cache.get_value("ghost").expect("get"), None);
        assert!(matches!(
            cache.get_value("broken"),
            Err(CacheError::Fetch(_))
        ));

        let stats = cache.stats();
        assert_eq!(stats.list_calls, 1);
        assert_eq!(stats.get_calls, vec!["alpha", "ghost", "broken"]);
    }

    #[test]
    fn list_error_is_reported() {
        let cache = FakeCache::with_keys(["a"]).with_list_error("corrupt");
        assert!(matches!(
            cache.list_keys(),
            Err(CacheError::Enumeration(_))
        ));
    }

    #[test]
    fn clones_share_state() {
        let cache = FakeCache::with_keys(["a"]);
        let handle = cache.as_handle();

        cache.set_value("b", b"2".to_vec());
        assert_eq!(handle.list_keys().expect("list").len(), 2);
        assert_eq!(handle.location(), "<fake>");
    }
}
