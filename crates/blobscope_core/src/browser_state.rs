use std::sync::Arc;

use crate::{CacheHandle, Observable, Property, ViewerKind};

/// The cache currently being browsed.
///
/// Two values are equal only when they share the same handle instance, so
/// reopening the same location counts as a change.
#[derive(Clone)]
pub struct ActiveCache {
    handle: Arc<dyn CacheHandle>,
    title: Option<String>,
}

impl ActiveCache {
    pub fn new(handle: Arc<dyn CacheHandle>, title: Option<String>) -> Self {
        Self { handle, title }
    }

    pub fn handle(&self) -> Arc<dyn CacheHandle> {
        self.handle.clone()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn location(&self) -> String {
        self.handle.location()
    }
}

impl PartialEq for ActiveCache {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.handle), Arc::as_ptr(&other.handle))
            && self.title == other.title
    }
}

impl std::fmt::Debug for ActiveCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveCache")
            .field("location", &self.handle.location())
            .field("title", &self.title)
            .finish()
    }
}

/// Key and viewer the user picked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub key: Option<String>,
    pub viewer: ViewerKind,
}

impl Selection {
    pub fn new(key: Option<String>, viewer: ViewerKind) -> Self {
        Self { key, viewer }
    }
}

/// Inputs of the browsing pipeline.
///
/// The shell writes here; components subscribe to the parts they derive from.
/// Each setter only notifies when the value actually changes.
pub struct BrowserState {
    active_cache: Property<Option<ActiveCache>>,
    filter_text: Property<String>,
    selection: Property<Selection>,
}

impl BrowserState {
    pub fn new(viewer: ViewerKind) -> Self {
        Self {
            active_cache: Property::new(None),
            filter_text: Property::new(String::new()),
            selection: Property::new(Selection::new(None, viewer)),
        }
    }

    pub fn set_active_cache(&self, cache: Option<ActiveCache>) -> bool {
        self.active_cache.set(cache)
    }

    pub fn active_cache(&self) -> Option<ActiveCache> {
        self.active_cache.get()
    }

    /// Re-announce the active cache so every dependent recomputes.
    pub fn reload_active_cache(&self) {
        self.active_cache.touch();
    }

    pub fn subscribe_active_cache(&self) -> Observable<Option<ActiveCache>> {
        self.active_cache.subscribe()
    }

    pub fn set_filter_text(&self, text: impl Into<String>) -> bool {
        self.filter_text.set(text.into())
    }

    pub fn filter_text(&self) -> String {
        self.filter_text.get()
    }

    pub fn subscribe_filter_text(&self) -> Observable<String> {
        self.filter_text.subscribe()
    }

    pub fn select_key(&self, key: Option<String>) -> bool {
        self.selection.update(|selection| {
            if selection.key == key {
                return false;
            }
            selection.key = key;
            true
        })
    }

    pub fn set_viewer(&self, viewer: ViewerKind) -> bool {
        self.selection.update(|selection| {
            if selection.viewer == viewer {
                return false;
            }
            selection.viewer = viewer;
            true
        })
    }

    pub fn set_selection(&self, selection: Selection) -> bool {
        self.selection.set(selection)
    }

    pub fn selection(&self) -> Selection {
        self.selection.get()
    }

    pub fn subscribe_selection(&self) -> Observable<Selection> {
        self.selection.subscribe()
    }
}

impl Default for BrowserState {
    fn default() -> Self {
        Self::new(ViewerKind::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheError;

    struct EmptyCache;

    impl CacheHandle for EmptyCache {
        fn list_keys(&self) -> Result<Vec<String>, CacheError> {
            Ok(Vec::new())
        }

        fn get_value(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Ok(None)
        }
    }

    #[test]
    fn active_cache_equality_is_by_instance() {
        let handle: Arc<dyn CacheHandle> = Arc::new(EmptyCache);
        let a = ActiveCache::new(handle.clone(), Some("blobs".to_string()));
        let b = ActiveCache::new(handle, Some("blobs".to_string()));
        let c = ActiveCache::new(Arc::new(EmptyCache), Some("blobs".to_string()));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn setting_same_cache_does_not_notify() {
        let state = BrowserState::default();
        let mut rx = state.subscribe_active_cache();
        let cache = ActiveCache::new(Arc::new(EmptyCache), None);

        assert!(state.set_active_cache(Some(cache.clone())));
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        assert!(!state.set_active_cache(Some(cache)));
        assert!(!rx.has_changed().unwrap());

        state.reload_active_cache();
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn key_and_viewer_update_independently() {
        let state = BrowserState::new(ViewerKind::Json);

        assert!(state.select_key(Some("alpha".to_string())));
        assert_eq!(
            state.selection(),
            Selection::new(Some("alpha".to_string()), ViewerKind::Json)
        );

        assert!(state.set_viewer(ViewerKind::Image));
        assert!(!state.set_viewer(ViewerKind::Image));
        assert_eq!(
            state.selection(),
            Selection::new(Some("alpha".to_string()), ViewerKind::Image)
        );

        assert!(state.select_key(None));
        assert_eq!(state.selection().viewer, ViewerKind::Image);
    }

    #[test]
    fn filter_text_is_idempotent() {
        let state = BrowserState::default();
        assert!(state.set_filter_text("Alpha"));
        assert!(!state.set_filter_text("Alpha"));
        assert_eq!(state.filter_text(), "Alpha");
    }
}
