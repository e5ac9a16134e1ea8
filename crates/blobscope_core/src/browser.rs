use std::sync::{Arc, Mutex};

use log::{error, info};
use tokio::runtime::Handle;

use crate::task::lock_tasks;
use crate::{
    ActiveCache, BrowserState, CacheError, CacheHandle, CacheOpener, FilteredView,
    KeyLoadStatus, KeySet, KeySource, Observable, OpenCacheRequest, Selection, SharedTasks,
    TaskKind, TaskManager, ValueResolver, ValueSnapshot, ViewerKind,
};

/// The browsing pipeline: inputs, the three derived views, and the task
/// registry they report to.
///
/// Must be created from within a tokio runtime; the components run as tasks on
/// `runtime` and stop when the browser is dropped.
pub struct CacheBrowser {
    runtime: Handle,
    state: BrowserState,
    tasks: SharedTasks,
    default_viewer: ViewerKind,
    key_source: KeySource,
    filtered_view: FilteredView,
    value_resolver: ValueResolver,
}

impl CacheBrowser {
    pub fn new(runtime: &Handle, default_viewer: ViewerKind) -> Self {
        let state = BrowserState::new(default_viewer);
        let tasks: SharedTasks = Arc::new(Mutex::new(TaskManager::new()));

        let key_source = KeySource::spawn(runtime, &state, tasks.clone());
        let filtered_view = FilteredView::spawn(runtime, &state, key_source.keys());
        let value_resolver = ValueResolver::spawn(runtime, &state, tasks.clone());

        Self {
            runtime: runtime.clone(),
            state,
            tasks,
            default_viewer,
            key_source,
            filtered_view,
            value_resolver,
        }
    }

    pub fn state(&self) -> &BrowserState {
        &self.state
    }

    pub fn tasks(&self) -> SharedTasks {
        self.tasks.clone()
    }

    // -- Inputs --

    /// Swap the cache being browsed. Selection and filter are left untouched.
    pub fn set_active_cache(&self, handle: Option<Arc<dyn CacheHandle>>, title: Option<String>) {
        self.state
            .set_active_cache(handle.map(|handle| ActiveCache::new(handle, title)));
    }

    pub fn set_filter_text(&self, text: impl Into<String>) -> bool {
        self.state.set_filter_text(text)
    }

    pub fn select_key(&self, key: Option<String>) -> bool {
        self.state.select_key(key)
    }

    pub fn set_viewer(&self, viewer: ViewerKind) -> bool {
        self.state.set_viewer(viewer)
    }

    /// Enumerate the active cache again and re-fetch the selected value.
    pub fn refresh(&self) {
        self.state.reload_active_cache();
    }

    pub fn title(&self) -> Option<String> {
        self.state
            .active_cache()
            .and_then(|cache| cache.title().map(str::to_string))
    }

    pub fn selection(&self) -> Selection {
        self.state.selection()
    }

    // -- Outputs --

    pub fn keys(&self) -> Observable<KeySet> {
        self.key_source.keys()
    }

    pub fn key_status(&self) -> Observable<KeyLoadStatus> {
        self.key_source.status()
    }

    pub fn filtered_keys(&self) -> Observable<KeySet> {
        self.filtered_view.filtered()
    }

    pub fn value(&self) -> Observable<ValueSnapshot> {
        self.value_resolver.value()
    }

    pub fn status_message(&self) -> Option<String> {
        lock_tasks(&self.tasks).current_status_message()
    }

    // -- Open cache flow --

    /// Validate and open a cache, then make it the active one.
    ///
    /// On success the browser starts over on the new cache: no selected key,
    /// empty filter, default viewer. On failure the current cache stays active.
    pub async fn open_cache(
        &self,
        opener: Arc<dyn CacheOpener>,
        request: OpenCacheRequest,
    ) -> Result<Arc<dyn CacheHandle>, CacheError> {
        let (task_id, _) = lock_tasks(&self.tasks).start(
            TaskKind::OpenCache,
            format!("Open {}", request.path.display()),
        );

        let path = request.path.clone();
        let title = request.title();

        match open_on_worker(&self.runtime, opener, request).await {
            Ok(handle) => {
                lock_tasks(&self.tasks).complete(task_id);
                info!("Opened cache {}", path.display());

                self.state
                    .set_selection(Selection::new(None, self.default_viewer));
                self.state.set_filter_text(String::new());
                self.set_active_cache(Some(handle.clone()), title);

                Ok(handle)
            }
            Err(error) => {
                lock_tasks(&self.tasks).fail(task_id, error.to_string());
                error!("Unable to open cache from {}: {}", path.display(), error);
                Err(error)
            }
        }
    }
}

async fn open_on_worker(
    runtime: &Handle,
    opener: Arc<dyn CacheOpener>,
    request: OpenCacheRequest,
) -> Result<Arc<dyn CacheHandle>, CacheError> {
    request.validate()?;

    runtime
        .spawn_blocking(move || opener.open(&request))
        .await
        .map_err(|e| CacheError::IoError(std::io::Error::other(e.to_string())))?
}
