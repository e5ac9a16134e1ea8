mod app_config;
mod browser;
mod browser_state;
mod error;
mod filtered_view;
mod key_set;
mod key_source;
mod open_cache;
mod property;
mod recent_caches;
mod task;
mod traits;
mod value_resolver;
mod viewer;

pub use app_config::{AppConfig, AppConfigStore, app_config_dir};
pub use browser::CacheBrowser;
pub use browser_state::{ActiveCache, BrowserState, Selection};
pub use error::CacheError;
pub use filtered_view::FilteredView;
pub use key_set::{KeyFilter, KeySet};
pub use key_source::{KeyLoadStatus, KeySource};
pub use open_cache::{CacheLayout, OpenCacheRequest, cache_title};
pub use property::{Observable, Property};
pub use recent_caches::{RecentCache, RecentCachesStore};
pub use task::{
    CancelToken, Generation, GenerationCounter, MAX_FINISHED_TASKS, SharedTasks, TaskId,
    TaskKind, TaskManager, TaskSlot, TaskSnapshot, TaskStatus, lock_tasks,
};
pub use traits::{CacheHandle, CacheOpener};
pub use value_resolver::{ResolvePhase, ValueResolver, ValueSnapshot};
pub use viewer::{
    DecodedImage, ImageModel, JsonModel, ParseViewerKindError, ViewerKind, ViewerModel, decode,
    decode_strict, decode_with_fallback,
};

/// Safely truncate a string at a character boundary, appending "..." if truncated.
pub fn truncate_string_safe(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    let truncate_at = max_len.saturating_sub(3);
    let safe_end = s
        .char_indices()
        .take_while(|(idx, _)| *idx <= truncate_at)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0);

    format!("{}...", &s[..safe_end])
}
