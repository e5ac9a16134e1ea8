use std::sync::Arc;

use log::{debug, error, warn};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::task::{cancel_slot, lock_tasks, start_in_slot};
use crate::viewer::decode_with_fallback;
use crate::{
    ActiveCache, BrowserState, CacheError, CacheHandle, Generation, GenerationCounter,
    Observable, Selection, SharedTasks, TaskId, TaskKind, TaskSlot, ViewerKind, ViewerModel,
    truncate_string_safe,
};

/// Where the current resolution cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolvePhase {
    /// Nothing to resolve: no key selected or no cache open.
    #[default]
    Idle,
    Fetching,
    Decoded,
    /// The key vanished or the cache failed; there is no model.
    FetchFailed,
    /// The bytes did not suit the viewer; the model is the viewer's fallback.
    DecodeFailed,
}

impl ResolvePhase {
    pub fn is_settled(self) -> bool {
        !matches!(self, ResolvePhase::Fetching)
    }
}

/// Published state of the value pane.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueSnapshot {
    pub generation: Generation,
    pub key: Option<String>,
    pub viewer: ViewerKind,
    pub phase: ResolvePhase,
    pub model: Option<Arc<ViewerModel>>,
    pub error: Option<String>,
}

impl ValueSnapshot {
    fn new(generation: Generation, selection: &Selection, phase: ResolvePhase) -> Self {
        Self {
            generation,
            key: selection.key.clone(),
            viewer: selection.viewer,
            phase,
            model: None,
            error: None,
        }
    }

    pub fn model(&self) -> Option<&ViewerModel> {
        self.model.as_deref()
    }
}

/// Resolves the selected key into a decoded model for the selected viewer.
///
/// Any change of key, viewer or active cache starts a new cycle; a fetch that
/// completes after it was superseded is dropped, so a slow lookup for a key
/// the user already moved away from never overwrites the current value.
pub struct ValueResolver {
    value: Observable<ValueSnapshot>,
    driver: JoinHandle<()>,
}

impl ValueResolver {
    pub fn spawn(runtime: &Handle, state: &BrowserState, tasks: SharedTasks) -> Self {
        let (value_tx, value) = watch::channel(ValueSnapshot::default());
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        let driver = ValueResolverDriver {
            runtime: runtime.clone(),
            selection_rx: state.subscribe_selection(),
            cache_rx: state.subscribe_active_cache(),
            value_tx,
            tasks,
            slot: TaskSlot::new(),
            generations: GenerationCounter::new(),
            pending: None,
            done_tx,
            done_rx,
        };

        Self {
            value,
            driver: runtime.spawn(driver.run()),
        }
    }

    pub fn value(&self) -> Observable<ValueSnapshot> {
        self.value.clone()
    }

    pub fn snapshot(&self) -> ValueSnapshot {
        self.value.borrow().clone()
    }
}

impl Drop for ValueResolver {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

enum FetchOutcome {
    Decoded(ViewerModel),
    DecodeFailed(ViewerModel, CacheError),
    FetchFailed(CacheError),
}

struct FetchDone {
    generation: Generation,
    task_id: TaskId,
    outcome: Option<FetchOutcome>,
}

struct ValueResolverDriver {
    runtime: Handle,
    selection_rx: Observable<Selection>,
    cache_rx: Observable<Option<ActiveCache>>,
    value_tx: watch::Sender<ValueSnapshot>,
    tasks: SharedTasks,
    slot: TaskSlot,
    generations: GenerationCounter,
    pending: Option<Selection>,
    done_tx: mpsc::UnboundedSender<FetchDone>,
    done_rx: mpsc::UnboundedReceiver<FetchDone>,
}

impl ValueResolverDriver {
    async fn run(mut self) {
        self.resolve();

        loop {
            tokio::select! {
                changed = self.selection_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.resolve();
                }
                changed = self.cache_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.resolve();
                }
                Some(done) = self.done_rx.recv() => self.apply(done),
            }
        }

        cancel_slot(&self.tasks, &mut self.slot);
    }

    fn resolve(&mut self) {
        let selection = self.selection_rx.borrow_and_update().clone();
        let cache = self.cache_rx.borrow_and_update().clone();
        let generation = self.generations.advance();

        let (Some(key), Some(cache)) = (selection.key.clone(), cache) else {
            cancel_slot(&self.tasks, &mut self.slot);
            self.pending = None;
            self.value_tx
                .send_replace(ValueSnapshot::new(generation, &selection, ResolvePhase::Idle));
            return;
        };

        let viewer = selection.viewer;
        let (task_id, cancel_token) = start_in_slot(
            &self.tasks,
            &mut self.slot,
            TaskKind::KeyGet,
            format!("GET {}", truncate_string_safe(&key, 60)),
        );

        self.value_tx.send_replace(ValueSnapshot::new(
            generation,
            &selection,
            ResolvePhase::Fetching,
        ));
        self.pending = Some(selection);

        debug!("Resolving {:?} as {} ({})", key, viewer, generation);

        let handle = cache.handle();
        let done_tx = self.done_tx.clone();
        let runtime = self.runtime.clone();

        self.runtime.spawn(async move {
            let fetch = runtime.spawn_blocking(move || {
                if cancel_token.is_cancelled() {
                    return None;
                }
                Some(fetch_and_decode(handle.as_ref(), &key, viewer))
            });

            let outcome = match fetch.await {
                Ok(outcome) => outcome,
                Err(join_error) => Some(FetchOutcome::FetchFailed(CacheError::fetch(format!(
                    "value fetch task failed: {}",
                    join_error
                )))),
            };

            let _ = done_tx.send(FetchDone {
                generation,
                task_id,
                outcome,
            });
        });
    }

    fn apply(&mut self, done: FetchDone) {
        if !self.generations.is_current(done.generation) {
            debug!(
                "Discarding stale value fetch ({}, current {})",
                done.generation,
                self.generations.current()
            );
            return;
        }

        let Some(selection) = self.pending.take() else {
            return;
        };
        let key = selection.key.clone().unwrap_or_default();
        let finished = self.slot.take_if(done.task_id).is_some();

        let outcome = done.outcome.unwrap_or_else(|| {
            FetchOutcome::FetchFailed(CacheError::fetch("value fetch was skipped"))
        });

        let mut snapshot = ValueSnapshot::new(done.generation, &selection, ResolvePhase::Idle);

        match outcome {
            FetchOutcome::Decoded(model) => {
                if finished {
                    lock_tasks(&self.tasks).complete(done.task_id);
                }
                snapshot.phase = ResolvePhase::Decoded;
                snapshot.model = Some(Arc::new(model));
            }
            FetchOutcome::DecodeFailed(model, error) => {
                if finished {
                    lock_tasks(&self.tasks).complete(done.task_id);
                }
                warn!(
                    "Showing fallback for {:?} in {} viewer: {}",
                    key, selection.viewer, error
                );
                snapshot.phase = ResolvePhase::DecodeFailed;
                snapshot.model = Some(Arc::new(model));
                snapshot.error = Some(error.to_string());
            }
            FetchOutcome::FetchFailed(error) => {
                if finished {
                    lock_tasks(&self.tasks).fail(done.task_id, error.to_string());
                }
                match &error {
                    CacheError::NotFound(_) => warn!("Value for {:?} not found", key),
                    _ => error!("Failed to fetch value for {:?}: {}", key, error),
                }
                snapshot.phase = ResolvePhase::FetchFailed;
                snapshot.error = Some(error.to_string());
            }
        }

        self.value_tx.send_replace(snapshot);
    }
}

fn fetch_and_decode(handle: &dyn CacheHandle, key: &str, viewer: ViewerKind) -> FetchOutcome {
    let bytes = match handle.get_value(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return FetchOutcome::FetchFailed(CacheError::NotFound(key.to_string())),
        Err(error) => return FetchOutcome::FetchFailed(error),
    };

    match decode_with_fallback(viewer, &bytes) {
        (model, None) => FetchOutcome::Decoded(model),
        (model, Some(error)) => FetchOutcome::DecodeFailed(model, error),
    }
}
