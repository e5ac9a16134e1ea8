use log::{debug, error, info};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::task::{cancel_slot, lock_tasks, start_in_slot};
use crate::{
    ActiveCache, BrowserState, CacheError, Generation, GenerationCounter, KeySet, Observable,
    SharedTasks, TaskId, TaskKind, TaskSlot,
};

/// Progress of the key enumeration for the active cache.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyLoadStatus {
    #[default]
    NoCache,
    Loading {
        generation: Generation,
    },
    Ready {
        count: usize,
    },
    Failed {
        message: String,
    },
}

impl KeyLoadStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, KeyLoadStatus::Loading { .. })
    }
}

/// Owns the key set of the active cache.
///
/// Every cache change (or reload) starts a new enumeration on the blocking
/// pool. Only the newest enumeration may replace the key set; results of
/// superseded ones are dropped when they arrive.
pub struct KeySource {
    keys: Observable<KeySet>,
    status: Observable<KeyLoadStatus>,
    driver: JoinHandle<()>,
}

impl KeySource {
    pub fn spawn(runtime: &Handle, state: &BrowserState, tasks: SharedTasks) -> Self {
        let (keys_tx, keys) = watch::channel(KeySet::empty());
        let (status_tx, status) = watch::channel(KeyLoadStatus::NoCache);
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        let driver = KeySourceDriver {
            runtime: runtime.clone(),
            cache_rx: state.subscribe_active_cache(),
            keys_tx,
            status_tx,
            tasks,
            slot: TaskSlot::new(),
            generations: GenerationCounter::new(),
            done_tx,
            done_rx,
        };

        Self {
            keys,
            status,
            driver: runtime.spawn(driver.run()),
        }
    }

    pub fn keys(&self) -> Observable<KeySet> {
        self.keys.clone()
    }

    pub fn status(&self) -> Observable<KeyLoadStatus> {
        self.status.clone()
    }

    pub fn snapshot(&self) -> KeySet {
        self.keys.borrow().clone()
    }
}

impl Drop for KeySource {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

struct ScanDone {
    generation: Generation,
    task_id: TaskId,
    location: String,
    result: Option<Result<Vec<String>, CacheError>>,
}

struct KeySourceDriver {
    runtime: Handle,
    cache_rx: Observable<Option<ActiveCache>>,
    keys_tx: watch::Sender<KeySet>,
    status_tx: watch::Sender<KeyLoadStatus>,
    tasks: SharedTasks,
    slot: TaskSlot,
    generations: GenerationCounter,
    done_tx: mpsc::UnboundedSender<ScanDone>,
    done_rx: mpsc::UnboundedReceiver<ScanDone>,
}

impl KeySourceDriver {
    async fn run(mut self) {
        self.reload();

        loop {
            tokio::select! {
                changed = self.cache_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.reload();
                }
                Some(done) = self.done_rx.recv() => self.apply(done),
            }
        }

        cancel_slot(&self.tasks, &mut self.slot);
    }

    fn reload(&mut self) {
        let cache = self.cache_rx.borrow_and_update().clone();
        let generation = self.generations.advance();

        let Some(cache) = cache else {
            cancel_slot(&self.tasks, &mut self.slot);
            self.keys_tx.send_replace(KeySet::empty());
            self.status_tx.send_replace(KeyLoadStatus::NoCache);
            return;
        };

        let location = cache.location();
        let (task_id, cancel_token) = start_in_slot(
            &self.tasks,
            &mut self.slot,
            TaskKind::KeyScan,
            format!("SCAN {}", location),
        );
        self.status_tx
            .send_replace(KeyLoadStatus::Loading { generation });

        debug!("Enumerating keys of {} ({})", location, generation);

        let handle = cache.handle();
        let done_tx = self.done_tx.clone();
        let runtime = self.runtime.clone();

        self.runtime.spawn(async move {
            let scan = runtime.spawn_blocking(move || {
                if cancel_token.is_cancelled() {
                    return None;
                }
                Some(handle.list_keys())
            });

            let result = match scan.await {
                Ok(result) => result,
                Err(join_error) => Some(Err(CacheError::enumeration(format!(
                    "key enumeration task failed: {}",
                    join_error
                )))),
            };

            let _ = done_tx.send(ScanDone {
                generation,
                task_id,
                location,
                result,
            });
        });
    }

    fn apply(&mut self, done: ScanDone) {
        if !self.generations.is_current(done.generation) {
            debug!(
                "Discarding stale key enumeration of {} ({}, current {})",
                done.location,
                done.generation,
                self.generations.current()
            );
            return;
        }

        let finished = self.slot.take_if(done.task_id).is_some();

        match done.result {
            Some(Ok(keys)) => {
                if finished {
                    lock_tasks(&self.tasks).complete(done.task_id);
                }

                let count = keys.len();
                info!("Loaded {} keys from {}", count, done.location);

                self.keys_tx.send_replace(KeySet::new(keys));
                self.status_tx.send_replace(KeyLoadStatus::Ready { count });
            }
            Some(Err(error)) => {
                if finished {
                    lock_tasks(&self.tasks).fail(done.task_id, error.to_string());
                }

                error!("Failed to enumerate keys of {}: {}", done.location, error);

                self.keys_tx.send_replace(KeySet::empty());
                self.status_tx.send_replace(KeyLoadStatus::Failed {
                    message: error.to_string(),
                });
            }
            None => {
                debug!("Key enumeration of {} was skipped", done.location);
            }
        }
    }
}
