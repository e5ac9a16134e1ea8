use log::debug;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::property::publish_if_changed;
use crate::{BrowserState, KeyFilter, KeySet, Observable};

/// Keys of the active cache that pass the current filter.
///
/// Recomputed from scratch whenever the key set or the filter text changes.
/// Recomputations run one after another on the driver task, and a result equal
/// to the previous one is not republished.
pub struct FilteredView {
    filtered: Observable<KeySet>,
    driver: JoinHandle<()>,
}

impl FilteredView {
    pub fn spawn(runtime: &Handle, state: &BrowserState, keys: Observable<KeySet>) -> Self {
        let (filtered_tx, filtered) = watch::channel(KeySet::empty());
        let mut driver = FilteredViewDriver {
            keys_rx: keys,
            filter_rx: state.subscribe_filter_text(),
            filtered_tx,
        };
        driver.recompute();

        Self {
            filtered,
            driver: runtime.spawn(driver.run()),
        }
    }

    pub fn filtered(&self) -> Observable<KeySet> {
        self.filtered.clone()
    }

    pub fn snapshot(&self) -> KeySet {
        self.filtered.borrow().clone()
    }
}

impl Drop for FilteredView {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

struct FilteredViewDriver {
    keys_rx: Observable<KeySet>,
    filter_rx: Observable<String>,
    filtered_tx: watch::Sender<KeySet>,
}

impl FilteredViewDriver {
    async fn run(mut self) {
        loop {
            tokio::select! {
                changed = self.keys_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = self.filter_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }

            self.recompute();
        }
    }

    fn recompute(&mut self) {
        let filter = KeyFilter::from_text(&self.filter_rx.borrow_and_update());
        let keys = self.keys_rx.borrow_and_update().clone();

        let filtered = keys.filtered(&filter);
        let count = filtered.len();

        if publish_if_changed(&self.filtered_tx, filtered) {
            debug!("Filter {:?} kept {} of {} keys", filter, count, keys.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn follows_key_and_filter_changes() {
        let state = BrowserState::default();
        let (keys_tx, keys_rx) = watch::channel(KeySet::from_iter(["alpha", "beta"]));
        let view = FilteredView::spawn(&Handle::current(), &state, keys_rx);

        assert_eq!(view.snapshot(), KeySet::from_iter(["alpha", "beta"]));

        state.set_filter_text("Alpha");
        let mut filtered = view.filtered();
        filtered
            .wait_for(|keys| *keys == KeySet::from_iter(["alpha"]))
            .await
            .expect("filtered update");

        keys_tx.send_replace(KeySet::from_iter(["ALPHA", "gamma", "alpha"]));
        filtered
            .wait_for(|keys| *keys == KeySet::from_iter(["ALPHA", "alpha"]))
            .await
            .expect("filtered update");

        state.set_filter_text("al");
        filtered
            .wait_for(|keys| keys.is_empty())
            .await
            .expect("filtered update");
    }

    #[tokio::test]
    async fn unchanged_result_is_not_republished() {
        let state = BrowserState::default();
        let (keys_tx, keys_rx) = watch::channel(KeySet::from_iter(["alpha", "beta"]));
        let view = FilteredView::spawn(&Handle::current(), &state, keys_rx);
        let mut filtered = view.filtered();
        let _ = filtered.borrow_and_update();

        state.set_filter_text("   ");
        settle().await;
        assert!(!filtered.has_changed().expect("driver alive"));

        keys_tx.send_replace(KeySet::from_iter(["alpha", "beta"]));
        settle().await;
        assert!(!filtered.has_changed().expect("driver alive"));
    }
}
