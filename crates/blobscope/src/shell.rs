use std::io::BufRead;
use std::sync::Arc;

use blobscope_core::{
    CacheBrowser, CacheOpener, KeyLoadStatus, KeySet, Observable, OpenCacheRequest,
    RecentCachesStore, ResolvePhase, ValueSnapshot, lock_tasks,
};
use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::command::{Command, HELP, parse_command};
use crate::render;

const RECENT_TASKS_SHOWN: usize = 5;

/// The interactive front end.
///
/// Runs on the main task and is the only place that prints: observable updates
/// and command results are handled one at a time, in arrival order.
pub struct Shell {
    browser: CacheBrowser,
    opener: Arc<dyn CacheOpener>,
    recent: RecentCachesStore,
    keys_rx: Observable<KeySet>,
    status_rx: Observable<KeyLoadStatus>,
    filtered_rx: Observable<KeySet>,
    value_rx: Observable<ValueSnapshot>,
}

impl Shell {
    pub fn new(
        browser: CacheBrowser,
        opener: Arc<dyn CacheOpener>,
        recent: RecentCachesStore,
    ) -> Self {
        let keys_rx = browser.keys();
        let status_rx = browser.key_status();
        let filtered_rx = browser.filtered_keys();
        let value_rx = browser.value();

        Self {
            browser,
            opener,
            recent,
            keys_rx,
            status_rx,
            filtered_rx,
            value_rx,
        }
    }

    pub async fn run(mut self, initial: Option<OpenCacheRequest>) {
        if let Some(request) = initial {
            self.open(request).await;
        } else {
            println!("No cache open. Type 'open <path>' or 'help'.");
        }

        let mut lines = spawn_stdin_reader();

        loop {
            tokio::select! {
                line = lines.recv() => {
                    let Some(line) = line else {
                        debug!("stdin closed");
                        break;
                    };
                    if !self.handle_line(&line).await {
                        break;
                    }
                }
                changed = self.status_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let status = self.status_rx.borrow_and_update().clone();
                    if !status.is_loading() {
                        println!("{}", render::key_status_line(&status));
                    }
                }
                changed = self.filtered_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let filtered = self.filtered_rx.borrow_and_update().clone();
                    let total = self.keys_rx.borrow().len();
                    println!("{}", render::filtered_summary(&filtered, total));
                }
                changed = self.value_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = self.value_rx.borrow_and_update().clone();
                    if snapshot.phase != ResolvePhase::Fetching
                        && let Some(pane) = render::value_pane(&snapshot)
                    {
                        println!("{}", pane);
                    }
                }
            }
        }

        info!("Shell finished");
    }

    /// Returns false when the shell should exit.
    async fn handle_line(&mut self, line: &str) -> bool {
        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return true,
            Err(error) => {
                println!("{}", error);
                return true;
            }
        };

        match command {
            Command::Open(request) => self.open(request).await,
            Command::Filter(text) => {
                if !self.browser.set_filter_text(text) {
                    println!("{}", render::key_list(&self.filtered_rx.borrow()));
                }
            }
            Command::Select(key) => {
                if !self.browser.select_key(key) {
                    self.print_value();
                }
            }
            Command::Viewer(viewer) => {
                if !self.browser.set_viewer(viewer) {
                    self.print_value();
                }
            }
            Command::Keys => println!("{}", render::key_list(&self.filtered_rx.borrow())),
            Command::Refresh => self.browser.refresh(),
            Command::Recent => println!("{}", render::recent_list(self.recent.entries())),
            Command::Status => self.print_status(),
            Command::Help => println!("{}", HELP),
            Command::Quit => return false,
        }

        true
    }

    async fn open(&mut self, request: OpenCacheRequest) {
        let path = request.path.clone();
        let layout = request.layout;

        match self.browser.open_cache(self.opener.clone(), request).await {
            Ok(_) => {
                println!(
                    "Opened {}",
                    self.browser.title().unwrap_or_else(|| path.display().to_string())
                );
                self.recent.record_open(path, layout);
            }
            Err(error) => {
                warn!("Open of {} rejected: {}", path.display(), error);
                println!("Unable to open cache from {}: {}", path.display(), error);
            }
        }
    }

    fn print_value(&self) {
        let snapshot = self.value_rx.borrow().clone();
        if let Some(pane) = render::value_pane(&snapshot) {
            println!("{}", pane);
        }
    }

    fn print_status(&self) {
        let selection = self.browser.selection();
        let title = self.browser.title().unwrap_or_else(|| "-".to_string());

        println!("Cache:  {} ({})", title, self.opener.display_name());
        println!("Keys:   {}", render::key_status_line(&self.status_rx.borrow()));
        println!(
            "Filter: {:?} -> {}",
            self.browser.state().filter_text(),
            render::filtered_summary(&self.filtered_rx.borrow(), self.keys_rx.borrow().len())
        );
        println!(
            "Select: {} as {}",
            selection.key.as_deref().unwrap_or("-"),
            selection.viewer
        );

        let tasks = self.browser.tasks();
        let (message, recent) = {
            let manager = lock_tasks(&tasks);
            (
                manager.current_status_message(),
                manager.recent_tasks(RECENT_TASKS_SHOWN),
            )
        };
        println!("Tasks:  {}", message.unwrap_or_else(|| "idle".to_string()));
        if !recent.is_empty() {
            println!("{}", render::task_list(&recent));
        }
    }
}

/// Forward stdin lines to the shell from a dedicated thread.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    warn!("Failed to read stdin: {}", error);
                    break;
                }
            }
        }
    });

    rx
}
