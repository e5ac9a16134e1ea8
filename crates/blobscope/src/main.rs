mod cli;
mod command;
mod render;
mod shell;

use std::sync::Arc;

use blobscope_core::{AppConfig, AppConfigStore, CacheBrowser, RecentCachesStore};
use blobscope_driver_sqlite::SqliteCacheOpener;
use cli::Launch;
use log::{info, warn};
use shell::Shell;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let initial = match cli::parse_args(&args) {
        Ok(Launch::Browse(initial)) => initial,
        Ok(Launch::Help) => {
            println!("{}", cli::USAGE);
            return;
        }
        Err(message) => {
            eprintln!("{}\n\n{}", message, cli::USAGE);
            std::process::exit(2);
        }
    };

    let (config, config_error) = load_config();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter_or_default()),
    )
    .format_timestamp_millis()
    .init();

    if let Some(error) = config_error {
        warn!("Using default settings: {}", error);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("blobscope-worker")
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("Failed to start runtime: {}", error);
            std::process::exit(1);
        }
    };

    let recent = match RecentCachesStore::new(config.max_recent_caches) {
        Ok(store) => store,
        Err(error) => {
            warn!("Recent caches will not be remembered: {}", error);
            RecentCachesStore::from_path(
                std::env::temp_dir().join("blobscope-recent.json"),
                config.max_recent_caches,
            )
        }
    };

    runtime.block_on(async move {
        let browser = CacheBrowser::new(&tokio::runtime::Handle::current(), config.default_viewer);
        let opener = Arc::new(SqliteCacheOpener::new());

        info!("blobscope started (default viewer: {})", config.default_viewer);

        Shell::new(browser, opener, recent).run(initial).await;
    });
}

fn load_config() -> (AppConfig, Option<String>) {
    let loaded = AppConfigStore::new().and_then(|store| store.load());

    match loaded {
        Ok(config) => (config, None),
        Err(error) => (AppConfig::default(), Some(error.to_string())),
    }
}
