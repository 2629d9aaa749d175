use std::path::PathBuf;
use std::sync::Arc;

use ember_offline::{ClientSurface, HttpFetcher};
use ember_shell::{HttpDownloadSource, Shell, ShellConfig};

/// Headless surface: notifications and focus requests go to the log until
/// a window layer is attached.
struct LogSurface;

impl ClientSurface for LogSurface {
    fn show_notification(&self, title: &str, body: &str) {
        log::info!("notification: {}: {}", title, body);
    }

    fn focus_root(&self) {
        log::info!("focus requested at root location");
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    log::info!("Starting Ember Shell v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ShellConfig::default();
    if let Ok(dir) = std::env::var("EMBER_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }

    let shell = match Shell::bootstrap(
        config,
        Arc::new(HttpFetcher::new()),
        Arc::new(HttpDownloadSource::new()),
        Arc::new(LogSurface),
    )
    .await
    {
        Ok(shell) => shell,
        Err(e) => {
            log::error!("startup failed: {}", e);
            std::process::exit(1);
        }
    };

    log::info!(
        "{} tab(s) open, cache controller {:?}",
        shell.session().len(),
        shell.controller().phase()
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("signal handling failed: {}", e);
    }
    log::info!("shutting down");
}
