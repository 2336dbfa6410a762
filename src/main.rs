use std::sync::Arc;

use dme_engine::metrics;
use dme_engine::utils::file_io;
use dme_engine::Dn;
use dme_engine::DmeConfig;
use dme_engine::DmeHandler;
use dme_engine::DmeManagerBuilder;
use dme_engine::DmeObject;
use dme_engine::LogConfig;
use dme_engine::Result;
use dme_engine::SystemError;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

/// Writes every delivered event to the daemon log
struct LoggingHandler;

impl DmeHandler for LoggingHandler {
    fn on_object_event(
        &self,
        obj: &mut DmeObject,
    ) -> bool {
        let kind = obj.event().map(|k| k.as_str()).unwrap_or("none");
        let mut changed = Vec::new();
        let mut first = true;
        while let Some(name) = obj.iterate_changed_properties(first) {
            changed.push(name);
            first = false;
        }
        match obj.data_json() {
            Ok(json) => info!(kind, download = obj.is_download(), ?changed, "{}", json),
            Err(e) => error!(dn = %obj.dn(), "Failed to render object: {:?}", e),
        }
        true
    }

    fn on_download_done(
        &self,
        dn: &Dn,
    ) {
        info!(dn = %dn, "Download done");
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let mut config = DmeConfig::new()?;
    if let Some(path) = std::env::args().nth(1) {
        config = config.with_override_config(&path)?;
    }
    let config = config.validate()?;

    // Initializing Logs
    let _guard = init_observability(&config.log)?;

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    let manager = DmeManagerBuilder::new(config.clone())
        .handler(Arc::new(LoggingHandler))
        .build()?;

    if let Some(seed) = &config.store.seed_path {
        manager.import_file(seed).await?;
    }

    for spec in &config.log.watch {
        manager.watch(&spec.dn, &spec.pattern, spec.download)?;
        info!(dn = %spec.dn, pattern = %spec.pattern, download = spec.download, "Watching");
    }

    if config.monitoring.prometheus_enabled {
        let port = config.monitoring.prometheus_port;
        let shutdown_signal = graceful_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = metrics::start_server(port, shutdown_signal).await {
                error!("Metrics server stops. {:?}", e);
            }
        });
    }

    info!(objects = manager.len(), "Application started. Waiting for CTRL+C signal...");
    if let Err(e) = graceful_shutdown(graceful_tx).await {
        error!("Failed to shutdown: {:?}", e);
    }

    manager.shutdown().await?;
    info!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(SystemError::Io)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(SystemError::Io)?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        SystemError::SignalSendFailed(format!("Failed to send shutdown signal: {}", e))
    })?;

    info!("Shutdown signal sent");
    Ok(())
}

pub fn init_observability(log: &LogConfig) -> Result<WorkerGuard> {
    let log_file = file_io::open_file_for_append(&log.log_dir.join(&log.log_file))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
