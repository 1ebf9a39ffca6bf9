use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use chartwatch_core::{FilterSpec, Settings};
use chartwatch_renderer::HelmEngine;

use crate::error::{io_err, WatcherError};
use crate::pipeline::{CycleOutcome, CycleReport, Pipeline, RunSummary};
use crate::watch::WatchSet;

/// Everything a watch run needs, resolved from startup configuration.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub engine: HelmEngine,
    pub filter: FilterSpec,
    /// Chart, value files and extra paths to watch.
    pub paths: Vec<PathBuf>,
}

impl From<Settings> for WatchOptions {
    fn from(settings: Settings) -> Self {
        let paths = settings.watched_paths();
        Self {
            engine: HelmEngine::new(settings.request).with_program(settings.program),
            filter: settings.filter,
            paths,
        }
    }
}

/// Start the watch loop and block the current thread until it exits.
pub fn start_blocking(options: WatchOptions) -> Result<RunSummary, WatcherError> {
    init_tracing();
    build_runtime()?.block_on(run(options))
}

/// Render once to stdout and block until done.
pub fn render_once_blocking(options: WatchOptions) -> Result<Option<CycleReport>, WatcherError> {
    init_tracing();
    build_runtime()?.block_on(render_once(options))
}

/// Watch `options.paths` and re-render on change until ctrl-c or SIGTERM.
pub async fn run(options: WatchOptions) -> Result<RunSummary, WatcherError> {
    let watch_set = WatchSet::expand(&options.paths)?;
    let mut changes = watch_set.subscribe()?;
    tracing::info!(
        chart = %options.engine.request().chart.display(),
        engine = %options.engine.program().display(),
        filters = %options.filter,
        watched = watch_set.len(),
        "watching chart for changes",
    );

    let cancel = CancellationToken::new();
    let signal_handle = tokio::spawn(cancel_on_signal(cancel.clone()));

    let mut pipeline = Pipeline::new(options.engine, options.filter, tokio::io::stdout());
    let result = pipeline.run(&mut changes, &cancel).await;

    cancel.cancel();
    let _ = signal_handle.await;
    changes.close();
    result
}

/// One cycle to stdout. A failed render is an error; `None` means the
/// render was interrupted by a shutdown signal.
pub async fn render_once(options: WatchOptions) -> Result<Option<CycleReport>, WatcherError> {
    let cancel = CancellationToken::new();
    let signal_handle = tokio::spawn(cancel_on_signal(cancel.clone()));

    let mut pipeline = Pipeline::new(options.engine, options.filter, tokio::io::stdout());
    let outcome = pipeline.run_once(&cancel).await;

    cancel.cancel();
    let _ = signal_handle.await;
    match outcome? {
        CycleOutcome::Emitted(report) => Ok(Some(report)),
        CycleOutcome::Failed(err) => Err(err.into()),
        CycleOutcome::Cancelled => Ok(None),
    }
}

async fn cancel_on_signal(cancel: CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        signal = shutdown_signal() => match signal {
            Ok(name) => {
                tracing::info!(signal = name, "exiting");
                cancel.cancel();
            }
            Err(err) => {
                tracing::warn!(error = %err, "signal handler unavailable");
                cancel.cancelled().await;
            }
        },
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "ctrl-c"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}

fn build_runtime() -> Result<tokio::runtime::Runtime, WatcherError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))
}

/// Install the stderr subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
