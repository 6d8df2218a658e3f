//! Logging setup for the job: console output plus a daily rolling file.

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::LogSettings;

/// Initialize the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter. The returned guard
/// flushes the file writer when dropped, so keep it alive until the process
/// is about to exit.
pub fn init(config: &LogSettings) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(&config.dir)
        .with_context(|| format!("Failed to create log directory {:?}", config.dir))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_filter(env_filter.clone())
        .boxed();

    let file_appender = tracing_appender::rolling::daily(&config.dir, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = if config.json {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(vec![console_layer, file_layer])
        .try_init()
        .context("Logging was already initialized")?;

    tracing::info!(
        log_dir = %config.dir.display(),
        file_prefix = %config.file_prefix,
        json = config.json,
        "Logging system initialized"
    );

    Ok(guard)
}
