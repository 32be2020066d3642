use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ragstore_core::config::{expand_path, LoggingConfig};

/// Install the global subscriber: stderr always, plus `logs/log_<timestamp>.log`
/// when file logging is on. The returned guard flushes the file on drop.
pub fn init_tracing(cfg: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .with_context(|| format!("invalid log filter '{}'", cfg.level))?;
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if !cfg.to_file {
        tracing_subscriber::registry().with(env_filter).with(stderr_layer).try_init()?;
        return Ok(None);
    }

    let dir = expand_path(&cfg.dir);
    std::fs::create_dir_all(&dir).with_context(|| format!("cannot create log directory {}", dir.display()))?;
    let file_name = format!("log_{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, file_name));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()?;
    Ok(Some(guard))
}
