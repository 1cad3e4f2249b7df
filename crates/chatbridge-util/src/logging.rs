use chrono::Local;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Keeps the file writer alive. Dropping it flushes and stops background
/// logging, so `main` holds it until exit.
pub struct LogHandle {
    pub path: Option<PathBuf>,
    _guard: Option<WorkerGuard>,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Timestamped log file path inside `log_dir`.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%dT%H%M%S").to_string();
    log_dir.join(format!("chatbridge-{}.log", timestamp))
}

/// Installs the global subscriber.
///
/// With `print` set, events go to stderr. Otherwise they go to a fresh
/// timestamped file in `log_dir` (current directory when `None`). If the file
/// cannot be opened the subscriber falls back to stderr.
pub fn init_tracing(log_dir: Option<PathBuf>, print: bool) -> LogHandle {
    if print {
        let _ = tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init();
        return LogHandle {
            path: None,
            _guard: None,
        };
    }

    let log_dir = log_dir.unwrap_or_else(|| PathBuf::from("."));
    let log_path = log_file_path(&log_dir);
    let _ = std::fs::create_dir_all(&log_dir);

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path);

    match file {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
                .try_init();
            LogHandle {
                path: Some(log_path),
                _guard: Some(guard),
            }
        }
        Err(error) => {
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init();
            tracing::warn!(%error, path = %log_path.display(), "failed to open log file, logging to stderr");
            LogHandle {
                path: None,
                _guard: None,
            }
        }
    }
}
