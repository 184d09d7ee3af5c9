use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::infra::config::LoggingConfig;

pub const LOG_FILE_NAME: &str = "search-mcp.log";

/// Initialize tracing once. Stdout carries the protocol, so logs go to stderr
/// and, unless disabled, to `<dir>/search-mcp.log`.
///
/// Returns the log file path when the file sink is active.
pub fn init(cfg: &LoggingConfig) -> Option<PathBuf> {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| cfg.level().to_string());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));

    let (file, file_err) = match cfg.log_dir().map(open_log_file) {
        Some(Ok((path, f))) => (Some((path, f)), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    let path = file.as_ref().map(|(p, _)| p.clone());

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let file_layer = file.map(|(_, f)| {
        fmt::layer()
            .with_writer(Mutex::new(f))
            .with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    if let Some(e) = file_err {
        tracing::warn!(error = %e, "log file unavailable; logging to stderr only");
    }
    path
}

fn open_log_file(dir: &str) -> std::io::Result<(PathBuf, File)> {
    std::fs::create_dir_all(dir)?;
    let path = Path::new(dir).join(LOG_FILE_NAME);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

/// Metric-like log line; the `metrics` facade records the same values when a recorder is installed.
pub fn log_metric(tool: &str, metric: &str, value: f64) {
    tracing::info!(tool = tool, metric = metric, value = value, "metric");
}
