use once_cell::sync::OnceCell;
use std::path::PathBuf;

use tracing_appender::{
    non_blocking::{self, WorkerGuard},
    rolling::RollingFileAppender,
};
use tracing_subscriber::{
    filter::LevelFilter, fmt, prelude::*, reload, util::SubscriberInitExt, EnvFilter,
};

static FILE_FILTER_HANDLE: OnceCell<reload::Handle<EnvFilter, tracing_subscriber::Registry>> =
    OnceCell::new();
static _GUARD: OnceCell<WorkerGuard> = OnceCell::new(); // keep writer alive

const KEEP_ROTATED_LOGS: usize = 10;

fn log_dir() -> PathBuf {
    crate::settings::app_support_dir().join("logs")
}

/// Initialize the global subscriber. Call once at startup; `file_enabled`
/// mirrors the `debug_logs` setting.
pub fn init(file_enabled: bool) {
    let dir = log_dir();
    let _ = std::fs::create_dir_all(&dir);

    // Daily rotation; current file is app.log plus rotated copies per day.
    let file_appender: RollingFileAppender = tracing_appender::rolling::daily(dir, "app.log");
    let (nb_writer, guard): (non_blocking::NonBlocking, WorkerGuard) =
        tracing_appender::non_blocking(file_appender);
    let _ = _GUARD.set(guard);

    let console = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_line_number(true)
        .with_ansi(true);

    let file_layer = fmt::layer()
        .with_writer(nb_writer)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    // The file layer's filter is reloadable so the setting can flip at
    // runtime without restarting.
    let initial = if file_enabled {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("off")
    };
    let (reloadable_filter, handle) = reload::Layer::new(initial);
    let _ = FILE_FILTER_HANDLE.set(handle);

    tracing_subscriber::registry()
        .with(file_layer.with_filter(reloadable_filter))
        .with(console.with_filter(LevelFilter::INFO))
        .init();

    prune_old_logs();
}

/// Enable or disable file logging after startup.
pub fn set_file_logging_enabled(enabled: bool) {
    if let Some(h) = FILE_FILTER_HANDLE.get() {
        let _ = h.modify(|f| {
            *f = if enabled {
                EnvFilter::new("info")
            } else {
                EnvFilter::new("off")
            };
        });
    }
}

/// Keep only the newest rotated logs to avoid unbounded growth.
fn prune_old_logs() {
    use std::fs;

    let dir = log_dir();
    let Ok(entries) = fs::read_dir(&dir) else {
        return;
    };

    let mut files: Vec<_> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|e| e.file_name().to_string_lossy().starts_with("app.log"))
        .collect();

    files.sort_by_key(|e| e.metadata().and_then(|m| m.modified()).ok()); // oldest first

    if files.len() > KEEP_ROTATED_LOGS {
        let excess = files.len() - KEEP_ROTATED_LOGS;
        for e in files.iter().take(excess) {
            let _ = fs::remove_file(e.path());
        }
    }
}
