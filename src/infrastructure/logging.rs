//! Logging initialization
//!
//! tracing based setup with console and non-blocking file output. Log files
//! live in a `logs/` directory next to the executable; an existing file is
//! rotated away with a timestamp on startup. `RUST_LOG` overrides the
//! configured level entirely.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

// Re-export LoggingConfig from config module
pub use crate::infrastructure::config::LoggingConfig;

const LOG_FILE_NAME: &str = "unpakr.log";

// Keeps the non-blocking writer alive for the process lifetime.
static LOG_GUARDS: Lazy<Mutex<Vec<non_blocking::WorkerGuard>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

/// UTC timestamps with millisecond precision
struct UtcTimeFormatter;

impl FormatTime for UtcTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Get the log directory relative to the executable location
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Rename a leftover log file from the previous run, keyed by its own
/// modification time so repeated restarts never collide on the name.
fn rotate_existing_log(log_dir: &Path) -> Result<()> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);
    if !log_file_path.exists() {
        return Ok(());
    }

    let metadata = std::fs::metadata(&log_file_path)
        .map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;
    let file_time = metadata
        .created()
        .or_else(|_| metadata.modified())
        .unwrap_or_else(|_| std::time::SystemTime::now());
    let datetime: DateTime<Utc> = file_time.into();

    let file_stem = LOG_FILE_NAME.trim_end_matches(".log");
    let timestamped_name = format!("{}.{}.log", file_stem, datetime.format("%Y%m%dT%H%M%S"));
    let timestamped_path = log_dir.join(&timestamped_name);

    std::fs::rename(&log_file_path, &timestamped_path).map_err(|e| {
        anyhow!(
            "Failed to rotate log file {} to {}: {}",
            log_file_path.display(),
            timestamped_path.display(),
            e
        )
    })?;

    Ok(())
}

/// Initialize logging with the given configuration
///
/// Framework internals are damped unless the TRACE level is requested;
/// `RUST_LOG` overrides the whole filter when set.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| build_env_filter(config));

    let registry = Registry::default().with(env_filter);

    match (config.file_output, config.console_output) {
        (true, true) => {
            let file_writer = file_writer()?;
            let file_layer = fmt::Layer::new()
                .with_writer(file_writer)
                .with_timer(UtcTimeFormatter)
                .with_target(false)
                .with_ansi(false);
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_timer(UtcTimeFormatter)
                .with_target(false);

            registry.with(file_layer).with(console_layer).init();
        }
        (true, false) => {
            let file_writer = file_writer()?;
            let file_layer = fmt::Layer::new()
                .with_writer(file_writer)
                .with_timer(UtcTimeFormatter)
                .with_target(false)
                .with_ansi(false);

            registry.with(file_layer).init();
        }
        (false, true) => {
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_timer(UtcTimeFormatter)
                .with_target(false);

            registry.with(console_layer).init();
        }
        (false, false) => {
            return Err(anyhow!("No logging output configured"));
        }
    }

    info!("Logging initialized (level: {})", config.level);
    Ok(())
}

/// Filter for the configured level, damping framework internals unless
/// everything is traced. A level the directive parser rejects is reported
/// on stderr and the base filter stands on its own.
fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::new(&config.level);

    if !config.level.to_lowercase().contains("trace") {
        filter = filter
            .add_directive("tauri=info".parse().unwrap())
            .add_directive("wry=warn".parse().unwrap())
            .add_directive("tokio=info".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap());

        // Keep our application logs at the requested level
        match format!("unpakr={}", config.level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring unusable log level {:?}: {}", config.level, e),
        }
    }

    filter
}

/// Non-blocking writer into `logs/unpakr.log`, rotating any leftover file
fn file_writer() -> Result<non_blocking::NonBlocking> {
    let log_dir = get_log_directory();
    std::fs::create_dir_all(&log_dir)
        .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;
    rotate_existing_log(&log_dir)?;

    let file_appender = rolling::never(&log_dir, LOG_FILE_NAME);
    let (file_writer, file_guard) = non_blocking(file_appender);
    LOG_GUARDS.lock().unwrap().push(file_guard);
    Ok(file_writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_moves_the_previous_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join(LOG_FILE_NAME);
        std::fs::write(&live, "previous run").unwrap();

        rotate_existing_log(dir.path()).unwrap();

        assert!(!live.exists());
        let rotated: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(rotated.len(), 1);
        assert!(rotated[0].starts_with("unpakr."));
        assert!(rotated[0].ends_with(".log"));
    }

    #[test]
    fn rotation_without_a_previous_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        rotate_existing_log(dir.path()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn filter_keeps_app_logs_at_the_configured_level() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            console_output: true,
            file_output: false,
        };

        let rendered = build_env_filter(&config).to_string();
        assert!(rendered.contains("unpakr=debug"));
        assert!(rendered.contains("tauri=info"));
    }

    #[test]
    fn unusable_level_still_yields_a_filter() {
        let config = LoggingConfig {
            level: "verbose".to_string(),
            console_output: true,
            file_output: false,
        };

        // "verbose" is not a directive level, so the app directive is dropped
        let rendered = build_env_filter(&config).to_string();
        assert!(!rendered.contains("unpakr="));
    }
}
