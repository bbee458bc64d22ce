//! Logging system configuration and initialization
//!
//! - Console and/or file output, optionally JSON formatted
//! - Timestamps in a fixed UTC offset (Bishkek time by default)
//! - The previous `harvester.log` is renamed with a timestamp at start-up and only
//!   the newest `max_files` log files are kept
//! - Chatty dependencies are held at `warn` unless the level is `trace`;
//!   `RUST_LOG` overrides everything

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, FixedOffset, Utc};
use lazy_static::lazy_static;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::fmt::{self, time::FormatTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

pub use crate::infrastructure::config::LoggingConfig;

pub const LOG_FILE_NAME: &str = "harvester.log";

// Keeps the non-blocking file writer alive for the whole process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<WorkerGuard>> = Mutex::new(Vec::new());
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Renders timestamps in a fixed offset from UTC
#[derive(Debug, Clone, Copy)]
struct OffsetTimer {
    offset: FixedOffset,
}

impl FormatTime for OffsetTimer {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Utc::now().with_timezone(&self.offset);
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

fn utc_offset(config: &LoggingConfig) -> Result<FixedOffset> {
    FixedOffset::east_opt(config.utc_offset_hours * 3600)
        .ok_or_else(|| anyhow!("Invalid UTC offset: {} hours", config.utc_offset_hours))
}

/// Configured log directory, else `<data dir>/listing-harvester/logs`, else `./logs`
pub fn log_directory(config: &LoggingConfig) -> PathBuf {
    config.log_dir.clone().unwrap_or_else(|| {
        dirs::data_local_dir()
            .map(|dir| dir.join(env!("CARGO_PKG_NAME")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("logs")
    })
}

/// Level filter built from the configuration alone
pub fn filter_from_config(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("Invalid log level '{}'", config.level))?;

    if !config.level.to_lowercase().contains("trace") {
        let mut targets: Vec<_> = config.module_filters.iter().collect();
        targets.sort();
        for (target, level) in targets {
            let directive = format!("{target}={level}")
                .parse()
                .with_context(|| format!("Invalid module filter '{target}={level}'"))?;
            filter = filter.add_directive(directive);
        }
    }

    Ok(filter)
}

/// `RUST_LOG` when set, the configured filter otherwise
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => filter_from_config(config),
    }
}

/// Rename an existing log file to `<stem>.<timestamp>.log`.
pub fn rotate_existing_log(log_dir: &Path, file_name: &str, offset: FixedOffset) -> Result<Option<PathBuf>> {
    let current = log_dir.join(file_name);
    if !current.exists() {
        return Ok(None);
    }

    let metadata = std::fs::metadata(&current)
        .with_context(|| format!("Failed to get log file metadata: {}", current.display()))?;
    let stamp: DateTime<Utc> = metadata
        .modified()
        .or_else(|_| metadata.created())
        .unwrap_or_else(|_| SystemTime::now())
        .into();

    let stem = file_name.trim_end_matches(".log");
    let rotated = log_dir.join(format!(
        "{}.{}.log",
        stem,
        stamp.with_timezone(&offset).format("%Y%m%dT%H%M%S")
    ));

    std::fs::rename(&current, &rotated).with_context(|| {
        format!("Failed to rotate log file {} to {}", current.display(), rotated.display())
    })?;
    Ok(Some(rotated))
}

/// Delete all but the newest `max_files` `.log` files; returns how many were removed.
pub fn cleanup_old_logs(log_dir: &Path, max_files: usize) -> Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let mut log_files = Vec::new();
    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path.extension().is_some_and(|ext| ext == "log");
        if !(path.is_file() && is_log) {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            log_files.push((path, modified));
        }
    }

    // newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in log_files.iter().skip(max_files) {
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }
    Ok(removed)
}

/// Install the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if !(config.console_output || config.file_output) {
        return Err(anyhow!("No logging output configured"));
    }

    let timer = OffsetTimer {
        offset: utc_offset(config)?,
    };
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut log_dir = None;
    let mut rotated = None;

    if config.file_output {
        let dir = log_directory(config);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        rotated = rotate_existing_log(&dir, LOG_FILE_NAME, timer.offset)?;
        cleanup_old_logs(&dir, config.max_files.saturating_sub(1))?;

        let (writer, guard) = non_blocking(rolling::never(&dir, LOG_FILE_NAME));
        if let Ok(mut guards) = LOG_GUARDS.lock() {
            guards.push(guard);
        }

        let file_layer = fmt::Layer::new()
            .with_writer(writer)
            .with_timer(timer)
            .with_ansi(false);
        layers.push(if config.json_format {
            file_layer
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            file_layer.with_target(false).boxed()
        });
        log_dir = Some(dir);
    }

    if config.console_output {
        let console_layer = fmt::Layer::new().with_writer(std::io::stdout).with_timer(timer);
        layers.push(if config.json_format {
            console_layer.json().boxed()
        } else {
            console_layer.with_target(false).boxed()
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(build_env_filter(config)?)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!("Logging system initialized (level: {})", config.level);
    if let Some(dir) = &log_dir {
        info!("Log directory: {:?}", dir);
    }
    if let Some(path) = rotated {
        info!("Rotated previous log file to: {:?}", path);
    }
    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!("Operating system: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
}
