//! Logging Infrastructure
//!
//! Structured logging for the checker process:
//! - Console output always goes to stderr (stdout carries the run report)
//! - Daily rotating application logs (deleted after 14 days)
//! - Daily audit logs of every appended history row (never deleted)

use std::fs;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Target used by [`audit_log!`](crate::audit_log) events
pub const AUDIT_TARGET: &str = "audit";

/// Days an application log file is kept
const APP_LOG_RETENTION_DAYS: i64 = 14;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Clean up old application log files (older than 14 days)
///
/// Audit logs are never touched.
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    use chrono::{Local, TimeZone};

    let cutoff = Local::now() - chrono::Duration::days(APP_LOG_RETENTION_DAYS);
    let app_log_dir = log_dir.join("app");
    if !app_log_dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(app_log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        // app.YYYY-MM-DD (tracing-appender daily naming)
        let Some(date_part) = name.strip_prefix("app.") else {
            continue;
        };
        let Ok(naive_date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d") else {
            continue;
        };

        if let Some(local_datetime) = Local
            .from_local_datetime(&naive_date.and_time(chrono::NaiveTime::MIN))
            .single()
            && local_datetime < cutoff
        {
            fs::remove_file(&path)?;
            removed += 1;
            tracing::info!(file = %name, "Deleted old log file");
        }
    }

    Ok(removed)
}

fn console_layer(level: &str, json_format: bool) -> BoxedLayer {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    }
}

/// Daily rotating file layer; `audit` selects audit events only or everything else
fn file_layer(dir: &Path, prefix: &str, level: &str, json_format: bool, audit: bool) -> BoxedLayer {
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, prefix);
    let target_filter = filter_fn(move |meta| (meta.target() == AUDIT_TARGET) == audit);

    if json_format {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::sync::Mutex::new(appender))
            .with_filter(target_filter)
            .with_filter(EnvFilter::new(level))
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(appender))
            .with_filter(target_filter)
            .with_filter(EnvFilter::new(level))
            .boxed()
    }
}

/// Initialize the logging system with daily rotating logs
///
/// # Arguments
/// * `level` - Log level (e.g., "info", "debug", "warn")
/// * `json_format` - Whether to use JSON format
/// * `log_dir` - Optional directory for file logging (creates `app/` and `audit/`)
///
/// Old application logs are cleaned once here; the checker is a
/// short-lived process so there is no periodic cleanup.
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let mut layers: Vec<BoxedLayer> = vec![console_layer(level, json_format)];

    if let Some(log_dir) = log_dir {
        let app_log_dir = log_dir.join("app");
        let audit_log_dir = log_dir.join("audit");
        fs::create_dir_all(&app_log_dir)?;
        fs::create_dir_all(&audit_log_dir)?;

        layers.push(file_layer(&app_log_dir, "app", level, json_format, false));
        // audit events are always written, whatever the level
        layers.push(file_layer(&audit_log_dir, "audit", "info", json_format, true));
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    if let Some(log_dir) = log_dir
        && let Err(e) = cleanup_old_logs(log_dir)
    {
        tracing::error!(error = %e, "Failed to cleanup old logs");
    }

    Ok(())
}

/// Audit log helper - records every checksum history append
///
/// ```ignore
/// audit_log!(bitstream_id, result, sequence);
/// ```
#[macro_export]
macro_rules! audit_log {
    ($bitstream_id:expr, $result:expr, $sequence:expr) => {
        tracing::info!(
            target: "audit",
            bitstream_id = $bitstream_id,
            result = %$result,
            sequence = $sequence,
            timestamp = chrono::Local::now().to_rfc3339(),
            "AUDIT"
        );
    };
}
