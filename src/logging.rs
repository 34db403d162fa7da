//! Logging configuration with journald support on Linux.
//!
//! The terminal belongs to the TUI, so logs never go to stdout: on Linux they
//! go to systemd's journal when it is reachable, otherwise to a daily rolling
//! file.

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "SCANLOG_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Pick the filter directive to use, falling back to `info` when the
/// variable is unset, empty or does not parse.
pub fn resolve_directive(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(directive) if !directive.is_empty() && EnvFilter::try_new(directive).is_ok() => {
            directive.to_string()
        }
        _ => DEFAULT_DIRECTIVE.to_string(),
    }
}

/// Initialize the logging system.
///
/// Level comes from `SCANLOG_LOG`, e.g. `SCANLOG_LOG=debug` or
/// `SCANLOG_LOG=scanlog::capture=trace`.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let raw = std::env::var(LOG_ENV).ok();
    let directive = resolve_directive(raw.as_deref());
    let env_filter = EnvFilter::new(&directive);

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(journald_layer)
                .init();

            info!("Logging to journald (filter: {})", directive);
            warn_if_rejected(raw.as_deref(), &directive);
            return Ok(());
        }
    }

    let log_dir = log_dir.unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scanlog")
            .join("logs")
    });

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "scanlog.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes on drop, so it has to outlive main.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    info!("Logging to {} (filter: {})", log_dir.display(), directive);
    warn_if_rejected(raw.as_deref(), &directive);
    Ok(())
}

fn warn_if_rejected(raw: Option<&str>, directive: &str) {
    if let Some(raw) = raw {
        if raw.trim() != directive {
            tracing::warn!("Ignoring unparsable {}={:?}", LOG_ENV, raw);
        }
    }
}

/// Record where this run keeps its data and which backends it was built with.
pub fn log_startup(config: &Config) {
    info!(
        "scanlog {} (camera: {}, barcode: {})",
        env!("CARGO_PKG_VERSION"),
        if cfg!(feature = "camera") { "nokhwa" } else { "disabled" },
        if cfg!(feature = "barcode") { "rxing" } else { "disabled" },
    );
    info!("Database: {}", config.db_path().display());
    info!(
        "Recordings: {} ({} -c:v {}, .{})",
        config.recordings_dir().display(),
        config.recording.encoder,
        config.recording.codec,
        config.recording.extension
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_defaults_to_info() {
        assert_eq!(resolve_directive(None), "info");
        assert_eq!(resolve_directive(Some("   ")), "info");
    }

    #[test]
    fn test_directive_is_trimmed_and_kept() {
        assert_eq!(resolve_directive(Some(" debug ")), "debug");
        assert_eq!(
            resolve_directive(Some("scanlog::capture=trace")),
            "scanlog::capture=trace"
        );
    }

    #[test]
    fn test_unparsable_directive_falls_back() {
        assert_eq!(resolve_directive(Some("scanlog=loud")), "info");
    }
}
