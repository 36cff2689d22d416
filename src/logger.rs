use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::AppError;

pub const DEFAULT_FILTER: &str = "imagegen=info";
pub const LOG_FILE_PREFIX: &str = "imagegen";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// Directive string such as `imagegen=debug`. `RUST_LOG` is used when unset.
    #[serde(default)]
    pub filter: Option<String>,
    /// When set, logs are mirrored into a daily-rotated file in this directory.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub ansi: bool,
}

pub fn env_filter(config: &LogConfig) -> EnvFilter {
    let configured = config.filter.as_deref().and_then(|raw| {
        EnvFilter::try_new(raw)
            .map_err(|e| eprintln!("Ignoring invalid log filter {:?}: {}", raw, e))
            .ok()
    });
    configured
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Keep the returned guard alive for as long
/// as file logging should keep flushing.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>, AppError> {
    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(config.ansi),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Other(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}
