use std::sync::Once;

use crate::error::ImportError;

static INIT: Once = Once::new();

/// Log level names accepted by `--log-level` and `RUST_LOG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// Installs `env_logger` once. `RUST_LOG` overrides `level` when set.
pub fn init_logging(level: LogLevel) {
    INIT.call_once(|| {
        let result = env_logger::Builder::new()
            .filter_level(level.into())
            .parse_default_env()
            .format_timestamp_millis()
            .try_init();
        if let Err(e) = result {
            eprintln!("Warning: Logging system already initialized: {e}");
        }
    });
}

/// Log an [`ImportError`] at error level, or info level for cancellation.
pub fn log_import_error(error: &ImportError, context: Option<&str>) {
    let message = match context {
        Some(ctx) => format!("{}: {}", ctx, error),
        None => error.to_string(),
    };

    if error.is_cancelled() {
        log::info!("{message}");
    } else {
        log::error!("{message}");
    }
}

/// Result extension for convenient error logging
pub trait ResultExt<T, E> {
    fn log_error(self, context: Option<&str>) -> Self;
}

impl<T> ResultExt<T, ImportError> for Result<T, ImportError> {
    fn log_error(self, context: Option<&str>) -> Self {
        if let Err(ref error) = self {
            log_import_error(error, context);
        }
        self
    }
}
