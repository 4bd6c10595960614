//! stderr log subscriber for the CLI and for embedders that do not bring their own.
//!
//! The library only emits `tracing` events; phrases, seeds and keys are never fields.

use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset: vault events at info, dependencies at warn.
pub const DEFAULT_DIRECTIVES: &str = "warn,beeseed=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    /// `BEESEED_LOG_FORMAT=json|compact`, else `BEESEED_LOG_JSON=1`, else compact.
    pub fn from_env() -> Self {
        let format = std::env::var("BEESEED_LOG_FORMAT").ok();
        let json_flag = std::env::var("BEESEED_LOG_JSON").ok();
        Self::resolve(format.as_deref(), json_flag.as_deref())
    }

    fn resolve(format: Option<&str>, json_flag: Option<&str>) -> Self {
        match format.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            Some("compact") => LogFormat::Compact,
            _ if json_flag.map(str::trim) == Some("1") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Install the subscriber chosen by the environment. Returns the format in effect.
pub fn init_logging() -> LogFormat {
    init_logging_with(LogFormat::from_env())
}

/// A second call (tests, embedding) keeps whichever subscriber was installed first.
pub fn init_logging_with(format: LogFormat) -> LogFormat {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    if installed.is_ok() {
        tracing::debug!(?format, "log subscriber installed");
    }
    format
}
