//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Output format of the log lines.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event (default; what log shippers expect).
    #[default]
    Json,
    /// Human-readable, for local development.
    Pretty,
}

impl LogFormat {
    /// `LOG_FORMAT=pretty` selects [`LogFormat::Pretty`]; anything else is JSON.
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Initialize tracing/logging for the process.
///
/// Filtering is configurable via `RUST_LOG` (default `info`). Safe to call
/// multiple times (subsequent calls are no-ops).
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let _ = match format {
        LogFormat::Json => builder.json().with_target(false).try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}
