//! Tracing and logging (shared setup).

/// Initialize process-wide tracing.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Tracing configuration (filters, output format).
pub mod tracing;
