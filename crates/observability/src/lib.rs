//! Process-wide logging setup.

pub mod tracing;

pub use crate::tracing::{LogFormat, LogSettings};

/// Initialize logging with JSON output and `RUST_LOG` (default `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(&LogSettings::default());
}
