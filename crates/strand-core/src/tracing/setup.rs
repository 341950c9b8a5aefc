//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the log filter directives.
pub const LOG_ENV_VAR: &str = "STRAND_LOG";

/// Default directives when `STRAND_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVES: &str = "strand=info";

/// Initialize the tracing subscriber.
///
/// Reads `STRAND_LOG` for per-subsystem levels, e.g.
/// `STRAND_LOG=strand_analysis::builder=debug,strand_storage=warn`.
/// Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

        // A host application may already own the global subscriber.
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init();
    });
}
