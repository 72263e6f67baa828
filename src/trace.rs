//! Tracing setup for the binaries and tests.
//!
//! The library only emits events; installing a subscriber is up to the
//! program. The hot acquire/commit path logs nothing per message.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs an fmt subscriber with uptime timestamps and thread ids.
///
/// The filter comes from `RUST_LOG`, falling back to `csics=info`. Calling
/// this twice is harmless: the second install is ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("csics=info"));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(false)
                .with_line_number(false)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}
