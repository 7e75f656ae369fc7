//! Process-wide tracing subscriber for binaries.

use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Install a formatting subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns false when a subscriber was already installed; repeated calls are
/// harmless.
pub fn init_tracing() -> bool {
    if INITIALISED.set(()).is_err() {
        return false;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}
