//! Diagnostic tracing for the constraint engine.
//!
//! Constraint failures, backtrack decisions and final-attempt bypasses are
//! emitted as `tracing` events. Applications that embed the engine install
//! their own subscriber; [`init`] is a convenience for binaries and tests.

use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Env var read before `RUST_LOG`.
pub const LOG_ENV: &str = "STEPGUARD_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn subscriber() -> impl Subscriber + Send + Sync {
    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().with_writer(std::io::stderr).compact())
}

/// Install the global subscriber: compact events on stderr, filtered by
/// `STEPGUARD_LOG`, then `RUST_LOG`, then `warn`.
///
/// Panics if a subscriber is already installed; see [`try_init`].
///
/// ```bash
/// STEPGUARD_LOG=stepguard::backtrack=debug cargo test
/// ```
pub fn init() {
    subscriber().init();
}

/// Like [`init`], but returns `false` instead of panicking when a subscriber
/// is already installed.
pub fn try_init() -> bool {
    subscriber().try_init().is_ok()
}
