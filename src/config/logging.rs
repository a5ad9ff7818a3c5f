//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber, honouring `RUST_LOG` before `filter`
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(filter: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_ok()
}
