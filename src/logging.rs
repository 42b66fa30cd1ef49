//! Tracing subscriber setup for embedding hosts.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset. The registry client is chatty at
/// debug level, so it only reports errors.
pub const DEFAULT_FILTER: &str = "info,oci_distribution=error";

/// Installs a fmt subscriber filtered by `RUST_LOG`.
///
/// Returns false if a global subscriber was already set, e.g. by the host.
pub fn init() -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
