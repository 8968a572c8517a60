//! Tracing subscriber setup for binaries embedding Roomcast.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_DIRECTIVE`].
///
/// Does nothing if a global subscriber is already installed, so it is safe
/// to call from tests and from `main`.
pub fn init() {
    init_with(DEFAULT_DIRECTIVE);
}

/// Like [`init`] with a custom fallback directive, e.g. `"roomcast=debug"`.
pub fn init_with(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!("tracing subscriber installed");
    }
}
