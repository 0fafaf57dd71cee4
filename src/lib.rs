pub mod config;
pub mod cumulative;
pub mod error;
pub mod handicaps;
pub mod model;
pub mod persist;
pub mod pipeline;
pub mod reconcile;
pub mod reshape;
pub mod transform;
pub mod views;

use tracing_subscriber::EnvFilter;

/// Logs go to stderr so report tables on stdout stay clean. `RUST_LOG` overrides.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
