//! Node assembly.
//!
//! Wires the chain engine, transaction pool and downloader over one
//! key-value database, handling genesis setup, the config
//! compatibility check (with an explicit opt-in to the rewind it may
//! demand) and graceful shutdown.

pub mod config;
pub mod node;

pub use config::NodeConfig;
pub use node::Node;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber, honoring `RUST_LOG`.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
