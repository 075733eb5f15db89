//! Tracing subscriber setup.

use crate::config::Config;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the fmt subscriber filtered by `config.logging.filter`
///
/// `RUST_LOG` wins when set. Returns `false` if a global subscriber was
/// already installed, which makes repeated calls from tests harmless.
pub fn init(config: &Config) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
