//! Process-wide tracing setup for hosts embedding the ledger.
//!
//! Library code emits `tracing` spans/events and, inside the `db` layer,
//! plain `log` records. `init_tracing` installs a subscriber for both.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Installs the global subscriber and the `log` bridge.
///
/// `RUST_LOG` overrides `config.filter`. Returns `false` if a subscriber
/// was already installed; calling it twice is harmless.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let installed = if config.json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true));
        tracing::subscriber::set_global_default(subscriber).is_ok()
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true));
        tracing::subscriber::set_global_default(subscriber).is_ok()
    };

    if installed {
        if let Err(e) = tracing_log::LogTracer::init() {
            tracing::warn!("log bridge not installed: {}", e);
        }
        tracing::debug!(json = config.json, "tracing initialized");
    }

    installed
}
