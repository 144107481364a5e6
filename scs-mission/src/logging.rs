use tracing_subscriber::EnvFilter;

use crate::config::{LogEncoding, LoggerSettings};

/// Install the global subscriber. `RUST_LOG` wins over the configured
/// level. Calling this twice keeps the first subscriber.
pub fn init_tracing(settings: &LoggerSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = match settings.encoding {
        LogEncoding::Json => builder.json().try_init(),
        LogEncoding::Console => builder.try_init(),
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
