use crate::infrastructure::config::{Config, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEVELOPMENT_FILTER: &str = "phrase_audio_backend=debug,audio_sync=debug,tower_http=debug";
const PRODUCTION_FILTER: &str = "phrase_audio_backend=info,audio_sync=info,tower_http=info";

/// Install the global subscriber; `RUST_LOG` overrides the default filter
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config).into());

    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

fn default_filter(config: &Config) -> &'static str {
    if config.is_development() {
        DEVELOPMENT_FILTER
    } else {
        PRODUCTION_FILTER
    }
}
