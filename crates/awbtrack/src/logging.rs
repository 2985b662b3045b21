//! Process-wide logging setup.
//!
//! Library code logs through `log` (storage) and `tracing` (job loop). This
//! installs one `tracing` subscriber for both and bridges `log` records into
//! it.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::LoggingSettings;

pub const DEFAULT_FILTER: &str = "info,awbtrack=debug";

/// Resolves the filter: `RUST_LOG` first, then the configured level, then
/// [`DEFAULT_FILTER`].
pub fn build_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| {
            settings
                .level
                .as_deref()
                .and_then(|level| EnvFilter::try_new(level).ok())
        })
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Fails if one is already set.
pub fn init_logging(
    settings: &LoggingSettings,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = build_filter(settings);

    if settings.json {
        let subscriber = Registry::default().with(filter).with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_span_list(false),
        );
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().with_target(true));
        tracing::subscriber::set_global_default(subscriber)?;
    }

    tracing_log::LogTracer::init()?;

    tracing::debug!(json = settings.json, "Logging initialized");
    Ok(())
}
