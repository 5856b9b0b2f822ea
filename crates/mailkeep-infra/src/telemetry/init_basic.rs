use mailkeep_core::ArchiverConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str =
    "mailkeep_pipeline=info,mailkeep_storage=info,mailkeep_core=info";

/// Initialize tracing for the process.
///
/// Returns an error instead of panicking when a global subscriber is already
/// installed, so hosts that set up their own logging can ignore it.
pub fn init_telemetry(config: &ArchiverConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = config.log_json || config.is_production();

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        backend = %config.archive_backend(),
        json,
        "Tracing initialized"
    );
    Ok(())
}
