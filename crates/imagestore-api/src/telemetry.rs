use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "imagestore=debug,tower_http=debug";

/// Initialize tracing: `RUST_LOG`-style filter (falling back to the crate defaults) and a
/// text or JSON formatter.
pub fn init_telemetry(log_format: &str) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    let result = if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::debug!(log_format, "Tracing initialized");
    Ok(())
}
