use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::config_loader;

pub fn init_observability(component: &str) -> Result<()> {
    // RUST_LOG overrides the default level.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    let service_name = std::env::var("SERVICE_NAME")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| component.to_string());

    info!(
        service = %service_name,
        environment = %config_loader::get_stage(),
        component = %component,
        "Observability initialized"
    );

    Ok(())
}
