use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use urun_domain::engagement::{EngagementService, OutboxConfig};
use urun_infra::repositories::{
    InMemoryActivityRepository, InMemoryEngagementOutboxRepository, InMemoryNotificationRepository,
};
use urun_infra::{config::AppConfig, dispatcher, logging::init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config)?;
    let _ = PrometheusBuilder::new().install_recorder()?;

    // the memory backend is process-local, so this binary drains an outbox
    // of its own; a store-backed deployment swaps these repositories for the
    // shared adapter and becomes the single drain for the whole system
    let engagement = EngagementService::new(
        Arc::new(InMemoryEngagementOutboxRepository::default()),
        Arc::new(InMemoryNotificationRepository::default()),
        Arc::new(InMemoryActivityRepository::default()),
        OutboxConfig {
            max_attempts: config.outbox_max_attempts,
            backoff_base_ms: config.outbox_backoff_base_ms,
            backoff_max_ms: config.outbox_backoff_max_ms,
        },
    );

    info!("outbox dispatcher starting");
    tokio::select! {
        _ = dispatcher::run_outbox_dispatcher(engagement, &config) => {}
        _ = tokio::signal::ctrl_c() => {}
    }
    info!("worker shutdown");

    Ok(())
}
