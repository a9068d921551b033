use std::time::Duration;

use metrics::counter;
use urun_domain::engagement::EngagementService;
use urun_domain::util::now_ms;

use crate::config::AppConfig;

const OUTBOX_DELIVERED_TOTAL: &str = "urun_outbox_delivered_total";
const OUTBOX_RETRIED_TOTAL: &str = "urun_outbox_retried_total";
const OUTBOX_DEAD_LETTERED_TOTAL: &str = "urun_outbox_dead_lettered_total";

/// Drains the engagement outbox on an interval until the task is dropped.
/// Delivery is at-least-once; a drain failure is logged and the next tick
/// retries.
pub async fn run_outbox_dispatcher(engagement: EngagementService, config: &AppConfig) {
    let period = Duration::from_millis(config.outbox_poll_interval_ms.max(10));
    let batch = config.outbox_dispatch_batch.max(1);
    let mut ticker = tokio::time::interval(period);

    loop {
        ticker.tick().await;
        match engagement.dispatch_due(now_ms(), batch).await {
            Ok(outcome) if outcome.handled() > 0 => {
                counter!(OUTBOX_DELIVERED_TOTAL).increment(outcome.delivered as u64);
                counter!(OUTBOX_RETRIED_TOTAL).increment(outcome.retried as u64);
                counter!(OUTBOX_DEAD_LETTERED_TOTAL).increment(outcome.dead_lettered as u64);
                tracing::info!(
                    delivered = outcome.delivered,
                    retried = outcome.retried,
                    dead_lettered = outcome.dead_lettered,
                    "engagement outbox drained"
                );
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(error = %err, "engagement outbox dispatch failed");
            }
        }
    }
}
