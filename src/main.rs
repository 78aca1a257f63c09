use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use cluster_usage_reporter::{
    load_config, run_report, AggregatorSettings, Aggregator, AlertTemplate, PrometheusClient,
    ReportRenderer, WebhookSink,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = load_config()?;
    info!("metrics backend = {}", cfg.prometheus_address);

    // Without the envelope there is nothing to send, so fail before any query work
    let template = AlertTemplate::load(&cfg.template_path)
        .with_context(|| format!("Failed to load alert template {}", cfg.template_path.display()))?;

    let client = PrometheusClient::from_config(&cfg).context("Failed to create metrics backend client")?;
    let sink = WebhookSink::from_config(&cfg).context("Failed to create notification client")?;

    let aggregator = Aggregator::new(Arc::new(client), AggregatorSettings::from_config(&cfg));
    let renderer = ReportRenderer::from_config(template, &cfg);

    let summary = run_report(&aggregator, &renderer, Arc::new(sink)).await;
    info!(
        "run finished: {} clusters, {} queries ok, {} failed, {} abandoned",
        summary.clusters.len(),
        summary.stats.succeeded,
        summary.stats.failed,
        summary.stats.abandoned
    );

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
