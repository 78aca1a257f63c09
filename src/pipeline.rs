use std::sync::Arc;
use tracing::info;

use crate::collector::{AggregationStats, Aggregator};
use crate::notification::{deliver_all, DeliverySink, DeliverySummary, ReportRenderer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub clusters: Vec<String>,
    pub node_groups: Vec<String>,
    pub stats: AggregationStats,
    pub delivery: DeliverySummary,
}

/// One query-render-deliver cycle.
pub async fn run_report(
    aggregator: &Aggregator,
    renderer: &ReportRenderer,
    sink: Arc<dyn DeliverySink>,
) -> RunSummary {
    let outcome = aggregator.run().await;
    let clusters: Vec<String> = outcome.book.clusters().into_iter().map(str::to_string).collect();

    let payloads: Vec<_> = outcome.book.reports().map(|r| renderer.render(r)).collect();
    if payloads.is_empty() {
        info!("no cluster reports to deliver");
    }
    let delivery = deliver_all(sink, payloads).await;
    info!(
        "delivered {} reports, {} failed",
        delivery.delivered.len(),
        delivery.failed.len()
    );

    RunSummary {
        clusters,
        node_groups: outcome.node_groups,
        stats: outcome.stats,
        delivery,
    }
}
