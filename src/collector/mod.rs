use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::formatting::format_value;
use crate::metrics::{
    discover, discovery_query, node_group_specs, static_specs, FieldTarget, InstanceStatus,
    MetricSpec,
};
use crate::prometheus::{QueryClient, QueryError, QueryResponse};
use crate::report::ReportBook;
use crate::types::{Config, Field, FieldSection};

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub node_group_label: String,
    pub instance_metric: String,
    pub query_concurrency: usize,
    pub run_deadline: Duration,
}

impl AggregatorSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            node_group_label: cfg.node_group_label.clone(),
            instance_metric: cfg.instance_metric.clone(),
            query_concurrency: cfg.query_concurrency,
            run_deadline: cfg.run_deadline,
        }
    }
}

/// Counters describing how one aggregation pass went.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub succeeded: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub summary_succeeded: usize,
    pub summary_samples: usize,
    /// Distinct `status` values with no mapping; each is logged once.
    pub unknown_statuses: BTreeSet<String>,
}

#[derive(Debug)]
pub struct AggregationOutcome {
    pub book: ReportBook,
    pub stats: AggregationStats,
    pub node_groups: Vec<String>,
}

/// Issues the query battery and folds every answer into per-cluster reports.
pub struct Aggregator {
    client: Arc<dyn QueryClient>,
    settings: AggregatorSettings,
}

/// Result of one spec's query; `None` when it never completed.
pub type Slot = Option<Result<QueryResponse, QueryError>>;

impl Aggregator {
    pub fn new(client: Arc<dyn QueryClient>, settings: AggregatorSettings) -> Self {
        Self { client, settings }
    }

    pub async fn run(&self) -> AggregationOutcome {
        let deadline = Instant::now() + self.settings.run_deadline;
        let label = &self.settings.node_group_label;

        let discovery = discovery_query(label);
        let node_groups = match timeout_at(deadline, discover(self.client.as_ref(), &discovery, label)).await {
            Ok(groups) => groups,
            Err(_) => {
                warn!("run deadline reached during node group discovery");
                Vec::new()
            }
        };

        let mut specs = static_specs(&self.settings.instance_metric);
        specs.extend(node_group_specs(&node_groups, label));
        info!("issuing {} queries ({} node groups)", specs.len(), node_groups.len());

        let slots = self.issue(&specs, deadline).await;
        let (book, stats) = fold_results(&specs, slots);
        log_outcome(&book, &stats);

        AggregationOutcome {
            book,
            stats,
            node_groups,
        }
    }

    /// Runs the specs with bounded parallelism. A slot stays `None` when its
    /// query was still outstanding at the deadline.
    async fn issue(&self, specs: &[MetricSpec], deadline: Instant) -> Vec<Slot> {
        let mut slots: Vec<Slot> = specs.iter().map(|_| None).collect();
        let semaphore = Arc::new(Semaphore::new(self.settings.query_concurrency.max(1)));
        let mut set = JoinSet::new();

        for (index, spec) in specs.iter().enumerate() {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let query = spec.query.clone();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, client.query(&query).await)
            });
        }

        loop {
            match timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((index, result)))) => slots[index] = Some(result),
                Ok(Some(Err(e))) => error!("query task did not complete: {}", e),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "run deadline reached with {} queries outstanding, abandoning them",
                        set.len()
                    );
                    set.abort_all();
                    break;
                }
            }
        }
        slots
    }
}

/// Folds query results into reports in spec order, so field order never
/// depends on which query finished first.
pub fn fold_results(specs: &[MetricSpec], slots: Vec<Slot>) -> (ReportBook, AggregationStats) {
    let mut book = ReportBook::new();
    let mut stats = AggregationStats::default();

    for (spec, slot) in specs.iter().zip(slots) {
        let response = match slot {
            Some(Ok(response)) => response,
            Some(Err(e)) => {
                warn!("query for {} failed: {}", spec.describe(), e);
                stats.failed += 1;
                continue;
            }
            None => {
                warn!("query for {} abandoned", spec.describe());
                stats.abandoned += 1;
                continue;
            }
        };
        stats.succeeded += 1;
        if spec.creates_report() {
            stats.summary_succeeded += 1;
            stats.summary_samples += response.samples.len();
        }

        for sample in &response.samples {
            let Some(cluster) = sample.cluster() else {
                debug!("{} returned a sample without a cluster label", spec.describe());
                continue;
            };
            if !sample.value.is_finite() {
                debug!("{} for {} is {}, skipped", spec.describe(), cluster, sample.value);
                continue;
            }
            let value = format_value(sample.value, spec.kind);

            match &spec.target {
                FieldTarget::Summary { name, label } => {
                    book.entry(cluster).upsert(Field {
                        name: name.clone(),
                        label: label.clone(),
                        value,
                        section: FieldSection::Summary,
                    });
                }
                FieldTarget::Status => {
                    let raw = sample.label("status").unwrap_or_default();
                    match InstanceStatus::from_label(raw) {
                        Some(status) => book.entry(cluster).upsert(Field {
                            name: status.field_name().to_string(),
                            label: status.field_name().to_string(),
                            value,
                            section: FieldSection::Summary,
                        }),
                        None => {
                            if stats.unknown_statuses.insert(raw.to_string()) {
                                warn!("instance status {:?} has no mapping, samples dropped", raw);
                            }
                        }
                    }
                }
                FieldTarget::NodeGroup { name, label, tag } => match book.get_mut(cluster) {
                    Some(report) => report.upsert(Field {
                        name: name.clone(),
                        label: label.clone(),
                        value,
                        section: FieldSection::NodeGroup(tag.clone()),
                    }),
                    None => debug!("{} has no summary data, skipping {}", cluster, name),
                },
            }
        }
    }

    (book, stats)
}

fn log_outcome(book: &ReportBook, stats: &AggregationStats) {
    if !book.is_empty() {
        info!(
            "built reports for {} clusters ({} queries ok, {} failed, {} abandoned)",
            book.len(),
            stats.succeeded,
            stats.failed,
            stats.abandoned
        );
    } else if stats.summary_succeeded == 0 {
        warn!("no summary query succeeded, no cluster reports built");
    } else if stats.summary_samples == 0 {
        warn!("metrics backend reported no clusters");
    } else {
        warn!("summary queries returned samples but none carried a cluster label");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Sample, ValueKind};

    fn spec(name: &str, kind: ValueKind) -> MetricSpec {
        MetricSpec::summary(name, name, kind, format!("query_{}", name))
    }

    fn ok(samples: Vec<Sample>) -> Slot {
        Some(Ok(QueryResponse {
            samples,
            warnings: Vec::new(),
        }))
    }

    fn cluster_sample(cluster: &str, value: f64) -> Sample {
        Sample::new([("cluster", cluster)], value)
    }

    fn status_sample(cluster: &str, status: &str, value: f64) -> Sample {
        Sample::new([("cluster", cluster), ("status", status)], value)
    }

    #[test]
    fn test_fold_orders_fields_by_spec() {
        let specs = vec![
            spec("cpuRequest", ValueKind::Percentage),
            spec("cpuUsage", ValueKind::Percentage),
            MetricSpec::status("status_query"),
        ];
        let slots = vec![
            ok(vec![cluster_sample("prod", 0.42)]),
            ok(vec![cluster_sample("prod", 0.55)]),
            ok(vec![
                status_sample("prod", "Healthy", 10.0),
                status_sample("prod", "Creating", 1.0),
            ]),
        ];

        let (book, stats) = fold_results(&specs, slots);
        let report = book.get("prod").unwrap();
        assert_eq!(report.fields.names(), vec!["cpuRequest", "cpuUsage", "Healthy", "Creating"]);
        assert_eq!(report.fields.get("cpuRequest").unwrap().value, "42.00%");
        assert_eq!(report.fields.get("Healthy").unwrap().value, "10");
        assert_eq!(stats.succeeded, 3);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_fold_tolerates_failed_and_abandoned_queries() {
        let specs = vec![
            spec("cpuRequest", ValueKind::Percentage),
            spec("cpuUsage", ValueKind::Percentage),
            spec("memoryUsage", ValueKind::Percentage),
        ];
        let slots = vec![
            Some(Err(QueryError::Decode("bad".to_string()))),
            ok(vec![cluster_sample("prod", 0.5), cluster_sample("uat", 0.25)]),
            None,
        ];

        let (book, stats) = fold_results(&specs, slots);
        assert_eq!(book.clusters(), vec!["prod", "uat"]);
        assert_eq!(book.get("uat").unwrap().fields.names(), vec!["cpuUsage"]);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.succeeded, 1);
    }

    #[test]
    fn test_unknown_status_and_unlabelled_samples_are_dropped() {
        let specs = vec![MetricSpec::status("status_query")];
        let slots = vec![ok(vec![
            status_sample("prod", "Upgrading", 2.0),
            status_sample("prod", "Upgrading", 3.0),
            status_sample("prod", "unhealthy", 1.0),
            Sample::new([("status", "Healthy")], 4.0),
        ])];

        let (book, stats) = fold_results(&specs, slots);
        let report = book.get("prod").unwrap();
        assert_eq!(report.fields.names(), vec!["Unhealthy"]);
        assert_eq!(stats.unknown_statuses.len(), 1);
        assert!(stats.unknown_statuses.contains("Upgrading"));
    }

    #[test]
    fn test_node_group_fields_need_existing_report() {
        let mut specs = vec![spec("cpuRequest", ValueKind::Percentage)];
        specs.extend(node_group_specs(&["gpu".to_string()], "label_node_group"));
        let mut slots = vec![ok(vec![cluster_sample("prod", 0.1)])];
        for _ in 1..specs.len() {
            slots.push(ok(vec![cluster_sample("prod", 2.0), cluster_sample("staging", 2.0)]));
        }

        let (book, _) = fold_results(&specs, slots);
        assert_eq!(book.clusters(), vec!["prod"]);
        let report = book.get("prod").unwrap();
        assert_eq!(report.fields.len(), 8);
        assert_eq!(report.fields.get("nodeCount_gpu").unwrap().value, "2");
        assert_eq!(report.fields.get("cpuUsage_gpu").unwrap().value, "200.00%");
    }

    #[test]
    fn test_non_finite_values_are_skipped() {
        let specs = vec![spec("cpuRequest", ValueKind::Percentage)];
        let slots = vec![ok(vec![cluster_sample("prod", f64::NAN), cluster_sample("uat", 0.3)])];

        let (book, stats) = fold_results(&specs, slots);
        assert_eq!(book.clusters(), vec!["uat"]);
        assert_eq!(stats.summary_samples, 2);
    }
}
