use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::metrics::specs::{FieldTarget, MetricSpec};
use crate::prometheus::QueryClient;
use crate::types::{GroupTag, ValueKind};

/// A per-node-group measurement; `$label` and `$group` are substituted per group.
#[derive(Debug, Clone, Copy)]
pub struct SubMetric {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ValueKind,
    pub template: &'static str,
}

pub const SUB_METRICS: [SubMetric; 7] = [
    SubMetric {
        name: "nodeCount",
        label: "Nodes",
        kind: ValueKind::Integer,
        template: r#"count(kube_node_labels{$label="$group"}) by (cluster)"#,
    },
    SubMetric {
        name: "cpuUsage",
        label: "CPU usage",
        kind: ValueKind::Percentage,
        template: r#"sum(node_namespace_pod_container:container_cpu_usage_seconds_total:sum_irate * on (cluster, node) group_left($label) kube_node_labels{$label="$group"}) by (cluster) / sum(kube_node_status_allocatable{resource="cpu"} * on (cluster, node) group_left($label) kube_node_labels{$label="$group"}) by (cluster)"#,
    },
    SubMetric {
        name: "cpuRequest",
        label: "CPU request",
        kind: ValueKind::Percentage,
        template: r#"sum(kube_pod_container_resource_requests{resource="cpu"} * on (cluster, node) group_left($label) kube_node_labels{$label="$group"}) by (cluster) / sum(kube_node_status_allocatable{resource="cpu"} * on (cluster, node) group_left($label) kube_node_labels{$label="$group"}) by (cluster)"#,
    },
    SubMetric {
        name: "cpuLimit",
        label: "CPU limit",
        kind: ValueKind::Percentage,
        template: r#"sum(kube_pod_container_resource_limits{resource="cpu"} * on (cluster, node) group_left($label) kube_node_labels{$label="$group"}) by (cluster) / sum(kube_node_status_allocatable{resource="cpu"} * on (cluster, node) group_left($label) kube_node_labels{$label="$group"}) by (cluster)"#,
    },
    SubMetric {
        name: "memoryUsage",
        label: "Memory usage",
        kind: ValueKind::Percentage,
        template: r#"sum(node_namespace_pod_container:container_memory_working_set_bytes * on (cluster, node) group_left($label) kube_node_labels{$label="$group"}) by (cluster) / sum(kube_node_status_allocatable{resource="memory"} * on (cluster, node) group_left($label) kube_node_labels{$label="$group"}) by (cluster)"#,
    },
    SubMetric {
        name: "memoryRequest",
        label: "Memory request",
        kind: ValueKind::Percentage,
        template: r#"sum(kube_pod_container_resource_requests{resource="memory"} * on (cluster, node) group_left($label) kube_node_labels{$label="$group"}) by (cluster) / sum(kube_node_status_allocatable{resource="memory"} * on (cluster, node) group_left($label) kube_node_labels{$label="$group"}) by (cluster)"#,
    },
    SubMetric {
        name: "memoryLimit",
        label: "Memory limit",
        kind: ValueKind::Percentage,
        template: r#"sum(kube_pod_container_resource_limits{resource="memory"} * on (cluster, node) group_left($label) kube_node_labels{$label="$group"}) by (cluster) / sum(kube_node_status_allocatable{resource="memory"} * on (cluster, node) group_left($label) kube_node_labels{$label="$group"}) by (cluster)"#,
    },
];

/// Query whose result series carry one distinct value of `label` each.
pub fn discovery_query(label: &str) -> String {
    format!(r#"count(kube_node_labels{{{label}!=""}}) by (cluster, {label})"#, label = label)
}

/// Runs the discovery query and returns the distinct, non-blank values of
/// `label`, sorted and kept verbatim so they match in later selectors.
/// A failed or empty query yields no groups.
pub async fn discover(client: &dyn QueryClient, expr: &str, label: &str) -> Vec<String> {
    let response = match client.query(expr).await {
        Ok(response) => response,
        Err(e) => {
            warn!("node group discovery failed, reporting summary fields only: {}", e);
            return Vec::new();
        }
    };

    let groups: BTreeSet<String> = response
        .samples
        .iter()
        .filter_map(|s| s.label(label))
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .collect();

    if groups.is_empty() {
        info!("no node groups found for label {}", label);
    } else {
        info!("discovered {} node groups: {:?}", groups.len(), groups);
    }
    groups.into_iter().collect()
}

/// Expands every sub-metric for every group, keeping each group's fields contiguous.
pub fn node_group_specs(groups: &[String], label: &str) -> Vec<MetricSpec> {
    let mut specs = Vec::with_capacity(groups.len() * SUB_METRICS.len());
    for group in groups {
        let escaped_group = escape_label_value(group);
        for (index, sub) in SUB_METRICS.iter().enumerate() {
            let query = sub
                .template
                .replace("$label", label)
                .replace("$group", &escaped_group);
            specs.push(MetricSpec {
                query,
                kind: sub.kind,
                target: FieldTarget::NodeGroup {
                    name: format!("{}_{}", sub.name, group),
                    label: sub.label.to_string(),
                    tag: GroupTag {
                        group: group.clone(),
                        index,
                    },
                },
            });
        }
    }
    specs
}

fn escape_label_value(raw: &str) -> String {
    raw.replace('\\', r"\\").replace('"', "\\\"")
}
