use crate::types::{GroupTag, ValueKind};

/// Where the samples of one query land in a cluster's field table.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldTarget {
    /// One summary field per cluster.
    Summary { name: String, label: String },
    /// One summary field per known `status` label value.
    Status,
    /// One field inside a node group's block.
    NodeGroup {
        name: String,
        label: String,
        tag: GroupTag,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    pub query: String,
    pub kind: ValueKind,
    pub target: FieldTarget,
}

impl MetricSpec {
    pub fn summary(name: &str, label: &str, kind: ValueKind, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            kind,
            target: FieldTarget::Summary {
                name: name.to_string(),
                label: label.to_string(),
            },
        }
    }

    pub fn status(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            kind: ValueKind::Integer,
            target: FieldTarget::Status,
        }
    }

    /// Node group samples only refine clusters already seen by a summary query.
    pub fn creates_report(&self) -> bool {
        !matches!(self.target, FieldTarget::NodeGroup { .. })
    }

    /// Short identifier for log lines.
    pub fn describe(&self) -> String {
        match &self.target {
            FieldTarget::Summary { name, .. } | FieldTarget::NodeGroup { name, .. } => name.clone(),
            FieldTarget::Status => "status".to_string(),
        }
    }
}

const CPU_REQUEST: &str = r#"sum(namespace_cpu:kube_pod_container_resource_requests:sum) by (cluster) / sum(kube_node_status_allocatable{resource="cpu"}) by (cluster)"#;
const CPU_LIMIT: &str = r#"sum(namespace_cpu:kube_pod_container_resource_limits:sum) by (cluster) / sum(kube_node_status_allocatable{resource="cpu"}) by (cluster)"#;
const CPU_USAGE: &str = r#"1 - sum(avg by (cluster, mode) (rate(node_cpu_seconds_total{job="node-exporter", mode=~"idle|steal"}[1m]))) by (cluster)"#;
const MEMORY_REQUEST: &str = r#"sum(namespace_memory:kube_pod_container_resource_requests:sum) by (cluster) / sum(kube_node_status_allocatable{resource="memory"}) by (cluster)"#;
const MEMORY_LIMIT: &str = r#"sum(namespace_memory:kube_pod_container_resource_limits:sum) by (cluster) / sum(kube_node_status_allocatable{resource="memory"}) by (cluster)"#;
const MEMORY_USAGE: &str = r#"1 - sum(:node_memory_MemAvailable_bytes:sum) by (cluster) / sum(node_memory_MemTotal_bytes{job="node-exporter"}) by (cluster)"#;

/// The fixed summary battery, in display order.
pub fn static_specs(instance_metric: &str) -> Vec<MetricSpec> {
    vec![
        MetricSpec::summary("cpuRequest", "CPU request", ValueKind::Percentage, CPU_REQUEST),
        MetricSpec::summary("cpuLimit", "CPU limit", ValueKind::Percentage, CPU_LIMIT),
        MetricSpec::summary("cpuUsage", "CPU usage", ValueKind::Percentage, CPU_USAGE),
        MetricSpec::summary("memoryRequest", "Memory request", ValueKind::Percentage, MEMORY_REQUEST),
        MetricSpec::summary("memoryLimit", "Memory limit", ValueKind::Percentage, MEMORY_LIMIT),
        MetricSpec::summary("memoryUsage", "Memory usage", ValueKind::Percentage, MEMORY_USAGE),
        MetricSpec::summary(
            "instanceTotal",
            "Total instances",
            ValueKind::Integer,
            format!("sum({}) by (cluster)", instance_metric),
        ),
        MetricSpec::status(format!("sum({}) by (cluster, status)", instance_metric)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_battery_order() {
        let specs = static_specs("milvus_total_count");
        let names: Vec<String> = specs.iter().map(MetricSpec::describe).collect();
        assert_eq!(
            names,
            vec![
                "cpuRequest",
                "cpuLimit",
                "cpuUsage",
                "memoryRequest",
                "memoryLimit",
                "memoryUsage",
                "instanceTotal",
                "status"
            ]
        );
        assert!(specs.iter().all(MetricSpec::creates_report));
        assert_eq!(specs[6].query, "sum(milvus_total_count) by (cluster)");
        assert_eq!(specs[7].query, "sum(milvus_total_count) by (cluster, status)");
        assert_eq!(specs[7].kind, ValueKind::Integer);
    }
}
