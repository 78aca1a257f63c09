use chrono::FixedOffset;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub webhook_credential: String,
    pub prometheus_address: String,
    pub notification_server: String,
    pub template_path: PathBuf,
    pub node_group_label: String,
    pub instance_metric: String,
    pub query_timeout: Duration,
    pub backend_timeout: Duration,
    pub run_deadline: Duration,
    pub query_concurrency: usize,
    pub delivery_timeout: Duration,
    pub utc_offset: FixedOffset,
    pub report_title: String,
}

/// One labeled scalar returned by an instant query.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl Sample {
    pub fn new<I, K, V>(labels: I, value: f64) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            value,
        }
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    pub fn cluster(&self) -> Option<&str> {
        self.label("cluster").filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Percentage,
    Integer,
}

/// Which node group a field belongs to, and where it sits inside that group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTag {
    pub group: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSection {
    Summary,
    NodeGroup(GroupTag),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub value: String,
    pub section: FieldSection,
}

/// The fully populated notification template for one cluster.
#[derive(Debug, Clone)]
pub struct NotificationPayload {
    pub cluster: String,
    pub body: serde_json::Value,
}
