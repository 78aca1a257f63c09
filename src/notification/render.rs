use chrono::{DateTime, FixedOffset, Utc};

use crate::notification::template::AlertTemplate;
use crate::report::ClusterReport;
use crate::types::{Config, FieldSection, NotificationPayload};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Turns a cluster report into the payload posted to the notification server.
pub struct ReportRenderer {
    template: AlertTemplate,
    credential: String,
    title: String,
    offset: FixedOffset,
}

impl ReportRenderer {
    pub fn new(
        template: AlertTemplate,
        credential: impl Into<String>,
        title: impl Into<String>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            template,
            credential: credential.into(),
            title: title.into(),
            offset,
        }
    }

    pub fn from_config(template: AlertTemplate, cfg: &Config) -> Self {
        Self::new(
            template,
            cfg.webhook_credential.clone(),
            cfg.report_title.clone(),
            cfg.utc_offset,
        )
    }

    pub fn render(&self, report: &ClusterReport) -> NotificationPayload {
        self.render_at(report, Utc::now().with_timezone(&self.offset))
    }

    pub fn render_at(&self, report: &ClusterReport, now: DateTime<FixedOffset>) -> NotificationPayload {
        let timestamp = now.format(TIME_FORMAT).to_string();
        let message = render_message(&self.title, report, &timestamp);
        let labels = payload_labels(report, &timestamp);
        NotificationPayload {
            cluster: report.cluster.clone(),
            body: self
                .template
                .fill(&self.credential, &report.cluster, &labels, &message),
        }
    }
}

/// Human-readable report: summary lines, one block per node group, then the time.
pub fn render_message(title: &str, report: &ClusterReport, timestamp: &str) -> String {
    let mut lines: Vec<String> = vec![format!("{}: {}", title, report.cluster)];
    for field in report.summary_fields() {
        lines.push(format!("{}: {}", field.label, field.value));
    }

    for (group, fields) in report.node_groups() {
        lines.push(String::new());
        lines.push(format!("[{}]", group));
        for field in fields {
            lines.push(format!("{}: {}", field.label, field.value));
        }
    }

    lines.push(format!("Time: {}", timestamp));
    lines.join("\n")
}

/// Alert labels keyed by display label; node group labels are prefixed with the group.
pub fn payload_labels(report: &ClusterReport, timestamp: &str) -> Vec<(String, String)> {
    let mut labels: Vec<(String, String)> = report
        .fields
        .iter()
        .map(|field| {
            let key = match &field.section {
                FieldSection::Summary => field.label.clone(),
                FieldSection::NodeGroup(tag) => format!("{} {}", tag.group, field.label),
            };
            (key, field.value.clone())
        })
        .collect();
    labels.push(("Time".to_string(), timestamp.to_string()));
    labels
}
