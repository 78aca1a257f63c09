use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::types::{Config, NotificationPayload};

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("failed to send notification")]
    Transport(#[source] reqwest::Error),

    #[error("notification server returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub status: u16,
    pub body: String,
}

/// Destination for rendered payloads. One attempt per payload, no retries.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn send(&self, payload: &NotificationPayload) -> Result<DeliveryResponse, DeliveryError>;
}

/// Posts payloads as JSON to the notification server.
pub struct WebhookSink {
    http: reqwest::Client,
    endpoint: String,
}

impl WebhookSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeliveryError::Client)?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, DeliveryError> {
        Self::new(cfg.notification_server.clone(), cfg.delivery_timeout)
    }
}

#[async_trait]
impl DeliverySink for WebhookSink {
    async fn send(&self, payload: &NotificationPayload) -> Result<DeliveryResponse, DeliveryError> {
        let res = self
            .http
            .post(&self.endpoint)
            .json(&payload.body)
            .send()
            .await
            .map_err(DeliveryError::Transport)?;
        let status = res.status();
        let body = match res.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("failed to read notification server response (HTTP {}): {}", status, e);
                String::new()
            }
        };
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(DeliveryResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

/// Sends every payload concurrently. A failed cluster never blocks the others.
pub async fn deliver_all(
    sink: Arc<dyn DeliverySink>,
    payloads: Vec<NotificationPayload>,
) -> DeliverySummary {
    let mut set = JoinSet::new();
    for payload in payloads {
        let sink = Arc::clone(&sink);
        set.spawn(async move {
            let result = sink.send(&payload).await;
            (payload.cluster, result)
        });
    }

    let mut summary = DeliverySummary::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((cluster, Ok(response))) => {
                info!("sent report for cluster {}: RSP {} {}", cluster, response.status, response.body);
                summary.delivered.push(cluster);
            }
            Ok((cluster, Err(e))) => {
                warn!("delivery for cluster {} failed: {}", cluster, e);
                summary.failed.push(cluster);
            }
            Err(e) => error!("delivery task did not complete: {}", e),
        }
    }
    summary.delivered.sort();
    summary.failed.sort();
    summary
}
