use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{Config, Sample};

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid metrics backend address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("request to metrics backend failed")]
    Transport(#[source] reqwest::Error),

    #[error("metrics backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("metrics backend rejected query ({error_type}): {message}")]
    Backend { error_type: String, message: String },

    #[error("unexpected result type {0}, expected vector or scalar")]
    UnexpectedResultType(String),

    #[error("failed to decode query response: {0}")]
    Decode(String),
}

/// Samples and non-fatal warnings produced by one instant query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    pub samples: Vec<Sample>,
    pub warnings: Vec<String>,
}

/// An instant-query endpoint. Implementations are read-only and may be called concurrently.
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(&self, expr: &str) -> Result<QueryResponse, QueryError>;
}

/// Client for the Prometheus HTTP API (`/api/v1/query`).
pub struct PrometheusClient {
    http: reqwest::Client,
    endpoint: Url,
    backend_timeout: Duration,
}

impl PrometheusClient {
    pub fn new(
        address: &str,
        query_timeout: Duration,
        backend_timeout: Duration,
    ) -> Result<Self, QueryError> {
        let invalid = |reason: String| QueryError::InvalidAddress {
            address: address.to_string(),
            reason,
        };
        let endpoint = Url::parse(&format!("{}/api/v1/query", address.trim().trim_end_matches('/')))
            .map_err(|e| invalid(e.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", endpoint.scheme())));
        }

        let http = reqwest::Client::builder()
            .timeout(query_timeout)
            .build()
            .map_err(QueryError::Client)?;

        Ok(Self {
            http,
            endpoint,
            backend_timeout,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, QueryError> {
        Self::new(&cfg.prometheus_address, cfg.query_timeout, cfg.backend_timeout)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl QueryClient for PrometheusClient {
    async fn query(&self, expr: &str) -> Result<QueryResponse, QueryError> {
        let time = format!("{:.3}", Utc::now().timestamp_millis() as f64 / 1000.0);
        let timeout = format!("{}s", self.backend_timeout.as_secs().max(1));
        debug!("querying {}: {}", self.endpoint, expr);

        let res = self
            .http
            .post(self.endpoint.clone())
            .form(&[("query", expr), ("time", time.as_str()), ("timeout", timeout.as_str())])
            .send()
            .await
            .map_err(QueryError::Transport)?;
        let status = res.status();
        let body = res.text().await.map_err(QueryError::Transport)?;

        // Prometheus reports query errors as JSON with a 4xx/5xx status, so decode first.
        let response = match decode_response(&body) {
            Ok(response) => response,
            Err(QueryError::Decode(_)) if !status.is_success() => {
                return Err(QueryError::Http {
                    status: status.as_u16(),
                    body,
                })
            }
            Err(e) => return Err(e),
        };
        if !response.warnings.is_empty() {
            warn!("query returned warnings: {:?} ({})", response.warnings, expr);
        }
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    status: String,
    data: Option<ApiData>,
    error_type: Option<String>,
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiData {
    result_type: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct VectorEntry {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    value: (f64, String),
}

/// Decodes a `/api/v1/query` response body into samples.
pub fn decode_response(body: &str) -> Result<QueryResponse, QueryError> {
    let api: ApiResponse =
        serde_json::from_str(body).map_err(|e| QueryError::Decode(e.to_string()))?;

    if api.status != "success" {
        return Err(QueryError::Backend {
            error_type: api.error_type.unwrap_or_else(|| "unknown".to_string()),
            message: api.error.unwrap_or_default(),
        });
    }
    let data = api
        .data
        .ok_or_else(|| QueryError::Decode("missing data".to_string()))?;

    let samples = match data.result_type.as_str() {
        "vector" => {
            let entries: Vec<VectorEntry> = serde_json::from_value(data.result)
                .map_err(|e| QueryError::Decode(e.to_string()))?;
            entries
                .into_iter()
                .map(|entry| {
                    Ok(Sample {
                        labels: entry.metric,
                        value: parse_sample_value(&entry.value.1)?,
                    })
                })
                .collect::<Result<Vec<_>, QueryError>>()?
        }
        "scalar" => {
            let (_, raw): (f64, String) = serde_json::from_value(data.result)
                .map_err(|e| QueryError::Decode(e.to_string()))?;
            vec![Sample {
                labels: BTreeMap::new(),
                value: parse_sample_value(&raw)?,
            }]
        }
        other => return Err(QueryError::UnexpectedResultType(other.to_string())),
    };

    Ok(QueryResponse {
        samples,
        warnings: api.warnings,
    })
}

fn parse_sample_value(raw: &str) -> Result<f64, QueryError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| QueryError::Decode(format!("non-numeric sample value {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_vector_response() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"cluster": "prod"}, "value": [1700000000.5, "0.42"]},
                    {"metric": {"cluster": "uat", "status": "Healthy"}, "value": [1700000000.5, "7"]}
                ]
            }
        }"#;

        let response = decode_response(body).unwrap();
        assert_eq!(response.samples.len(), 2);
        assert_eq!(response.samples[0].cluster(), Some("prod"));
        assert_eq!(response.samples[0].value, 0.42);
        assert_eq!(response.samples[1].label("status"), Some("Healthy"));
        assert!(response.warnings.is_empty());
    }

    #[test]
    fn test_decode_scalar_and_warnings() {
        let body = r#"{
            "status": "success",
            "data": {"resultType": "scalar", "result": [1700000000, "3"]},
            "warnings": ["partial response"]
        }"#;

        let response = decode_response(body).unwrap();
        assert_eq!(response.samples.len(), 1);
        assert!(response.samples[0].labels.is_empty());
        assert_eq!(response.samples[0].value, 3.0);
        assert_eq!(response.warnings, vec!["partial response".to_string()]);
    }

    #[test]
    fn test_decode_backend_error() {
        let body = r#"{"status": "error", "errorType": "bad_data", "error": "parse error at char 4"}"#;
        match decode_response(body) {
            Err(QueryError::Backend { error_type, message }) => {
                assert_eq!(error_type, "bad_data");
                assert!(message.contains("parse error"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_matrix_and_garbage() {
        let body = r#"{"status": "success", "data": {"resultType": "matrix", "result": []}}"#;
        assert!(matches!(
            decode_response(body),
            Err(QueryError::UnexpectedResultType(t)) if t == "matrix"
        ));

        assert!(matches!(decode_response("<html>"), Err(QueryError::Decode(_))));

        let body = r#"{"status": "success", "data": {"resultType": "vector", "result": [
            {"metric": {"cluster": "prod"}, "value": [1, "lots"]}
        ]}}"#;
        assert!(matches!(decode_response(body), Err(QueryError::Decode(_))));
    }

    #[test]
    fn test_client_rejects_bad_address() {
        let timeout = Duration::from_secs(1);
        assert!(matches!(
            PrometheusClient::new("not a url", timeout, timeout),
            Err(QueryError::InvalidAddress { .. })
        ));
        assert!(matches!(
            PrometheusClient::new("ftp://prometheus", timeout, timeout),
            Err(QueryError::InvalidAddress { .. })
        ));

        let client = PrometheusClient::new("http://prometheus:9090/", timeout, timeout).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://prometheus:9090/api/v1/query");
    }
}
