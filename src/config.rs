use anyhow::{anyhow, Context, Result};
use chrono::{FixedOffset, Local};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::Config;

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let webhook_credential = required(env, "CHATBOT_WEBHOOK")?;
    let prometheus_address = required(env, "PROMETHEUS_ADDRESS")?;
    let notification_server = required(env, "NOTIFICATION_SERVER")?;

    let template_path = env
        .get_var("ALERT_TEMPLATE_PATH")
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("alert.json"));

    let node_group_label = env
        .get_var("NODE_GROUP_LABEL")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "label_node_group".to_string());

    let instance_metric = env
        .get_var("INSTANCE_METRIC")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "milvus_total_count".to_string());

    let utc_offset = match env
        .get_var("REPORT_UTC_OFFSET")
        .filter(|s| !s.trim().is_empty())
    {
        Some(raw) => parse_utc_offset(&raw).context("Invalid REPORT_UTC_OFFSET")?,
        None => *Local::now().offset(),
    };

    let report_title = env
        .get_var("REPORT_TITLE")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Cluster resource usage".to_string());

    Ok(Config {
        webhook_credential,
        prometheus_address,
        notification_server,
        template_path,
        node_group_label,
        instance_metric,
        query_timeout: seconds_or(env, "QUERY_TIMEOUT_SECONDS", 10),
        backend_timeout: seconds_or(env, "BACKEND_TIMEOUT_SECONDS", 5),
        run_deadline: seconds_or(env, "RUN_DEADLINE_SECONDS", 45),
        query_concurrency: env
            .get_var("QUERY_CONCURRENCY")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(4)
            .max(1),
        delivery_timeout: seconds_or(env, "DELIVERY_TIMEOUT_SECONDS", 10),
        utc_offset,
        report_title,
    })
}

fn required<E: EnvironmentProvider>(env: &E, key: &str) -> Result<String> {
    env.get_var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{} env var must be set", key))
}

fn seconds_or<E: EnvironmentProvider>(env: &E, key: &str, default: u64) -> Duration {
    let secs = env
        .get_var(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}

/// Parses `+HH:MM`, `-HH:MM` or `Z`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("zero offset out of range"));
    }
    raw.parse::<FixedOffset>()
        .map_err(|e| anyhow!("offset must look like +HH:MM: {} ({})", raw, e))
}
