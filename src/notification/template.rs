use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

const WEBHOOK: &str = "/receiver/spec/feishu/chatbot/webhook";
const ALERT: &str = "/alert/alerts/0";
const LABELS: &str = "/alert/alerts/0/labels";
const ANNOTATIONS: &str = "/alert/alerts/0/annotations";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to read alert template {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("alert template is not valid JSON")]
    Parse(#[source] serde_json::Error),

    #[error("alert template has no object at {0}")]
    MissingSlot(&'static str),
}

/// The notification envelope. Only the webhook credential, the alert status,
/// the alert labels and the alert message are ever touched.
#[derive(Debug, Clone)]
pub struct AlertTemplate {
    document: Value,
}

impl AlertTemplate {
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let raw = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, TemplateError> {
        let document: Value = serde_json::from_str(raw).map_err(TemplateError::Parse)?;
        Self::from_value(document)
    }

    pub fn from_value(mut document: Value) -> Result<Self, TemplateError> {
        for slot in [WEBHOOK, ALERT, LABELS] {
            if !document.pointer(slot).map(Value::is_object).unwrap_or(false) {
                return Err(TemplateError::MissingSlot(slot));
            }
        }

        let alert = document
            .pointer_mut(ALERT)
            .and_then(Value::as_object_mut)
            .ok_or(TemplateError::MissingSlot(ALERT))?;
        let annotations = alert
            .entry("annotations")
            .or_insert_with(|| Value::Object(Map::new()));
        if !annotations.is_object() {
            return Err(TemplateError::MissingSlot(ANNOTATIONS));
        }

        Ok(Self { document })
    }

    /// Returns a filled copy of the template; the template itself is reused across clusters.
    pub fn fill(
        &self,
        credential: &str,
        cluster: &str,
        labels: &[(String, String)],
        message: &str,
    ) -> Value {
        let mut document = self.document.clone();

        if let Some(webhook) = object_at(&mut document, WEBHOOK) {
            webhook.insert("value".to_string(), Value::String(credential.to_string()));
        }
        if let Some(alert) = object_at(&mut document, ALERT) {
            alert.insert("status".to_string(), Value::String(cluster.to_string()));
        }
        if let Some(slot) = object_at(&mut document, LABELS) {
            for (key, value) in labels {
                slot.insert(key.clone(), Value::String(value.clone()));
            }
        }
        if let Some(annotations) = object_at(&mut document, ANNOTATIONS) {
            annotations.insert("message".to_string(), Value::String(message.to_string()));
        }

        document
    }
}

fn object_at<'a>(document: &'a mut Value, pointer: &str) -> Option<&'a mut Map<String, Value>> {
    document.pointer_mut(pointer).and_then(Value::as_object_mut)
}
