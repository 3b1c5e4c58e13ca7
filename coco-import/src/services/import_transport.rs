//! Import endpoint client
//!
//! Preview and commit share one endpoint and one multipart shape; the
//! `preview` field tells the server whether to persist.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{EntityKind, RawAsset};

pub const GENERIC_FAILURE_KEY: &str = "Import request failed. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be built
    #[error("Request error: {0}")]
    Request(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Status outside the configured success range
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    /// Body was not the JSON shape expected for the request
    #[error("Decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// Message supplied by the server, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            TransportError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// `[min, max)` range of statuses treated as success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessRange {
    pub min: u16,
    pub max: u16,
}

impl SuccessRange {
    pub fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, status: u16) -> bool {
        status >= self.min && status < self.max
    }
}

impl Default for SuccessRange {
    fn default() -> Self {
        Self::new(200, 300)
    }
}

/// One submission: the primary file plus its staged assets
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub entity_kind: EntityKind,
    pub primary_file: RawAsset,
    pub asset_files: Vec<RawAsset>,
    pub preview: bool,
}

/// Commit acknowledgement `{status, message, ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitReceipt {
    #[serde(default)]
    pub status: Value,
    /// Usually a string, but any JSON is accepted
    #[serde(default)]
    pub message: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommitReceipt {
    /// `message` when it is a non-blank string
    pub fn display_message(&self) -> Option<&str> {
        self.message.as_str().filter(|m| !m.trim().is_empty())
    }
}

/// Parsed success body
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPayload {
    /// Preview: one object per parsed row
    Records(Vec<Map<String, Value>>),
    /// Commit acknowledgement
    Receipt(CommitReceipt),
}

#[async_trait]
pub trait ImportTransport: Send + Sync {
    async fn submit(&self, request: &ImportRequest) -> Result<ServerPayload, TransportError>;
}

/// reqwest multipart implementation
#[derive(Debug, Clone)]
pub struct HttpImportTransport {
    client: reqwest::Client,
    endpoint: String,
    success: SuccessRange,
}

impl HttpImportTransport {
    pub fn new(
        endpoint: impl Into<String>,
        success: SuccessRange,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            success,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form(request: &ImportRequest) -> Result<Form, TransportError> {
        let mut form = Form::new()
            .part("file", file_part(&request.primary_file)?)
            .text("type", request.entity_kind.as_str())
            .text("preview", if request.preview { "true" } else { "false" });

        for asset in &request.asset_files {
            form = form.part("document_file", file_part(asset)?);
        }

        Ok(form)
    }
}

fn file_part(asset: &RawAsset) -> Result<Part, TransportError> {
    Part::bytes(asset.bytes().to_vec())
        .file_name(asset.name().to_string())
        .mime_str(asset.mime_type())
        .map_err(|e| TransportError::Request(format!("{}: {}", asset.name(), e)))
}

#[async_trait]
impl ImportTransport for HttpImportTransport {
    async fn submit(&self, request: &ImportRequest) -> Result<ServerPayload, TransportError> {
        let form = Self::build_form(request)?;

        tracing::debug!(
            endpoint = %self.endpoint,
            kind = %request.entity_kind,
            preview = request.preview,
            assets = request.asset_files.len(),
            "Submitting import request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !self.success.contains(status) {
            let message = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|v| extract_server_message(&v));
            tracing::warn!(status, message = ?message, "Import request rejected");
            return Err(TransportError::Status { status, message });
        }

        let value: Value =
            serde_json::from_slice(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
        parse_payload(value, request.preview)
    }
}

/// Pull a human-readable message out of an error body
///
/// Recognizes `message`, `error` (string or `{message}`) and `detail`.
pub fn extract_server_message(body: &Value) -> Option<String> {
    let obj = body.as_object()?;

    if let Some(Value::String(msg)) = obj.get("message") {
        return Some(msg.clone());
    }
    match obj.get("error") {
        Some(Value::String(msg)) => return Some(msg.clone()),
        Some(Value::Object(err)) => {
            if let Some(Value::String(msg)) = err.get("message") {
                return Some(msg.clone());
            }
        }
        _ => {}
    }
    match obj.get("detail") {
        Some(Value::String(msg)) => Some(msg.clone()),
        _ => None,
    }
}

/// Shape-check a success body: array of objects for preview, object for commit
pub fn parse_payload(value: Value, preview: bool) -> Result<ServerPayload, TransportError> {
    if preview {
        let Value::Array(items) = value else {
            return Err(TransportError::Decode(
                "preview response is not a JSON array".to_string(),
            ));
        };
        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(map),
                _ => Err(TransportError::Decode(format!(
                    "preview record {} is not a JSON object",
                    i
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ServerPayload::Records)
    } else {
        if !value.is_object() {
            return Err(TransportError::Decode(
                "commit response is not a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value)
            .map(ServerPayload::Receipt)
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}
