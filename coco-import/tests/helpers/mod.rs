//! Shared fixtures for coco-import integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use coco_common::events::EventBus;
use coco_common::Catalog;
use coco_import::models::raw_asset::mime;
use coco_import::models::{RawAsset, SessionContext};
use coco_import::services::{
    AssetUrlRegistry, CommitReceipt, ImportRequest, ImportTransport, ImportValidator,
    SchemaRegistry, ServerPayload, TransportError,
};
use coco_import::ImportPipeline;
use serde_json::{json, Map, Value};
use tokio::sync::Semaphore;

pub const PLACEHOLDER: &str = "/images/placeholder.png";

/// `universities.csv` with three rows referencing two logos
pub fn universities_csv() -> RawAsset {
    RawAsset::new(
        "universities.csv",
        mime::CSV,
        b"name,logo_file,status\nMIT,mit.png,true\nCMU,cmu.png,True\nRice,,false\n".to_vec(),
    )
}

pub fn png(name: &str) -> RawAsset {
    RawAsset::new(
        name,
        mime::PNG,
        vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A],
    )
}

/// Preview payload the server returns for `universities_csv`
pub fn university_rows() -> Vec<Map<String, Value>> {
    rows(json!([
        {"name": "MIT", "logo_file": "mit.png", "status": true},
        {"name": "CMU", "logo_file": "cmu.png", "status": "True"},
        {"name": "Rice", "logo_file": "", "status": "false"}
    ]))
}

pub fn rows(value: Value) -> Vec<Map<String, Value>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => map,
                other => panic!("expected object, got {}", other),
            })
            .collect(),
        other => panic!("expected array, got {}", other),
    }
}

pub fn receipt(message: &str) -> ServerPayload {
    ServerPayload::Receipt(CommitReceipt {
        status: json!(200),
        message: json!(message),
        extra: Map::new(),
    })
}

/// Transport that replays queued outcomes and records every request
///
/// When gated, each call waits for a permit so tests can hold a response
/// in flight.
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<ServerPayload, TransportError>>>,
    calls: Mutex<Vec<ImportRequest>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Every call blocks until `release` is called once for it
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    pub fn push(&self, outcome: Result<ServerPayload, TransportError>) -> &Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    pub fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    pub fn calls(&self) -> Vec<ImportRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Poll until at least `n` calls were made
    pub async fn wait_for_calls(&self, n: usize) {
        for _ in 0..200 {
            if self.call_count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} transport calls, saw {}", n, self.call_count());
    }
}

#[async_trait]
impl ImportTransport for ScriptedTransport {
    async fn submit(&self, request: &ImportRequest) -> Result<ServerPayload, TransportError> {
        self.calls.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.unwrap();
            permit.forget();
        }

        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted outcome".to_string())))
    }
}

/// Pipeline over a scripted transport and an unserved URL registry
pub fn test_pipeline(transport: Arc<ScriptedTransport>) -> (ImportPipeline, Arc<AssetUrlRegistry>) {
    let urls = Arc::new(AssetUrlRegistry::new("http://127.0.0.1:1"));
    let context = SessionContext {
        validator: ImportValidator::new(),
        schema: Arc::new(SchemaRegistry::with_builtin_kinds(PLACEHOLDER)),
        urls: urls.clone(),
        translator: Arc::new(Catalog::identity()),
        lookups: None,
        alert_ttl: Duration::from_millis(5000),
    };
    (
        ImportPipeline::new(transport, context, EventBus::new(64)),
        urls,
    )
}
