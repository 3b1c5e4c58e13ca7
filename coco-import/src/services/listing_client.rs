//! Paginated re-fetch of the authoritative entity list
//!
//! Run by the caller after a commit lands; the session never uses it.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::import_transport::{extract_server_message, SuccessRange, TransportError};

/// One page of entities
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage {
    /// Total across all pages when the server reports it
    pub count: Option<u64>,
    pub results: Vec<Map<String, Value>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListingBody {
    Paginated {
        #[serde(default)]
        count: Option<u64>,
        results: Vec<Map<String, Value>>,
    },
    Bare(Vec<Map<String, Value>>),
}

#[derive(Debug, Clone)]
pub struct ListingClient {
    client: reqwest::Client,
    endpoint: String,
    page_size: u32,
    success: SuccessRange,
}

impl ListingClient {
    pub fn new(
        endpoint: impl Into<String>,
        page_size: u32,
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
            page_size,
            success,
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// `GET <endpoint>?page=<page>&page_size=<page size>`
    pub async fn fetch_page(&self, page: u32) -> Result<ListingPage, TransportError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("page", page), ("page_size", self.page_size)])
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
            return Err(TransportError::Status { status, message });
        }

        let page_data = parse_listing(&body)?;
        tracing::debug!(
            endpoint = %self.endpoint,
            page,
            records = page_data.results.len(),
            "Fetched listing page"
        );
        Ok(page_data)
    }
}

/// Accept either a bare array or `{count, results}`
pub fn parse_listing(body: &[u8]) -> Result<ListingPage, TransportError> {
    let parsed: ListingBody =
        serde_json::from_slice(body).map_err(|e| TransportError::Decode(e.to_string()))?;

    Ok(match parsed {
        ListingBody::Paginated { count, results } => ListingPage { count, results },
        ListingBody::Bare(results) => ListingPage {
            count: None,
            results,
        },
    })
}
