//! Session-scoped asset URLs
//!
//! Staged assets get a URL that stays valid until the session releases it.
//! `AssetUrlRegistry` keeps the bytes in memory and serves them over a local
//! axum listener so any grid renderer can load them like remote images.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{AssetUrl, RawAsset};
use crate::Result;

/// Acquire/release discipline for asset URLs
pub trait ObjectUrlStore: Send + Sync {
    /// Issue a new URL for the asset's bytes
    fn acquire(&self, asset: &RawAsset) -> AssetUrl;

    /// Invalidate a URL; releasing twice is a no-op
    fn release(&self, url: &AssetUrl);

    /// URLs acquired and not yet released
    fn live_count(&self) -> usize;
}

/// In-memory URL registry served at `<base>/assets/<token>`
#[derive(Clone)]
pub struct AssetUrlRegistry {
    base_url: String,
    entries: Arc<RwLock<HashMap<Uuid, RawAsset>>>,
}

impl AssetUrlRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Bind `127.0.0.1:<port>` (0 = ephemeral) and serve the registry
    pub async fn serve(port: u16) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let addr = listener.local_addr()?;

        let registry = Self::new(format!("http://{}", addr));
        let app = registry.router();

        info!("Asset server listening on http://{}", addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!(error = %e, "Asset server stopped");
            }
        });

        Ok(registry)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/assets/:token", get(serve_asset))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    /// Asset behind a live token
    pub fn lookup(&self, token: Uuid) -> Option<RawAsset> {
        self.read().get(&token).cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, RawAsset>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, RawAsset>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ObjectUrlStore for AssetUrlRegistry {
    fn acquire(&self, asset: &RawAsset) -> AssetUrl {
        let token = Uuid::new_v4();
        self.write().insert(token, asset.clone());
        debug!(token = %token, asset = %asset.name(), "Acquired asset URL");
        AssetUrl::new(token, format!("{}/assets/{}", self.base_url, token))
    }

    fn release(&self, url: &AssetUrl) {
        if self.write().remove(&url.token()).is_some() {
            debug!(token = %url.token(), "Released asset URL");
        }
    }

    fn live_count(&self) -> usize {
        self.read().len()
    }
}

async fn serve_asset(
    State(registry): State<AssetUrlRegistry>,
    Path(token): Path<Uuid>,
) -> impl IntoResponse {
    match registry.lookup(token) {
        Some(asset) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, asset.mime_type().to_string())],
            asset.bytes().to_vec(),
        )
            .into_response(),
        None => {
            debug!(token = %token, "Asset URL not live");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::raw_asset::mime;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn path_of(url: &AssetUrl) -> String {
        format!("/assets/{}", url.token())
    }

    #[test]
    fn test_acquire_and_release_track_live_count() {
        let registry = AssetUrlRegistry::new("http://127.0.0.1:9000/");
        let asset = RawAsset::new("a.png", mime::PNG, vec![1u8, 2, 3]);

        let first = registry.acquire(&asset);
        let second = registry.acquire(&asset);
        assert_ne!(first, second);
        assert_eq!(registry.live_count(), 2);
        assert!(first
            .as_str()
            .starts_with("http://127.0.0.1:9000/assets/"));

        registry.release(&first);
        registry.release(&first);
        assert_eq!(registry.live_count(), 1);
    }

    #[tokio::test]
    async fn test_router_serves_live_asset() {
        let registry = AssetUrlRegistry::new("http://localhost");
        let url = registry.acquire(&RawAsset::new("a.png", mime::PNG, vec![9u8, 8, 7]));

        let response = registry
            .router()
            .oneshot(
                Request::builder()
                    .uri(path_of(&url))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], &[9u8, 8, 7]);
    }

    #[tokio::test]
    async fn test_router_404_after_release() {
        let registry = AssetUrlRegistry::new("http://localhost");
        let url = registry.acquire(&RawAsset::new("a.png", mime::PNG, vec![1u8]));
        registry.release(&url);

        let response = registry
            .router()
            .oneshot(
                Request::builder()
                    .uri(path_of(&url))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_binds_ephemeral_port() {
        let registry = AssetUrlRegistry::serve(0).await.unwrap();
        assert!(registry.base_url().starts_with("http://127.0.0.1:"));
        assert!(!registry.base_url().ends_with(":0"));
    }
}
