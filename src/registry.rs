//! Provider registry and dispatch entry point
//!
//! Maps a provider key to its adapter behind the one
//! [`WatermarkRemover`] contract. Adding a backend means registering
//! one adapter; the dispatch path never changes. Dispatch itself is
//! pure routing: it holds no retry logic (that lives in each
//! adapter/poller pairing), never mutates the request's config, and
//! performs no network I/O for unknown providers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, UnmarkError};
use crate::providers::{
    GeminiRemover, OpenRouterRemover, PicwishRemover, PixelbinRemover, ReplicateRemover,
    SegmindRemover,
};
use crate::traits::WatermarkRemover;
use crate::types::{DispatchRequest, ImagePayload};
use crate::utils::CancelHandle;

/// Registry of watermark-removal adapters, keyed by provider id.
#[derive(Default)]
pub struct ProviderRegistry {
    by_id: HashMap<String, Arc<dyn WatermarkRemover>>,
}

impl ProviderRegistry {
    /// An empty registry; adapters must be registered explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in adapter registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PicwishRemover::new()));
        registry.register(Arc::new(SegmindRemover::new()));
        registry.register(Arc::new(ReplicateRemover::new()));
        registry.register(Arc::new(OpenRouterRemover::new()));
        registry.register(Arc::new(GeminiRemover::new()));
        registry.register(Arc::new(PixelbinRemover::new()));
        registry
    }

    /// Register an adapter under its own provider id, replacing any
    /// previous registration for that id.
    pub fn register(&mut self, adapter: Arc<dyn WatermarkRemover>) {
        self.by_id
            .insert(adapter.provider_id().as_str().to_string(), adapter);
    }

    /// Look up the adapter for a provider key.
    pub fn resolve(&self, provider_id: &str) -> Option<&Arc<dyn WatermarkRemover>> {
        self.by_id.get(provider_id)
    }

    /// Registered provider ids, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.by_id.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Process one request through the adapter its config selects.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<ImagePayload> {
        self.dispatch_with_cancel(request, &CancelHandle::new())
            .await
    }

    /// Like [`dispatch`](Self::dispatch), with a caller-held handle
    /// that can abandon the call at any suspension point.
    pub async fn dispatch_with_cancel(
        &self,
        request: DispatchRequest,
        cancel: &CancelHandle,
    ) -> Result<ImagePayload> {
        let provider = request.config.provider;
        let adapter = self.resolve(provider.as_str()).ok_or_else(|| {
            UnmarkError::UnsupportedProvider(provider.as_str().to_string())
        })?;

        debug!(%provider, content_type = %request.payload.content_type, "dispatching");
        let result = adapter.remove_watermark(&request, cancel).await;
        match &result {
            Ok(payload) => debug!(
                %provider,
                bytes = payload.bytes.len(),
                content_type = %payload.content_type,
                "dispatch succeeded"
            ),
            Err(err) => debug!(%provider, category = ?err.category(), "dispatch failed"),
        }
        result
    }
}
