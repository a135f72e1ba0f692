//! OpenRouter adapter
//!
//! OpenRouter fronts vision models behind an OpenAI-compatible chat
//! API. That surface can describe an image but cannot hand back edited
//! image bytes, so this adapter never reports success: it forwards the
//! request, captures the model's textual reply, and terminates with a
//! capability-unsupported error pointing at a provider that actually
//! edits images. The reply text is kept as diagnostic detail.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use tracing::debug;

use crate::codec::to_data_uri;
use crate::error::{Result, UnmarkError};
use crate::traits::WatermarkRemover;
use crate::types::{DispatchRequest, ImagePayload, ProviderId};
use crate::utils::CancelHandle;

use super::{REMOVAL_PROMPT, classify_error_response, require_api_key};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai";
const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-exp:free";

const KEY_GUIDANCE: &str = "Create a key at https://openrouter.ai/keys.";

/// OpenRouter adapter
#[derive(Debug, Clone)]
pub struct OpenRouterRemover {
    http_client: HttpClient,
    base_url: String,
    /// Optional `HTTP-Referer` attribution header.
    referer: Option<String>,
    /// Optional `X-Title` attribution header.
    title: Option<String>,
}

impl Default for OpenRouterRemover {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenRouterRemover {
    pub fn new() -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            referer: None,
            title: None,
        }
    }

    /// Override the API origin (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a caller-supplied HTTP client.
    pub fn with_http_client(mut self, http_client: HttpClient) -> Self {
        self.http_client = http_client;
        self
    }

    /// Set the `HTTP-Referer` attribution header OpenRouter uses for
    /// app rankings.
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Set the `X-Title` attribution header.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    async fn chat(
        &self,
        payload: &ImagePayload,
        api_key: &str,
        model: &str,
        cancel: &CancelHandle,
    ) -> Result<String> {
        let body = serde_json::json!({
            "model": model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": REMOVAL_PROMPT },
                    { "type": "image_url", "image_url": { "url": to_data_uri(payload) } },
                ],
            }],
            "max_tokens": 4096,
        });

        let mut request = self
            .http_client
            .post(format!("{}/api/v1/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body);
        if let Some(referer) = &self.referer {
            request = request.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.title {
            request = request.header("X-Title", title);
        }

        let response = cancel
            .guard(async {
                request
                    .send()
                    .await
                    .map_err(|e| UnmarkError::HttpError(e.to_string()))
            })
            .await?;

        if !response.status().is_success() {
            return Err(classify_error_response(response, "OpenRouter", KEY_GUIDANCE).await);
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| UnmarkError::ParseError(format!("OpenRouter response: {e}")))?;

        json.pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                UnmarkError::ParseError(
                    "OpenRouter response carried no message content".to_string(),
                )
            })
    }
}

#[async_trait]
impl WatermarkRemover for OpenRouterRemover {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Openrouter
    }

    async fn remove_watermark(
        &self,
        request: &DispatchRequest,
        cancel: &CancelHandle,
    ) -> Result<ImagePayload> {
        let api_key = require_api_key(&request.config, KEY_GUIDANCE)?;
        let model = request.config.model.as_deref().unwrap_or(DEFAULT_MODEL);

        let reply = self
            .chat(&request.payload, &api_key, model, cancel)
            .await?;
        debug!(model, "OpenRouter returned text instead of image bytes");

        // The chat surface analyzed the image; it cannot edit it.
        Err(UnmarkError::UnsupportedOperation(format!(
            "OpenRouter vision models analyze images but cannot return edited image bytes; \
             use the picwish or segmind provider for actual watermark removal. \
             Model ({model}) reply: {reply}"
        )))
    }
}
