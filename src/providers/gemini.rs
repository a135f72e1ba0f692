//! Gemini adapter
//!
//! Talks to the public `generateContent` endpoint with a text prompt
//! plus inline image data. Like every conversational surface here, it
//! cannot return edited image bytes, so the adapter walks a short
//! ordered list of candidate models (the configured one first), skips
//! candidates the backend does not know, and terminates with a
//! capability-unsupported error referencing the last model attempted
//! and carrying its textual reply.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use tracing::debug;

use crate::codec::to_base64;
use crate::error::{Result, UnmarkError};
use crate::traits::WatermarkRemover;
use crate::types::{DispatchRequest, ImagePayload, ProviderId};
use crate::utils::CancelHandle;

use super::{REMOVAL_PROMPT, classify_error_response, require_api_key};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Candidates tried in order when the config names no model.
const CANDIDATE_MODELS: [&str; 2] = ["gemini-2.5-flash-image", "gemini-2.0-flash"];

const KEY_GUIDANCE: &str = "Create a key at https://aistudio.google.com/apikey.";

/// Gemini adapter
#[derive(Debug, Clone)]
pub struct GeminiRemover {
    http_client: HttpClient,
    base_url: String,
}

impl Default for GeminiRemover {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiRemover {
    pub fn new() -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
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

    fn candidates(&self, configured: Option<&str>) -> Vec<String> {
        let mut models: Vec<String> = Vec::new();
        if let Some(model) = configured {
            models.push(model.to_string());
        }
        for candidate in CANDIDATE_MODELS {
            if !models.iter().any(|m| m == candidate) {
                models.push(candidate.to_string());
            }
        }
        models
    }

    /// One generateContent call. `Ok(Some(text))` is the model's reply;
    /// `Ok(None)` means this model is unknown to the backend and the
    /// next candidate should be tried.
    async fn generate(
        &self,
        payload: &ImagePayload,
        api_key: &str,
        model: &str,
        cancel: &CancelHandle,
    ) -> Result<Option<String>> {
        let body = serde_json::json!({
            "contents": {
                "parts": [
                    { "text": REMOVAL_PROMPT },
                    {
                        "inline_data": {
                            "mime_type": payload.content_type,
                            "data": to_base64(payload),
                        }
                    },
                ],
            },
        });

        let response = cancel
            .guard(async {
                self.http_client
                    .post(format!(
                        "{}/v1beta/models/{model}:generateContent",
                        self.base_url
                    ))
                    .header("x-goog-api-key", api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| UnmarkError::HttpError(e.to_string()))
            })
            .await?;

        if response.status().as_u16() == 404 {
            debug!(model, "model not available, trying next candidate");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(classify_error_response(response, "Gemini", KEY_GUIDANCE).await);
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| UnmarkError::ParseError(format!("Gemini response: {e}")))?;

        let text = json
            .pointer("/candidates/0/content/parts")
            .and_then(|parts| parts.as_array())
            .and_then(|parts| {
                parts
                    .iter()
                    .find_map(|part| part.get("text").and_then(|t| t.as_str()))
            })
            .unwrap_or("the model returned no text")
            .to_string();

        Ok(Some(text))
    }
}

#[async_trait]
impl WatermarkRemover for GeminiRemover {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn remove_watermark(
        &self,
        request: &DispatchRequest,
        cancel: &CancelHandle,
    ) -> Result<ImagePayload> {
        let api_key = require_api_key(&request.config, KEY_GUIDANCE)?;

        let models = self.candidates(request.config.model.as_deref());
        let mut last_model = models
            .first()
            .cloned()
            .unwrap_or_else(|| "gemini".to_string());
        let mut last_reply = "no candidate model was available".to_string();

        for model in &models {
            last_model = model.clone();
            if let Some(reply) = self
                .generate(&request.payload, &api_key, model, cancel)
                .await?
            {
                last_reply = reply;
                break;
            }
        }

        // The conversational surface can only describe the image.
        Err(UnmarkError::UnsupportedOperation(format!(
            "Gemini's chat interface cannot return edited image bytes; use the picwish or \
             segmind provider for actual watermark removal. \
             Model ({last_model}) reply: {last_reply}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_model_is_tried_first_without_duplicates() {
        let adapter = GeminiRemover::new();
        let models = adapter.candidates(Some("gemini-2.0-flash"));
        assert_eq!(models, vec!["gemini-2.0-flash", "gemini-2.5-flash-image"]);

        let defaults = adapter.candidates(None);
        assert_eq!(defaults, vec!["gemini-2.5-flash-image", "gemini-2.0-flash"]);
    }
}
