//! Provider adapters
//!
//! One module per backend, each implementing
//! [`WatermarkRemover`](crate::traits::WatermarkRemover) over its own
//! wire protocol. Shared plumbing lives here: credential presence
//! checks, error-body mining, and result-image download.

pub mod gemini;
pub mod openrouter;
pub mod picwish;
pub mod pixelbin;
pub mod replicate;
pub mod segmind;

pub use gemini::GeminiRemover;
pub use openrouter::OpenRouterRemover;
pub use picwish::PicwishRemover;
pub use pixelbin::PixelbinRemover;
pub use replicate::ReplicateRemover;
pub use segmind::SegmindRemover;

use reqwest::header::CONTENT_TYPE;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::codec::DEFAULT_IMAGE_TYPE;
use crate::error::{Result, UnmarkError};
use crate::types::{ImagePayload, ProviderConfig};
use crate::utils::CancelHandle;
use crate::utils::mime::{guess_image_mime, is_image_content_type};

/// Instruction sent to the chat-completion family. Kept in one place so
/// both adapters phrase the task identically.
pub(crate) const REMOVAL_PROMPT: &str = "Remove any watermarks, logos, text overlays, or date \
     stamps from this image. Reconstruct the background seamlessly where the watermark was \
     removed to make it look like the original photo. Return ONLY the processed image.";

/// Expose the configured API key, or fail with the provider's sign-up
/// guidance before any network I/O happens.
pub(crate) fn require_api_key(config: &ProviderConfig, guidance: &str) -> Result<String> {
    let key = config.api_key.expose_secret();
    if key.trim().is_empty() {
        return Err(UnmarkError::MissingApiKey(format!(
            "{} API key is required. {guidance}",
            config.provider
        )));
    }
    Ok(key.to_string())
}

/// Pull a human-readable message out of a provider error body. Provider
/// error schemas disagree on the field name; this checks the ones seen
/// in the wild, including the nested `error.message` shape.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["message", "msg", "detail"] {
        if let Some(text) = json.get(key).and_then(|v| v.as_str()) {
            return Some(text.to_string());
        }
    }
    match json.get("error") {
        Some(serde_json::Value::String(text)) => Some(text.clone()),
        Some(obj) => obj
            .get("message")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        None => None,
    }
}

/// Map a non-success HTTP response to a classified error. Credential
/// rejections get their own kind with a message that names the provider
/// and, where one exists, a working alternative.
pub(crate) async fn classify_error_response(
    response: reqwest::Response,
    provider_label: &str,
    auth_hint: &str,
) -> UnmarkError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body).unwrap_or_else(|| {
        if body.is_empty() {
            status.to_string()
        } else {
            body.clone()
        }
    });

    if status.as_u16() == 401 || status.as_u16() == 403 || looks_like_auth_failure(&message) {
        return UnmarkError::AuthenticationError(format!(
            "{provider_label} rejected the API key. {auth_hint}"
        ));
    }

    UnmarkError::ApiError {
        code: status.as_u16(),
        message: format!("{provider_label}: {message}"),
        details: serde_json::from_str(&body).ok(),
    }
}

pub(crate) fn looks_like_auth_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("api key") || lower.contains("unauthorized") || lower.contains("invalid token")
}

/// Download a processed result image and decode it into a payload.
///
/// Content type comes from the response header when it names an image
/// type; otherwise the bytes are sniffed by magic number, falling back
/// to `image/png`; several providers serve results as untyped octet
/// streams.
pub(crate) async fn fetch_image_payload(
    client: &reqwest::Client,
    url: &str,
    cancel: &CancelHandle,
) -> Result<ImagePayload> {
    debug!(url, "downloading processed image");
    let response = cancel
        .guard(async {
            client
                .get(url)
                .send()
                .await
                .map_err(|e| UnmarkError::HttpError(e.to_string()))
        })
        .await?;

    if !response.status().is_success() {
        return Err(UnmarkError::api_error(
            response.status().as_u16(),
            format!("failed to download result image from {url}"),
        ));
    }

    let declared = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| is_image_content_type(ct))
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_string());

    let bytes = cancel
        .guard(async {
            response
                .bytes()
                .await
                .map_err(|e| UnmarkError::HttpError(e.to_string()))
        })
        .await?
        .to_vec();

    if bytes.is_empty() {
        return Err(UnmarkError::ParseError(format!(
            "result download from {url} returned an empty body"
        )));
    }

    let content_type = declared
        .or_else(|| guess_image_mime(&bytes))
        .unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_string());

    Ok(ImagePayload::new(bytes, content_type))
}
