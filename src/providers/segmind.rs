//! Segmind workflow adapter
//!
//! Submit returns a dedicated poll URL which must be used verbatim;
//! the status endpoint is not reconstructable from a job id. The
//! completed job's `output` field is itself a JSON-encoded string; the
//! image URL sits at `output[0].value.data` after the secondary parse.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::codec::to_data_uri;
use crate::error::{Result, UnmarkError};
use crate::poller::{PollPolicy, poll_until_terminal};
use crate::traits::WatermarkRemover;
use crate::types::{DispatchRequest, ImagePayload, Job, JobStatus, ProviderId};
use crate::utils::CancelHandle;

use super::{classify_error_response, fetch_image_payload, require_api_key};

const DEFAULT_BASE_URL: &str = "https://api.segmind.com";

/// Pinned watermark-remover pixelflow revision.
const WORKFLOW_ID: &str = "67ea59aef8ea060b74cf4187-v2";

const KEY_GUIDANCE: &str = "Sign up at https://www.segmind.com to get an API key.";

/// Segmind recommends a 7 second cadence; 43 polls is about 5 minutes.
const DEFAULT_POLL_POLICY: PollPolicy = PollPolicy::new(Duration::from_secs(7), 43);

/// Segmind adapter
#[derive(Debug, Clone)]
pub struct SegmindRemover {
    http_client: HttpClient,
    base_url: String,
    poll_policy: PollPolicy,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    poll_url: Option<String>,
    #[allow(dead_code)]
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    status: String,
    output: Option<String>,
    error: Option<String>,
}

/// Translate one poll response into the shared job vocabulary,
/// performing the secondary output parse on completion.
fn job_from_poll(poll_url: &str, body: PollResponse) -> Result<Job> {
    match body.status.as_str() {
        "COMPLETED" => {
            let output = body.output.ok_or_else(|| {
                UnmarkError::ParseError(
                    "Segmind completed the job without an output field".to_string(),
                )
            })?;
            let url = extract_output_url(&output)?;
            Ok(Job::new(poll_url, JobStatus::Succeeded).with_result_ref(url))
        }
        "FAILED" => Ok(Job::new(poll_url, JobStatus::Failed)
            .with_error(body.error.unwrap_or_else(|| "unknown error".to_string()))),
        "QUEUED" => Ok(Job::new(poll_url, JobStatus::Queued)),
        // PROCESSING, plus anything the workflow engine adds later --
        // the attempt budget bounds how long we tolerate it.
        _ => Ok(Job::new(poll_url, JobStatus::Processing)),
    }
}

/// `output` is a JSON document serialized into a string; the image URL
/// lives at `[0].value.data`.
fn extract_output_url(output: &str) -> Result<String> {
    let parsed: Value = serde_json::from_str(output)
        .map_err(|e| UnmarkError::ParseError(format!("Segmind output field: {e}")))?;
    parsed
        .get(0)
        .and_then(|entry| entry.get("value"))
        .and_then(|value| value.get("data"))
        .and_then(|data| data.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            UnmarkError::ParseError("Segmind output carried no image URL".to_string())
        })
}

impl Default for SegmindRemover {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmindRemover {
    pub fn new() -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_policy: DEFAULT_POLL_POLICY,
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

    /// Override the poll cadence.
    pub fn with_poll_policy(mut self, poll_policy: PollPolicy) -> Self {
        self.poll_policy = poll_policy;
        self
    }

    async fn submit(
        &self,
        payload: &ImagePayload,
        api_key: &str,
        cancel: &CancelHandle,
    ) -> Result<String> {
        let body = serde_json::json!({ "Watermark_Image": to_data_uri(payload) });

        let response = cancel
            .guard(async {
                self.http_client
                    .post(format!("{}/workflows/{}", self.base_url, WORKFLOW_ID))
                    .bearer_auth(api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| UnmarkError::HttpError(e.to_string()))
            })
            .await?;

        if !response.status().is_success() {
            let err = classify_error_response(response, "Segmind", KEY_GUIDANCE).await;
            return Err(refine_inline_payload_error(err));
        }

        let submit: SubmitResponse = response
            .json()
            .await
            .map_err(|e| UnmarkError::ParseError(format!("Segmind submit response: {e}")))?;

        submit.poll_url.ok_or_else(|| {
            UnmarkError::ParseError("Segmind submit response carried no poll_url".to_string())
        })
    }

    async fn fetch_status(&self, poll_url: &str, api_key: &str) -> Result<Job> {
        let response = self
            .http_client
            .get(poll_url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| UnmarkError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(classify_error_response(response, "Segmind", KEY_GUIDANCE).await);
        }

        let body: PollResponse = response
            .json()
            .await
            .map_err(|e| UnmarkError::ParseError(format!("Segmind poll response: {e}")))?;
        job_from_poll(poll_url, body)
    }
}

#[async_trait]
impl WatermarkRemover for SegmindRemover {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Segmind
    }

    async fn remove_watermark(
        &self,
        request: &DispatchRequest,
        cancel: &CancelHandle,
    ) -> Result<ImagePayload> {
        let api_key = require_api_key(&request.config, KEY_GUIDANCE)?;

        // The poll URL from the submit response is used exactly as
        // returned; never reassembled from parts.
        let poll_url = self.submit(&request.payload, &api_key, cancel).await?;
        debug!(%poll_url, "Segmind workflow accepted");

        let job = poll_until_terminal(&self.poll_policy, cancel, || {
            self.fetch_status(&poll_url, &api_key)
        })
        .await?;

        if job.status == JobStatus::Failed {
            return Err(UnmarkError::ProcessingFailed(format!(
                "Segmind watermark removal failed: {}",
                job.error.as_deref().unwrap_or("no detail")
            )));
        }

        let result_url = job.result_ref.ok_or_else(|| {
            UnmarkError::ParseError("Segmind reported success without a result URL".to_string())
        })?;
        fetch_image_payload(&self.http_client, &result_url, cancel).await
    }
}

/// The workflow endpoint takes inline data-URIs today, but rejects them
/// on some plans; surface that as an input-representation problem with
/// a way out rather than a generic API failure.
fn refine_inline_payload_error(err: UnmarkError) -> UnmarkError {
    match err {
        UnmarkError::ApiError { ref message, .. }
            if message.to_lowercase().contains("data url")
                || message.to_lowercase().contains("data uri") =>
        {
            UnmarkError::InvalidInput(
                "Segmind refused the inline data-URI payload; upload the image to a public \
                 URL first, or use the picwish provider which accepts direct uploads."
                    .to_string(),
            )
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_poll_extracts_the_nested_url() {
        let output = r#"[{"value": {"data": "https://cdn.segmind.com/out.png"}}]"#;
        let job = job_from_poll(
            "https://api.segmind.com/poll/req-1",
            PollResponse {
                status: "COMPLETED".into(),
                output: Some(output.into()),
                error: None,
            },
        )
        .unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(
            job.result_ref.as_deref(),
            Some("https://cdn.segmind.com/out.png")
        );
    }

    #[test]
    fn completed_without_output_is_a_parse_error() {
        let err = job_from_poll(
            "poll",
            PollResponse {
                status: "COMPLETED".into(),
                output: None,
                error: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, UnmarkError::ParseError(_)));
    }

    #[test]
    fn queued_and_processing_stay_non_terminal() {
        for status in ["QUEUED", "PROCESSING", "WARMING_UP"] {
            let job = job_from_poll(
                "poll",
                PollResponse {
                    status: status.into(),
                    output: None,
                    error: None,
                },
            )
            .unwrap();
            assert!(!job.status.is_terminal(), "{status} must not be terminal");
        }
    }

    #[test]
    fn malformed_output_document_is_a_parse_error() {
        assert!(matches!(
            extract_output_url("not json"),
            Err(UnmarkError::ParseError(_))
        ));
        assert!(matches!(
            extract_output_url(r#"[{"value": {}}]"#),
            Err(UnmarkError::ParseError(_))
        ));
    }

    #[test]
    fn inline_payload_rejection_is_refined() {
        let err = refine_inline_payload_error(UnmarkError::api_error(
            400,
            "Segmind: data URL inputs are not supported on this plan",
        ));
        assert!(matches!(err, UnmarkError::InvalidInput(_)));
    }
}
