//! Replicate prediction adapter
//!
//! Creates a prediction resource for an image-restoration model and
//! polls it by id. The prediction `output` may be a single URL or an
//! ordered sequence of URLs; by convention the first entry is the
//! processed image.

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

const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

/// GFPGAN restoration model; overridable per request via the config's
/// `model` field.
const DEFAULT_MODEL_VERSION: &str =
    "tencentarc/gfpgan:0fbacf7afc6c144e5be9767cff80f25aff23e52b0708f17e20f9879b2f21516c";

const KEY_GUIDANCE: &str = "Create an API token at https://replicate.com/account/api-tokens.";

/// Every 2 seconds, for up to 2 minutes.
const DEFAULT_POLL_POLICY: PollPolicy = PollPolicy::new(Duration::from_secs(2), 60);

/// Replicate adapter
#[derive(Debug, Clone)]
pub struct ReplicateRemover {
    http_client: HttpClient,
    base_url: String,
    poll_policy: PollPolicy,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    output: Option<Value>,
    error: Option<Value>,
}

/// Translate a prediction snapshot into the shared job vocabulary.
fn job_from_prediction(prediction: Prediction) -> Job {
    match prediction.status.as_str() {
        "succeeded" => {
            let mut job = Job::new(&prediction.id, JobStatus::Succeeded);
            if let Some(url) = first_output_url(prediction.output.as_ref()) {
                job = job.with_result_ref(url);
            }
            job
        }
        "failed" | "canceled" => {
            let detail = prediction
                .error
                .as_ref()
                .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                .unwrap_or_else(|| "unknown error".to_string());
            Job::new(&prediction.id, JobStatus::Failed).with_error(detail)
        }
        "starting" => Job::new(&prediction.id, JobStatus::Queued),
        _ => Job::new(&prediction.id, JobStatus::Processing),
    }
}

/// `output` is either a URL string or an ordered sequence of URL
/// strings; take the first.
fn first_output_url(output: Option<&Value>) -> Option<String> {
    match output? {
        Value::String(url) => Some(url.clone()),
        Value::Array(urls) => urls.first().and_then(|v| v.as_str()).map(str::to_string),
        _ => None,
    }
}

impl Default for ReplicateRemover {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicateRemover {
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

    async fn create_prediction(
        &self,
        payload: &ImagePayload,
        api_key: &str,
        model_version: &str,
        cancel: &CancelHandle,
    ) -> Result<Prediction> {
        let body = serde_json::json!({
            "version": model_version,
            "input": {
                "img": to_data_uri(payload),
                "version": "v1.4",
                "scale": 2,
            }
        });

        let response = cancel
            .guard(async {
                self.http_client
                    .post(format!("{}/v1/predictions", self.base_url))
                    .header("Authorization", format!("Token {api_key}"))
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| UnmarkError::HttpError(e.to_string()))
            })
            .await?;

        if !response.status().is_success() {
            return Err(classify_error_response(response, "Replicate", KEY_GUIDANCE).await);
        }

        response
            .json()
            .await
            .map_err(|e| UnmarkError::ParseError(format!("Replicate prediction response: {e}")))
    }

    async fn fetch_status(&self, prediction_id: &str, api_key: &str) -> Result<Job> {
        let response = self
            .http_client
            .get(format!("{}/v1/predictions/{prediction_id}", self.base_url))
            .header("Authorization", format!("Token {api_key}"))
            .send()
            .await
            .map_err(|e| UnmarkError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(classify_error_response(response, "Replicate", KEY_GUIDANCE).await);
        }

        let prediction: Prediction = response
            .json()
            .await
            .map_err(|e| UnmarkError::ParseError(format!("Replicate status response: {e}")))?;
        Ok(job_from_prediction(prediction))
    }
}

#[async_trait]
impl WatermarkRemover for ReplicateRemover {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Replicate
    }

    async fn remove_watermark(
        &self,
        request: &DispatchRequest,
        cancel: &CancelHandle,
    ) -> Result<ImagePayload> {
        let api_key = require_api_key(&request.config, KEY_GUIDANCE)?;
        let model_version = request
            .config
            .model
            .as_deref()
            .unwrap_or(DEFAULT_MODEL_VERSION);

        let prediction = self
            .create_prediction(&request.payload, &api_key, model_version, cancel)
            .await?;
        debug!(prediction_id = %prediction.id, "Replicate prediction created");

        // Fast models can come back terminal straight from the create
        // call; only poll when the prediction is still in flight.
        let initial = job_from_prediction(prediction);
        let job = if initial.status.is_terminal() {
            initial
        } else {
            let prediction_id = initial.id.clone();
            poll_until_terminal(&self.poll_policy, cancel, || {
                self.fetch_status(&prediction_id, &api_key)
            })
            .await?
        };

        if job.status == JobStatus::Failed {
            return Err(UnmarkError::ProcessingFailed(format!(
                "Replicate prediction failed: {}",
                job.error.as_deref().unwrap_or("no detail")
            )));
        }

        let result_url = job.result_ref.ok_or_else(|| {
            UnmarkError::ParseError(
                "Replicate prediction succeeded without an output URL".to_string(),
            )
        })?;
        fetch_image_payload(&self.http_client, &result_url, cancel).await
    }
}
