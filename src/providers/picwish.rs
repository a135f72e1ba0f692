//! PicWish watermark-removal adapter
//!
//! Multipart submit + numeric-state polling. The image is uploaded as a
//! binary `file` part with `sync=0` (asynchronous mode), the backend
//! answers with a task id, and the task endpoint is polled until the
//! numeric `state` turns terminal: `1` success, `< 0` failed, anything
//! else still processing.
//!
//! Backend constraints: JPG/PNG/BMP input, 20-10,000 px, files up to
//! 50 MB; the result URL stays valid for one hour.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::codec::filename_for;
use crate::error::{Result, UnmarkError};
use crate::poller::{PollPolicy, poll_until_terminal};
use crate::traits::WatermarkRemover;
use crate::types::{DispatchRequest, ImagePayload, Job, JobStatus, ProviderId};
use crate::utils::CancelHandle;

use super::{
    classify_error_response, fetch_image_payload, looks_like_auth_failure, require_api_key,
};

const DEFAULT_BASE_URL: &str = "https://techhk.aoscdn.com";
const TASK_PATH: &str = "/api/tasks/visual/external/watermark-remove";

const KEY_GUIDANCE: &str =
    "Get your free 50 credits at https://picwish.com/image-watermark-removal-api";
const INPUT_GUIDANCE: &str =
    "PicWish accepts JPG, PNG or BMP images up to 50 MB; check the file format and size.";

/// One status check per second, for up to 30 seconds.
const DEFAULT_POLL_POLICY: PollPolicy = PollPolicy::new(Duration::from_secs(1), 30);

/// PicWish adapter
#[derive(Debug, Clone)]
pub struct PicwishRemover {
    http_client: HttpClient,
    base_url: String,
    poll_policy: PollPolicy,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    status: i64,
    data: Option<SubmitData>,
    message: Option<String>,
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    data: Option<StatusData>,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    state: i64,
    file: Option<String>,
}

/// Translate the raw numeric state into the shared job vocabulary.
fn job_from_state(task_id: &str, data: StatusData) -> Job {
    match data.state {
        1 => {
            let mut job = Job::new(task_id, JobStatus::Succeeded);
            if let Some(file) = data.file {
                job = job.with_result_ref(file);
            }
            job
        }
        state if state < 0 => {
            Job::new(task_id, JobStatus::Failed).with_error(format!("state {state}"))
        }
        _ => Job::new(task_id, JobStatus::Processing),
    }
}

impl Default for PicwishRemover {
    fn default() -> Self {
        Self::new()
    }
}

impl PicwishRemover {
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

    fn task_url(&self) -> String {
        format!("{}{}", self.base_url, TASK_PATH)
    }

    async fn submit(
        &self,
        payload: &ImagePayload,
        api_key: &str,
        cancel: &CancelHandle,
    ) -> Result<String> {
        let part = Part::bytes(payload.bytes.clone())
            .file_name(filename_for(&payload.content_type))
            .mime_str(&payload.content_type)
            .map_err(|e| UnmarkError::InvalidInput(format!("unusable content type: {e}")))?;
        let form = Form::new().part("file", part).text("sync", "0");

        let response = cancel
            .guard(async {
                self.http_client
                    .post(self.task_url())
                    .header("X-API-KEY", api_key)
                    .multipart(form)
                    .send()
                    .await
                    .map_err(|e| UnmarkError::HttpError(e.to_string()))
            })
            .await?;

        if !response.status().is_success() {
            let err = classify_error_response(response, "PicWish", KEY_GUIDANCE).await;
            return Err(refine_input_error(err));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| UnmarkError::ParseError(format!("PicWish submit response: {e}")))?;

        if let (200, Some(task_id)) = (body.status, body.data.and_then(|d| d.task_id)) {
            return Ok(task_id);
        }

        let message = body
            .message
            .or(body.msg)
            .unwrap_or_else(|| "unknown error".to_string());
        if looks_like_auth_failure(&message) {
            return Err(UnmarkError::AuthenticationError(format!(
                "PicWish rejected the API key. {KEY_GUIDANCE}"
            )));
        }
        if message.contains("input file does not exist") {
            return Err(UnmarkError::InvalidInput(format!(
                "PicWish could not read the upload. {INPUT_GUIDANCE}"
            )));
        }
        Err(UnmarkError::ApiError {
            code: u16::try_from(body.status).unwrap_or(0),
            message: format!("PicWish task creation failed: {message}"),
            details: None,
        })
    }

    async fn fetch_status(&self, task_id: &str, api_key: &str) -> Result<Job> {
        let response = self
            .http_client
            .get(format!("{}/{}", self.task_url(), task_id))
            .header("X-API-KEY", api_key)
            .send()
            .await
            .map_err(|e| UnmarkError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(classify_error_response(response, "PicWish", KEY_GUIDANCE).await);
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| UnmarkError::ParseError(format!("PicWish status response: {e}")))?;
        let data = body.data.ok_or_else(|| {
            UnmarkError::ParseError("PicWish status response carried no task data".to_string())
        })?;

        Ok(job_from_state(task_id, data))
    }
}

#[async_trait]
impl WatermarkRemover for PicwishRemover {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Picwish
    }

    async fn remove_watermark(
        &self,
        request: &DispatchRequest,
        cancel: &CancelHandle,
    ) -> Result<ImagePayload> {
        let api_key = require_api_key(&request.config, KEY_GUIDANCE)?;

        let task_id = self.submit(&request.payload, &api_key, cancel).await?;
        debug!(%task_id, "PicWish task created");

        let job = poll_until_terminal(&self.poll_policy, cancel, || {
            self.fetch_status(&task_id, &api_key)
        })
        .await?;

        if job.status == JobStatus::Failed {
            return Err(UnmarkError::ProcessingFailed(format!(
                "PicWish watermark removal failed ({})",
                job.error.as_deref().unwrap_or("no detail")
            )));
        }

        let result_url = job.result_ref.ok_or_else(|| {
            UnmarkError::ParseError("PicWish reported success without a result URL".to_string())
        })?;
        fetch_image_payload(&self.http_client, &result_url, cancel).await
    }
}

/// Submit-time rejections about the file itself are input errors, not
/// generic API failures; the user needs to know which one occurred.
fn refine_input_error(err: UnmarkError) -> UnmarkError {
    match err {
        UnmarkError::ApiError { ref message, .. }
            if message.contains("input file does not exist") =>
        {
            UnmarkError::InvalidInput(format!(
                "PicWish could not read the upload. {INPUT_GUIDANCE}"
            ))
        }
        other => other,
    }
}
