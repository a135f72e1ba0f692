//! Core data model
//!
//! Payloads, provider identifiers, per-call configuration and the
//! shared job state that the async poller drives. Raw provider status
//! vocabularies (numeric states, uppercase strings, prediction
//! statuses) never appear here; each adapter translates its own wire
//! format into [`JobStatus`] at its boundary.

use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::UnmarkError;

/// An encoded image together with its declared content type.
///
/// Immutable once produced: either supplied by the caller as dispatch
/// input, or assembled by an adapter after downloading a remote result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// Image media type, e.g. `image/png`
    pub content_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }
}

/// Identifier of a supported watermark-removal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Picwish,
    Segmind,
    Replicate,
    Openrouter,
    Gemini,
    Pixelbin,
}

impl ProviderId {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Picwish => "picwish",
            Self::Segmind => "segmind",
            Self::Replicate => "replicate",
            Self::Openrouter => "openrouter",
            Self::Gemini => "gemini",
            Self::Pixelbin => "pixelbin",
        }
    }

    /// All built-in provider identifiers.
    pub const fn all() -> [Self; 6] {
        [
            Self::Picwish,
            Self::Segmind,
            Self::Replicate,
            Self::Openrouter,
            Self::Gemini,
            Self::Pixelbin,
        ]
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = UnmarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "picwish" => Ok(Self::Picwish),
            "segmind" => Ok(Self::Segmind),
            "replicate" => Ok(Self::Replicate),
            "openrouter" => Ok(Self::Openrouter),
            "gemini" => Ok(Self::Gemini),
            "pixelbin" => Ok(Self::Pixelbin),
            other => Err(UnmarkError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Per-call provider selection and credential.
///
/// Owned by the surrounding application's configuration store; the core
/// reads it and never mutates or persists it. The key is opaque and is
/// only exposed at header-build time.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: ProviderId,
    pub api_key: SecretString,
    /// Model override for providers that support model selection;
    /// adapters fall back to their own default constants.
    pub model: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider: ProviderId, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: SecretString::from(api_key.into()),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// One dispatch invocation: the image to process plus the provider
/// selection. Constructed per call, never persisted.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub payload: ImagePayload,
    pub config: ProviderConfig,
}

impl DispatchRequest {
    pub fn new(payload: ImagePayload, config: ProviderConfig) -> Self {
        Self { payload, config }
    }
}

/// Shared job status every async adapter translates its raw provider
/// vocabulary into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Processing,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Succeeded or Failed. Polling must stop on the first terminal
    /// observation and never check the job again.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// A provider-side asynchronous unit of work, tracked from submit until
/// the first terminal status or the poll budget runs out. Owned by a
/// single dispatch call and discarded afterwards.
#[derive(Debug, Clone)]
pub struct Job {
    /// Provider-assigned identifier (task id, prediction id, poll URL)
    pub id: String,
    pub status: JobStatus,
    /// Where the processed image can be fetched from, once Succeeded
    pub result_ref: Option<String>,
    /// Provider-reported failure detail, once Failed
    pub error: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            result_ref: None,
            error: None,
        }
    }

    pub fn with_result_ref(mut self, result_ref: impl Into<String>) -> Self {
        self.result_ref = Some(result_ref.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
