//! Error Handling Module
//!
//! Crate-wide error type and classification helpers. Every failure an
//! adapter or the registry can produce is mapped into exactly one
//! variant before it reaches the caller; nothing is retried inside the
//! core (retry, if any, is a caller decision).

use thiserror::Error;

/// Errors that can occur while dispatching a watermark-removal request
#[derive(Error, Debug, Clone)]
pub enum UnmarkError {
    /// No API key supplied for the selected provider. Raised before any
    /// network I/O is attempted.
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    /// The provider identifier is not registered.
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// The provider rejected the payload itself (bad file type,
    /// oversize, or an input representation it does not accept).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The provider rejected the credential (HTTP 401/403 equivalents).
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// The remote job reached a terminal failure status.
    #[error("Remote processing failed: {0}")]
    ProcessingFailed(String),

    /// Polling exhausted its attempt budget while the job remained
    /// non-terminal.
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// The provider cannot perform image editing at all. Terminal,
    /// never retried; carries the provider's textual reply as detail.
    #[error("Operation not supported: {0}")]
    UnsupportedOperation(String),

    /// The backend needs infrastructure this client cannot provide.
    /// Raised without any network attempt.
    #[error("Infrastructure required: {0}")]
    InfrastructureRequired(String),

    /// Connection-level HTTP failure (refused, reset, TLS, timeout at
    /// the transport layer).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Non-success HTTP response without a finer classification.
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Malformed JSON or a response that does not match the provider's
    /// documented schema.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The caller abandoned the dispatch call through its cancel
    /// handle. Never produced by provider behavior.
    #[error("Dispatch cancelled by caller")]
    Cancelled,
}

/// Coarse classification of an error, independent of the variant that
/// carried it over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Client-side configuration problems (missing key, unknown provider)
    Configuration,
    /// The payload was rejected by provider-side validation
    Input,
    /// Credential rejected
    Authentication,
    /// The provider accepted the job and then failed it
    Remote,
    /// Poll budget exhausted
    Timeout,
    /// The provider is structurally unable to edit images
    Capability,
    /// Missing client-side infrastructure
    Infrastructure,
    /// Network / protocol / schema failures
    Transport,
    /// Caller-initiated abandonment
    Cancelled,
}

impl UnmarkError {
    /// Classify this error into its category.
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingApiKey(_) | Self::UnsupportedProvider(_) => ErrorCategory::Configuration,
            Self::InvalidInput(_) => ErrorCategory::Input,
            Self::AuthenticationError(_) => ErrorCategory::Authentication,
            Self::ProcessingFailed(_) => ErrorCategory::Remote,
            Self::TimeoutError(_) => ErrorCategory::Timeout,
            Self::UnsupportedOperation(_) => ErrorCategory::Capability,
            Self::InfrastructureRequired(_) => ErrorCategory::Infrastructure,
            Self::HttpError(_) | Self::ApiError { .. } | Self::ParseError(_) => {
                ErrorCategory::Transport
            }
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Advisory hint for callers: whether retrying the same dispatch
    /// call might succeed. The core itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(_) => true,
            Self::ApiError { code, .. } => *code == 429 || *code >= 500,
            Self::TimeoutError(_) => true,
            _ => false,
        }
    }

    /// Convenience constructor for a non-success HTTP response body.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }
}

impl From<reqwest::Error> for UnmarkError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for UnmarkError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, UnmarkError>;
