//! Seam for the external image services the dispatcher calls.

use crate::error::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("image service not configured: {0}")]
    Config(String),
    #[error("image service request failed: {0}")]
    Request(String),
    #[error("image service timed out: {0}")]
    Timeout(String),
    #[error("image service response error: status {status}")]
    Response { status: u16, body: String },
    #[error("image service response parse failed: {0}")]
    Parse(String),
    #[error("prediction {status}: {detail}")]
    PredictionFailed { status: String, detail: String },
    #[error("prediction produced no image")]
    NoOutput,
}

impl ServiceError {
    pub(crate) fn from_request(e: &reqwest::Error) -> Self {
        if e.is_timeout() { Self::Timeout(e.to_string()) } else { Self::Request(e.to_string()) }
    }
}

impl ErrorCode for ServiceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "E_SERVICE_CONFIG",
            Self::Request(_) => "E_SERVICE_REQUEST",
            Self::Timeout(_) => "E_SERVICE_TIMEOUT",
            Self::Response { .. } => "E_SERVICE_RESPONSE",
            Self::Parse(_) => "E_SERVICE_PARSE",
            Self::PredictionFailed { .. } => "E_SERVICE_PREDICTION_FAILED",
            Self::NoOutput => "E_SERVICE_NO_OUTPUT",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Timeout(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

/// Background removal and image-conditioned generation. Implemented by
/// [`crate::replicate::ReplicateClient`]; mocked in tests.
#[async_trait::async_trait]
pub trait ImageService: Send + Sync {
    /// Return `image` with its background removed, as a data URI.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] when the upstream call fails.
    async fn remove_background(&self, image: &str) -> Result<String, ServiceError>;

    /// Generate a new image from `image` guided by `prompt`. `strength` in
    /// `0.0..=1.0` is how far the output may drift from the input.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] when the upstream call fails.
    async fn generate(&self, image: &str, prompt: &str, strength: f32) -> Result<String, ServiceError>;
}
