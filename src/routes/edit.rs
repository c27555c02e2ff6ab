//! `/api/edit-image` handlers.
//!
//! The POST handler takes the raw body so the rate limit is charged before
//! the body is decoded or validated. Malformed JSON is an internal error,
//! not a validation error. Body rejections, including the size limit, are
//! reported in the same JSON error shape as every other failure.

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use effects::{EditRequest, EditResponse, ErrorResponse, HealthEndpoints, HealthResponse, MAX_COMMAND_CHARS};
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::error::ErrorCode;
use crate::rate_limit::RateLimitError;
use crate::services::edit::{self, EditError};
use crate::state::AppState;

const CLIENT_ID_HEADER: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    #[error("request body exceeds the size limit: {0}")]
    PayloadTooLarge(String),
    #[error("invalid request body: {0}")]
    Body(String),
    #[error(transparent)]
    Edit(#[from] EditError),
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_VALIDATION",
            Self::RateLimited(e) => e.error_code(),
            Self::PayloadTooLarge(_) => "E_PAYLOAD_TOO_LARGE",
            Self::Body(_) => "E_BODY",
            Self::Edit(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::PayloadTooLarge(_) | Self::Body(_) => false,
            Self::RateLimited(e) => e.retryable(),
            Self::Edit(e) => e.retryable(),
        }
    }
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Body(_) | Self::Edit(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn body(&self) -> ErrorResponse {
        let code = self.error_code().to_string();
        match self {
            Self::Validation(message) => ErrorResponse { error: (*message).to_string(), details: None, code },
            Self::RateLimited(_) => {
                ErrorResponse { error: "Rate limit exceeded. Please try again later.".into(), details: None, code }
            }
            Self::PayloadTooLarge(_) => {
                ErrorResponse { error: "Request body too large".into(), details: Some(self.to_string()), code }
            }
            Self::Body(_) | Self::Edit(_) => {
                ErrorResponse { error: "Failed to process image".into(), details: Some(self.to_string()), code }
            }
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::Body(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/edit-image`: classify and apply one edit.
///
/// # Errors
///
/// Returns an [`ApiError`] for rate limiting, invalid input, or a failed edit.
pub async fn edit_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<EditResponse>, ApiError> {
    let client = client_id(&headers);
    if let Err(e) = state.rate_limiter.check_and_record(&client) {
        warn!(%client, "edit: rate limited");
        return Err(e.into());
    }

    let body = body.map_err(|rejection| {
        warn!(%client, status = %rejection.status(), "edit: body rejected");
        ApiError::from(rejection)
    })?;

    let request: EditRequest = serde_json::from_slice(&body).map_err(|e| {
        error!(%client, error = %e, "edit: malformed body");
        ApiError::Body(e.to_string())
    })?;
    let (image, command) = validate(&request)?;

    info!(%client, command_chars = command.chars().count(), "edit: request accepted");
    let (intent, result) = edit::process(&state, image, command).await.map_err(|e| {
        error!(%client, code = e.error_code(), error = %e, "edit: failed");
        ApiError::Edit(e)
    })?;

    Ok(Json(EditResponse {
        success: true,
        result,
        analysis: intent.description,
        timestamp: OffsetDateTime::now_utc(),
    }))
}

/// `GET /api/edit-image`: service description.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        endpoints: HealthEndpoints { edit: "POST /api/edit-image".into() },
    })
}

/// Both fields present and non-empty, and the command within
/// [`MAX_COMMAND_CHARS`].
///
/// # Errors
///
/// Returns [`ApiError::Validation`] naming the first problem found.
pub fn validate(request: &EditRequest) -> Result<(&str, &str), ApiError> {
    let image = request.image.as_deref().filter(|s| !s.is_empty());
    let command = request.command.as_deref().filter(|s| !s.is_empty());
    let (Some(image), Some(command)) = (image, command) else {
        return Err(ApiError::Validation("Image and command are required"));
    };
    if command.chars().count() > MAX_COMMAND_CHARS {
        return Err(ApiError::Validation("Command too long"));
    }
    Ok((image, command))
}

/// First `x-forwarded-for` entry, or `"unknown"`.
#[must_use]
pub fn client_id(headers: &HeaderMap) -> String {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

#[cfg(test)]
#[path = "edit_test.rs"]
mod tests;
