//! Effect dispatcher: routes a classified intent to the backend that
//! produces the edit.
//!
//! DESIGN
//! ======
//! | action                  | backend                                   |
//! |-------------------------|-------------------------------------------|
//! | `remove_background`     | `ImageService::remove_background`         |
//! | `generate_or_transform` | `ImageService::generate` (strength 0.7)   |
//! | `filter`                | none; the client renders the named filter |
//! | anything else           | `UnsupportedAction`, no external call     |
//!
//! Routing is resolved before any call is made, so an unknown action never
//! reaches an upstream service.

use effects::EditResult;
use tracing::{info, warn};

use crate::error::ErrorCode;
use crate::services::classifier::Intent;
use crate::services::images::{ImageService, ServiceError};
use crate::services::retry::RetryPolicy;

/// How far a generated image may drift from its input.
pub const GENERATE_STRENGTH: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Filter,
    RemoveBackground,
    GenerateOrTransform,
}

impl Action {
    /// Resolve a model-supplied action name. Case and surrounding
    /// whitespace are ignored.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "filter" => Some(Self::Filter),
            "remove_bg" | "remove_background" => Some(Self::RemoveBackground),
            "generate" | "transform" | "generate_or_transform" => Some(Self::GenerateOrTransform),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unsupported edit action: {0}")]
    UnsupportedAction(String),
    #[error("image service not configured")]
    NotConfigured,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ErrorCode for DispatchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedAction(_) => "E_DISPATCH_UNSUPPORTED",
            Self::NotConfigured => "E_DISPATCH_NOT_CONFIGURED",
            Self::Service(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Service(e) => e.retryable(),
            Self::UnsupportedAction(_) | Self::NotConfigured => false,
        }
    }
}

/// Produce the edit for `intent`.
///
/// # Errors
///
/// Returns [`DispatchError::UnsupportedAction`] for an unknown action,
/// [`DispatchError::NotConfigured`] when an image action has no service, and
/// [`DispatchError::Service`] when the upstream call fails after retries.
pub async fn dispatch(
    images: Option<&dyn ImageService>,
    image: &str,
    command: &str,
    intent: &Intent,
    retry: &RetryPolicy,
) -> Result<EditResult, DispatchError> {
    let Some(action) = Action::parse(&intent.action) else {
        warn!(action = %intent.action, "dispatch: unsupported action");
        return Err(DispatchError::UnsupportedAction(intent.action.clone()));
    };

    let result = match action {
        Action::Filter => EditResult::Filter { filter: intent.filter_name().map(str::to_string), image: image.to_string() },
        Action::RemoveBackground => {
            let images = images.ok_or(DispatchError::NotConfigured)?;
            let out = retry
                .run("remove_background", move || async move { images.remove_background(image).await })
                .await?;
            EditResult::ProcessedImage { image: out }
        }
        Action::GenerateOrTransform => {
            let images = images.ok_or(DispatchError::NotConfigured)?;
            let out = retry
                .run("generate", move || async move { images.generate(image, command, GENERATE_STRENGTH).await })
                .await?;
            EditResult::ProcessedImage { image: out }
        }
    };
    info!(?action, "dispatch: edit produced");
    Ok(result)
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;
