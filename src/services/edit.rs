//! Edit pipeline: classify the command, then dispatch the resulting intent.

use effects::EditResult;
use tracing::info;

use crate::error::ErrorCode;
use crate::services::classifier::{self, ClassifyError, Intent};
use crate::services::dispatch::{self, DispatchError};
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl ErrorCode for EditError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Classify(e) => e.error_code(),
            Self::Dispatch(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Classify(e) => e.retryable(),
            Self::Dispatch(e) => e.retryable(),
        }
    }
}

/// Run one edit. Inputs are assumed validated by the caller.
///
/// # Errors
///
/// Returns [`EditError::Classify`] when no model is configured or the model
/// call fails, and [`EditError::Dispatch`] when the intent cannot be carried
/// out.
pub async fn process(state: &AppState, image: &str, command: &str) -> Result<(Intent, EditResult), EditError> {
    let llm = state.llm.as_deref().ok_or(ClassifyError::NotConfigured)?;
    let intent = classifier::classify(llm, image, command, &state.classifier).await?;
    let result = dispatch::dispatch(state.images.as_deref(), image, command, &intent, &state.retry).await?;
    info!(action = %intent.action, "edit: processed");
    Ok((intent, result))
}

#[cfg(test)]
#[path = "edit_test.rs"]
mod tests;
