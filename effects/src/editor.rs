//! Editor seam used by [`EditSession::run`](crate::session::EditSession::run).
//!
//! An editor turns `(image, command)` into a new image. The local editor
//! runs the keyword fallback; remote editors live with their transport
//! (see the CLI). [`WithFallback`] chains the two.

use tracing::warn;

use crate::filter::{EffectError, apply_effect_to_data_uri};

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("effect failed: {0}")]
    Effect(#[from] EffectError),
    /// The editor could not be reached or failed on its side.
    #[error("editor unavailable: {0}")]
    Unavailable(String),
    /// The editor refused the request. Retrying elsewhere would hide that.
    #[error("edit rejected: {0}")]
    Rejected(String),
}

/// Provider-neutral async editor. Enables mocking in tests.
#[async_trait::async_trait]
pub trait Editor: Send + Sync {
    /// Produce an edited data URI.
    ///
    /// # Errors
    ///
    /// Returns an [`EditorError`] if the edit could not be produced.
    async fn edit(&self, image: &str, command: &str) -> Result<String, EditorError>;
}

/// Deterministic keyword-driven editor. Never calls out.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalEditor;

#[async_trait::async_trait]
impl Editor for LocalEditor {
    async fn edit(&self, image: &str, command: &str) -> Result<String, EditorError> {
        Ok(apply_effect_to_data_uri(image, command)?)
    }
}

/// Try `primary`; when it is unavailable run `fallback` with the same
/// input. Rejections and effect errors from `primary` are returned as is.
pub struct WithFallback<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> WithFallback<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait::async_trait]
impl<P: Editor, F: Editor> Editor for WithFallback<P, F> {
    async fn edit(&self, image: &str, command: &str) -> Result<String, EditorError> {
        match self.primary.edit(image, command).await {
            Err(EditorError::Unavailable(reason)) => {
                warn!(%reason, "primary editor unavailable; using fallback");
                self.fallback.edit(image, command).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
#[path = "editor_test.rs"]
mod tests;
