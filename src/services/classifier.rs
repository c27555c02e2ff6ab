//! Command classifier: image + free-text command → structured intent.
//!
//! DESIGN
//! ======
//! One user message goes to the vision model: a text block quoting the
//! command and asking for a fixed JSON shape, plus an image block carrying
//! the data URI. Only the chat call is retried; parsing the reply is a
//! separate step with its own failure kind, so a malformed reply is never
//! sent back to the model.
//!
//! The action string is kept as the model wrote it. Resolving it against
//! the supported actions is the dispatcher's job.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::{Lookup, env_lookup, parse_or};
use crate::error::ErrorCode;
use crate::llm::LlmChat;
use crate::llm::types::{ContentBlock, ImageSource, LlmError, Message};
use crate::services::retry::RetryPolicy;

pub const DEFAULT_CLASSIFIER_MAX_TOKENS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub max_tokens: u32,
    pub retry: RetryPolicy,
}

impl ClassifierConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(&env_lookup)
    }

    #[must_use]
    pub fn from_lookup(var: Lookup<'_>) -> Self {
        Self {
            max_tokens: parse_or(var, "CLASSIFIER_MAX_TOKENS", DEFAULT_CLASSIFIER_MAX_TOKENS),
            retry: RetryPolicy::from_lookup(var),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { max_tokens: DEFAULT_CLASSIFIER_MAX_TOKENS, retry: RetryPolicy::default() }
    }
}

// =============================================================================
// TYPES
// =============================================================================

/// Structured classification of one edit command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub action: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    pub description: String,
}

impl Intent {
    /// `parameters.filter` when the model supplied it as a string.
    #[must_use]
    pub fn filter_name(&self) -> Option<&str> {
        self.parameters.get("filter").and_then(Value::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("LLM not configured")]
    NotConfigured,
    #[error("model reply does not match the intent shape: {0}")]
    Shape(String),
    #[error("model reply contained no text")]
    EmptyResponse,
    #[error("classifier request timed out: {0}")]
    Timeout(String),
    #[error("classifier request failed: {0}")]
    Llm(LlmError),
}

impl From<LlmError> for ClassifyError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Timeout(msg) => Self::Timeout(msg),
            other => Self::Llm(other),
        }
    }
}

impl ErrorCode for ClassifyError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "E_CLASSIFY_NOT_CONFIGURED",
            Self::Shape(_) => "E_CLASSIFY_SHAPE",
            Self::EmptyResponse => "E_CLASSIFY_EMPTY",
            Self::Timeout(_) => "E_CLASSIFY_TIMEOUT",
            Self::Llm(_) => "E_CLASSIFY_LLM",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Llm(e) => e.retryable(),
            Self::NotConfigured | Self::Shape(_) | Self::EmptyResponse => false,
        }
    }
}

// =============================================================================
// CLASSIFY
// =============================================================================

/// Ask the vision model what `command` should do to `image`.
///
/// # Errors
///
/// Returns [`ClassifyError::Llm`] / [`ClassifyError::Timeout`] when the
/// model call fails after retries, [`ClassifyError::EmptyResponse`] when it
/// answers without text, and [`ClassifyError::Shape`] when the text is not
/// a valid intent.
pub async fn classify(
    llm: &dyn LlmChat,
    image: &str,
    command: &str,
    config: &ClassifierConfig,
) -> Result<Intent, ClassifyError> {
    let messages = [Message::user(vec![
        ContentBlock::Text { text: build_prompt(command) },
        ContentBlock::Image { source: ImageSource::from_uri(image) },
    ])];
    let messages = &messages;
    let max_tokens = config.max_tokens;

    let response = config
        .retry
        .run("classify", move || async move {
            llm.chat(max_tokens, "", messages)
                .await
                .map_err(ClassifyError::from)
        })
        .await?;
    debug!(
        model = %response.model,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        stop_reason = %response.stop_reason,
        "classifier: model replied"
    );

    let text = response.text().ok_or(ClassifyError::EmptyResponse)?;
    let intent = parse_intent(&text)?;
    info!(action = %intent.action, description = %intent.description, "classifier: command classified");
    Ok(intent)
}

/// Instruction text sent alongside the image.
#[must_use]
pub fn build_prompt(command: &str) -> String {
    format!(
        "Analyze this image editing request: {command:?}.\n\
         Determine the best approach and return JSON with:\n\
         {{\n  \"action\": \"filter|remove_bg|generate|transform\",\n  \"parameters\": {{...}},\n  \"description\": \"what will be done\"\n}}\n\
         For the filter action set parameters.filter to one of: \
         blur, brightness, darken, contrast, grayscale, sepia, saturate.\n\
         Reply with the JSON object only."
    )
}

/// Decode a model reply into an [`Intent`].
///
/// Surrounding whitespace and a single Markdown code fence are removed;
/// everything else must be exactly the intent object.
///
/// # Errors
///
/// Returns [`ClassifyError::Shape`] when the text is not a JSON object with
/// a non-empty string `action`, an object `parameters` (optional) and a
/// string `description`.
pub fn parse_intent(text: &str) -> Result<Intent, ClassifyError> {
    let body = strip_code_fence(text.trim());
    let intent: Intent = serde_json::from_str(body).map_err(|e| ClassifyError::Shape(e.to_string()))?;
    if intent.action.trim().is_empty() {
        return Err(ClassifyError::Shape("action is empty".to_string()));
    }
    Ok(intent)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(body) = text
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return text;
    };
    // Opening line may carry an info string such as `json`.
    match body.split_once('\n') {
        Some((_, inner)) => inner.trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
#[path = "classifier_test.rs"]
mod tests;
