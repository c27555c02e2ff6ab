//! Replicate prediction client.
//!
//! DESIGN
//! ======
//! One prediction per call: `POST {api_base}/predictions` with
//! `Prefer: wait`, then poll `urls.get` while the prediction is `starting`
//! or `processing`. The first output URL is downloaded and returned inline
//! as a data URI so the caller never depends on Replicate's short-lived
//! file hosting. The whole exchange runs under one deadline.
//!
//! Response inspection lives in free functions so it can be tested without
//! a server.

pub mod config;

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info};

use crate::services::images::{ImageService, ServiceError};
use config::ReplicateConfig;

const MAX_ERROR_BODY_CHARS: usize = 512;
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

// =============================================================================
// CLIENT
// =============================================================================

pub struct ReplicateClient {
    http: reqwest::Client,
    config: ReplicateConfig,
}

impl ReplicateClient {
    /// Build a client from environment variables. See
    /// [`ReplicateConfig::from_lookup`] for the variables read.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] if the token is missing or the HTTP
    /// client fails to build.
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::new(ReplicateConfig::from_env()?)
    }

    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] if the HTTP client fails to build.
    pub fn new(config: ReplicateConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ServiceError::Config(e.to_string()))?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &ReplicateConfig {
        &self.config
    }

    /// Run `model` on `input` and return the first output image as a data URI.
    async fn run(&self, model: &str, input: Value) -> Result<String, ServiceError> {
        let deadline = self.config.timeout;
        tokio::time::timeout(deadline, self.run_inner(model, input))
            .await
            .map_err(|_| ServiceError::Timeout(format!("prediction exceeded {}s", deadline.as_secs())))?
    }

    async fn run_inner(&self, model: &str, input: Value) -> Result<String, ServiceError> {
        let body = json!({ "version": version_id(model), "input": input });
        info!(model, "replicate: creating prediction");

        let response = self
            .http
            .post(format!("{}/predictions", self.config.api_base))
            .bearer_auth(&self.config.api_token)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::from_request(&e))?;
        let mut prediction = read_json(response).await?;

        loop {
            match prediction_status(&prediction) {
                PredictionStatus::Succeeded => break,
                PredictionStatus::Pending => {
                    let url = poll_url(&prediction)
                        .ok_or_else(|| ServiceError::Parse("prediction missing poll URL".into()))?
                        .to_string();
                    debug!(%url, "replicate: prediction pending");
                    tokio::time::sleep(self.config.poll_interval.max(MIN_POLL_INTERVAL)).await;
                    let response = self
                        .http
                        .get(&url)
                        .bearer_auth(&self.config.api_token)
                        .send()
                        .await
                        .map_err(|e| ServiceError::from_request(&e))?;
                    prediction = read_json(response).await?;
                }
                PredictionStatus::Failed(status) => {
                    return Err(ServiceError::PredictionFailed { status, detail: failure_detail(&prediction) });
                }
            }
        }

        let mut urls = Vec::new();
        if let Some(output) = prediction.get("output") {
            extract_output_urls(output, &mut urls);
        }
        let url = urls.into_iter().next().ok_or(ServiceError::NoOutput)?;
        self.download(&url).await
    }

    async fn download(&self, url: &str) -> Result<String, ServiceError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::from_request(&e))?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Response { status, body: truncate(&body) });
        }
        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::from_request(&e))?;
        Ok(effects::DataUri::new(output_mime(mime.as_deref(), url), bytes.to_vec()).encode())
    }
}

#[async_trait::async_trait]
impl ImageService for ReplicateClient {
    async fn remove_background(&self, image: &str) -> Result<String, ServiceError> {
        self.run(&self.config.rembg_version, rembg_input(image)).await
    }

    async fn generate(&self, image: &str, prompt: &str, strength: f32) -> Result<String, ServiceError> {
        self.run(&self.config.sdxl_version, sdxl_input(image, prompt, strength))
            .await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, ServiceError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| ServiceError::from_request(&e))?;
    if !(200..300).contains(&status) {
        return Err(ServiceError::Response { status, body: truncate(&text) });
    }
    serde_json::from_str(&text).map_err(|e| ServiceError::Parse(e.to_string()))
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// Version hash of an `owner/model:version` reference. A bare hash passes
/// through unchanged.
#[must_use]
pub fn version_id(model: &str) -> &str {
    model.rsplit_once(':').map_or(model, |(_, version)| version)
}

#[must_use]
pub fn rembg_input(image: &str) -> Value {
    json!({ "image": image })
}

#[must_use]
pub fn sdxl_input(image: &str, prompt: &str, strength: f32) -> Value {
    json!({ "image": image, "prompt": prompt, "strength": strength })
}

// =============================================================================
// RESPONSE INSPECTION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionStatus {
    Succeeded,
    Pending,
    /// Terminal non-success status, lowercased.
    Failed(String),
}

#[must_use]
pub fn prediction_status(prediction: &Value) -> PredictionStatus {
    let status = prediction
        .get("status")
        .and_then(Value::as_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match status.as_str() {
        "succeeded" => PredictionStatus::Succeeded,
        "starting" | "processing" => PredictionStatus::Pending,
        "" => PredictionStatus::Failed("unknown".into()),
        _ => PredictionStatus::Failed(status),
    }
}

#[must_use]
pub fn poll_url(prediction: &Value) -> Option<&str> {
    prediction
        .get("urls")
        .and_then(|urls| urls.get("get"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
}

fn failure_detail(prediction: &Value) -> String {
    match prediction.get("error") {
        Some(Value::String(message)) if !message.trim().is_empty() => message.trim().to_string(),
        Some(Value::Null) | None => "no error detail".to_string(),
        Some(other) => truncate(&other.to_string()),
    }
}

/// Collect http(s) URLs from a prediction `output`, in order and without
/// duplicates. Output may be a string, an array, or an object carrying
/// `url`, `urls` or `output`.
pub fn extract_output_urls(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(url) => {
            let trimmed = url.trim();
            if trimmed.starts_with("http") && !out.iter().any(|existing| existing == trimmed) {
                out.push(trimmed.to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                extract_output_urls(item, out);
            }
        }
        Value::Object(obj) => {
            for key in ["url", "urls", "output"] {
                if let Some(inner) = obj.get(key) {
                    extract_output_urls(inner, out);
                }
            }
        }
        _ => {}
    }
}

/// MIME type for a downloaded output: the response header when it names an
/// image, otherwise a guess from the URL extension, otherwise PNG.
#[must_use]
pub fn output_mime(content_type: Option<&str>, url: &str) -> String {
    if let Some(mime) = content_type
        .and_then(|value| value.split(';').next())
        .map(str::trim)
        .filter(|mime| mime.starts_with("image/"))
    {
        return mime.to_string();
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/png",
    }
    .to_string()
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!("{cut}...")
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
