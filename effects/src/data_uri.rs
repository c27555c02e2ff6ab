//! Data URI codec for inline images.
//!
//! Only base64 payloads are supported; percent-encoded data URIs never carry
//! raster images in practice.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

/// MIME type assumed when a data URI omits one.
pub const DEFAULT_MIME: &str = "image/png";

#[derive(Debug, thiserror::Error)]
pub enum DataUriError {
    #[error("not a data URI")]
    MissingScheme,
    #[error("data URI has no payload separator")]
    MissingPayload,
    #[error("data URI payload is not base64 encoded")]
    NotBase64,
    #[error("base64 decode failed: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// A decoded `data:<mime>;base64,<payload>` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DataUri {
    #[must_use]
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { mime_type: mime_type.into(), bytes }
    }

    /// Parse a data URI string.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheme, separator or base64 marker is missing,
    /// or if the payload is not valid base64.
    pub fn parse(raw: &str) -> Result<Self, DataUriError> {
        let rest = strip_scheme(raw.trim()).ok_or(DataUriError::MissingScheme)?;
        let (meta, payload) = rest.split_once(',').ok_or(DataUriError::MissingPayload)?;

        let mut params = meta.split(';');
        let mime_type = params
            .next()
            .map(str::trim)
            .filter(|mime| !mime.is_empty())
            .unwrap_or(DEFAULT_MIME)
            .to_ascii_lowercase();
        if !params.any(|param| param.trim().eq_ignore_ascii_case("base64")) {
            return Err(DataUriError::NotBase64);
        }

        let bytes = BASE64.decode(payload.trim().as_bytes())?;
        Ok(Self { mime_type, bytes })
    }

    /// Encode back into `data:<mime>;base64,<payload>` form.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

fn strip_scheme(raw: &str) -> Option<&str> {
    let scheme = raw.get(..5)?;
    if scheme.eq_ignore_ascii_case("data:") { raw.get(5..) } else { None }
}

#[cfg(test)]
#[path = "data_uri_test.rs"]
mod tests;
