//! Deterministic keyword-driven filter fallback.
//!
//! DESIGN
//! ======
//! A command is lowercased and checked against a fixed keyword table in
//! priority order; the first keyword contained anywhere in the command
//! selects exactly one preset. Matches are never combined, so
//! "bright and blurry" only blurs.
//!
//! Presets follow the CSS filter-effects definitions applied to 8-bit sRGB
//! values: brightness and contrast are per-channel linear functions,
//! grayscale/sepia/saturate are the CSS colour matrices, blur is a Gaussian.
//! Colour transforms never touch alpha.
//!
//! A command with no keyword leaves the image untouched. That is a valid
//! outcome, not an error.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::data_uri::{DataUri, DataUriError};

pub const BLUR_SIGMA: f32 = 5.0;
pub const BRIGHTEN_FACTOR: f32 = 1.5;
pub const DARKEN_FACTOR: f32 = 0.6;
pub const CONTRAST_FACTOR: f32 = 1.5;
pub const SATURATE_FACTOR: f32 = 2.0;
/// Largest blur radius honoured from a filter instruction.
pub const MAX_BLUR_SIGMA: f32 = 50.0;
/// Largest brightness/contrast/saturation factor honoured from a filter
/// instruction.
pub const MAX_FACTOR: f32 = 10.0;

// =============================================================================
// PRESETS
// =============================================================================

/// One fixed visual transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterPreset {
    /// Gaussian blur with the given standard deviation in pixels.
    Blur { sigma: f32 },
    /// Multiply every colour channel.
    Brightness { factor: f32 },
    /// Scale every colour channel around mid-grey.
    Contrast { factor: f32 },
    /// Full desaturation using Rec. 709 luma weights.
    Grayscale,
    /// Full sepia tone.
    Sepia,
    /// Scale saturation; 1.0 is identity.
    Saturate { factor: f32 },
}

/// Keyword table in priority order. Earlier rows win.
const KEYWORDS: [(&str, FilterPreset); 8] = [
    ("blur", FilterPreset::Blur { sigma: BLUR_SIGMA }),
    ("bright", FilterPreset::Brightness { factor: BRIGHTEN_FACTOR }),
    ("dark", FilterPreset::Brightness { factor: DARKEN_FACTOR }),
    ("contrast", FilterPreset::Contrast { factor: CONTRAST_FACTOR }),
    ("grayscale", FilterPreset::Grayscale),
    ("black and white", FilterPreset::Grayscale),
    ("sepia", FilterPreset::Sepia),
    ("saturate", FilterPreset::Saturate { factor: SATURATE_FACTOR }),
];

/// Pick the preset for a free-text command, if any keyword matches.
#[must_use]
pub fn preset_for_command(command: &str) -> Option<FilterPreset> {
    let lowered = command.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(*keyword))
        .map(|(_, preset)| *preset)
}

impl FilterPreset {
    /// Resolve a filter name as returned in a server filter instruction.
    ///
    /// Accepts bare names (`"sepia"`, `"brightness"`, `"black_and_white"`)
    /// and CSS function syntax (`"brightness(1.2)"`, `"grayscale(100%)"`,
    /// `"blur(3px)"`). Bare names use the same parameters as the keyword
    /// table, and so do arguments that are negative or not finite. Large
    /// arguments are capped at [`MAX_BLUR_SIGMA`] / [`MAX_FACTOR`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lowered = name.trim().to_lowercase();
        let (func, arg) = match lowered.split_once('(') {
            Some((func, rest)) => (func.trim().to_string(), rest.strip_suffix(')').map(parse_css_number)),
            None => (lowered.replace([' ', '-'], "_"), None),
        };
        let arg = arg.flatten().filter(|v| v.is_finite() && *v >= 0.0);
        let factor = arg.map(|v| v.min(MAX_FACTOR));

        match func.as_str() {
            "blur" => Some(Self::Blur { sigma: arg.map_or(BLUR_SIGMA, |v| v.min(MAX_BLUR_SIGMA)) }),
            "bright" | "brighten" | "brighter" | "brightness" => {
                Some(Self::Brightness { factor: factor.unwrap_or(BRIGHTEN_FACTOR) })
            }
            "dark" | "darken" | "darker" => Some(Self::Brightness { factor: factor.unwrap_or(DARKEN_FACTOR) }),
            "contrast" => Some(Self::Contrast { factor: factor.unwrap_or(CONTRAST_FACTOR) }),
            "grayscale" | "greyscale" | "black_and_white" | "monochrome" => Some(Self::Grayscale),
            "sepia" => Some(Self::Sepia),
            "saturate" | "saturation" => Some(Self::Saturate { factor: factor.unwrap_or(SATURATE_FACTOR) }),
            _ => None,
        }
    }

    /// CSS `filter` expression equivalent to this preset.
    #[must_use]
    pub fn css(self) -> String {
        match self {
            Self::Blur { sigma } => format!("blur({sigma}px)"),
            Self::Brightness { factor } => format!("brightness({factor})"),
            Self::Contrast { factor } => format!("contrast({factor})"),
            Self::Grayscale => "grayscale(100%)".to_string(),
            Self::Sepia => "sepia(100%)".to_string(),
            Self::Saturate { factor } => format!("saturate({factor})"),
        }
    }
}

/// Parse `1.2`, `120%` or `3px` into a plain factor / pixel count.
fn parse_css_number(raw: &str) -> Option<f32> {
    let raw = raw.trim();
    if let Some(percent) = raw.strip_suffix('%') {
        return percent.trim().parse::<f32>().ok().map(|v| v / 100.0);
    }
    raw.trim_end_matches("px").trim().parse::<f32>().ok()
}

// =============================================================================
// PIXEL TRANSFORMS
// =============================================================================

/// Apply the keyword-selected preset, or return the image untouched.
#[must_use]
pub fn apply_effect(image: DynamicImage, command: &str) -> DynamicImage {
    match preset_for_command(command) {
        Some(preset) => apply_preset(&image, preset),
        None => image,
    }
}

/// Apply one preset, always producing an RGBA8 image. A blur whose sigma
/// is not a positive finite number leaves the pixels unchanged.
#[must_use]
pub fn apply_preset(image: &DynamicImage, preset: FilterPreset) -> DynamicImage {
    let rgba = image.to_rgba8();
    let out = match preset {
        FilterPreset::Blur { sigma } if sigma.is_finite() && sigma > 0.0 => {
            image::imageops::blur(&rgba, sigma.min(MAX_BLUR_SIGMA))
        }
        FilterPreset::Blur { .. } => rgba,
        FilterPreset::Brightness { factor } => map_channels(&rgba, |c| c * factor),
        FilterPreset::Contrast { factor } => map_channels(&rgba, |c| (c - 0.5) * factor + 0.5),
        FilterPreset::Grayscale => apply_matrix(&rgba, &GRAYSCALE),
        FilterPreset::Sepia => apply_matrix(&rgba, &SEPIA),
        FilterPreset::Saturate { factor } => apply_matrix(&rgba, &saturate_matrix(factor)),
    };
    DynamicImage::ImageRgba8(out)
}

type ColorMatrix = [[f32; 3]; 3];

const GRAYSCALE: ColorMatrix = [
    [0.2126, 0.7152, 0.0722],
    [0.2126, 0.7152, 0.0722],
    [0.2126, 0.7152, 0.0722],
];

const SEPIA: ColorMatrix = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

fn saturate_matrix(s: f32) -> ColorMatrix {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn map_channels(image: &RgbaImage, f: impl Fn(f32) -> f32) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        *pixel = Rgba([to_u8(f(to_unit(r))), to_u8(f(to_unit(g))), to_u8(f(to_unit(b))), a]);
    }
    out
}

fn apply_matrix(image: &RgbaImage, m: &ColorMatrix) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;
        let rgb = [to_unit(r), to_unit(g), to_unit(b)];
        let row = |i: usize| m[i][0] * rgb[0] + m[i][1] * rgb[1] + m[i][2] * rgb[2];
        *pixel = Rgba([to_u8(row(0)), to_u8(row(1)), to_u8(row(2)), a]);
    }
    out
}

fn to_unit(c: u8) -> f32 {
    f32::from(c) / 255.0
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

// =============================================================================
// DATA URI ENTRY POINTS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    #[error("invalid image data URI: {0}")]
    DataUri(#[from] DataUriError),
    #[error("image codec failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Keyword fallback over a data URI. Returns the input string unchanged
/// when no keyword matches, without decoding it.
///
/// # Errors
///
/// Returns an error if a preset matched but the image cannot be decoded or
/// re-encoded.
pub fn apply_effect_to_data_uri(data_uri: &str, command: &str) -> Result<String, EffectError> {
    match preset_for_command(command) {
        Some(preset) => apply_preset_to_data_uri(data_uri, preset),
        None => Ok(data_uri.to_string()),
    }
}

/// Decode, apply one preset and re-encode as PNG.
///
/// # Errors
///
/// Returns an error if the data URI or the image inside it is invalid.
pub fn apply_preset_to_data_uri(data_uri: &str, preset: FilterPreset) -> Result<String, EffectError> {
    let parsed = DataUri::parse(data_uri)?;
    let image = image::load_from_memory(&parsed.bytes)?;
    let out = apply_preset(&image, preset);

    let mut bytes = Vec::new();
    out.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(DataUri::new("image/png", bytes).encode())
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
