use super::*;

fn sample_image() -> DynamicImage {
    let mut img = RgbaImage::new(4, 3);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let x = u8::try_from(x).unwrap();
        let y = u8::try_from(y).unwrap();
        *pixel = Rgba([40 + x * 50, 200 - y * 60, 90 + x * 10 + y * 20, 255 - y * 40]);
    }
    DynamicImage::ImageRgba8(img)
}

fn sample_data_uri() -> String {
    let mut bytes = Vec::new();
    sample_image()
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    DataUri::new("image/png", bytes).encode()
}

// =============================================================================
// preset_for_command
// =============================================================================

#[test]
fn bright_in_any_case_selects_brighten() {
    for cmd in ["Make it brighter", "BRIGHT please", "increase BrIgHtNeSs"] {
        assert_eq!(preset_for_command(cmd), Some(FilterPreset::Brightness { factor: 1.5 }), "{cmd}");
    }
}

#[test]
fn bright_beats_every_lower_priority_keyword() {
    let cmd = "bright and dark with contrast, grayscale, sepia and saturate";
    assert_eq!(preset_for_command(cmd), Some(FilterPreset::Brightness { factor: BRIGHTEN_FACTOR }));
}

#[test]
fn priority_is_table_order_not_text_order() {
    // "bright" appears first in the text but blur has higher priority.
    assert_eq!(preset_for_command("bright and blurry"), Some(FilterPreset::Blur { sigma: BLUR_SIGMA }));
    assert_eq!(preset_for_command("sepia then darker"), Some(FilterPreset::Brightness { factor: DARKEN_FACTOR }));
}

#[test]
fn each_keyword_maps_to_one_preset() {
    let cases = [
        ("Apply blur effect", FilterPreset::Blur { sigma: 5.0 }),
        ("Make it darker", FilterPreset::Brightness { factor: 0.6 }),
        ("Increase contrast", FilterPreset::Contrast { factor: 1.5 }),
        ("grayscale", FilterPreset::Grayscale),
        ("Convert to black and white", FilterPreset::Grayscale),
        ("Add sepia tone", FilterPreset::Sepia),
        ("saturate the colours", FilterPreset::Saturate { factor: 2.0 }),
    ];
    for (cmd, expected) in cases {
        assert_eq!(preset_for_command(cmd), Some(expected), "{cmd}");
    }
}

#[test]
fn unknown_command_has_no_preset() {
    assert_eq!(preset_for_command("add a hat to the cat"), None);
    assert_eq!(preset_for_command(""), None);
    // "black & white" is not the exact phrase.
    assert_eq!(preset_for_command("black & white"), None);
}

// =============================================================================
// FilterPreset::from_name
// =============================================================================

#[test]
fn from_name_accepts_bare_names() {
    assert_eq!(FilterPreset::from_name("Sepia"), Some(FilterPreset::Sepia));
    assert_eq!(FilterPreset::from_name("black and white"), Some(FilterPreset::Grayscale));
    assert_eq!(FilterPreset::from_name("greyscale"), Some(FilterPreset::Grayscale));
    assert_eq!(FilterPreset::from_name("brightness"), Some(FilterPreset::Brightness { factor: 1.5 }));
    assert_eq!(FilterPreset::from_name("darken"), Some(FilterPreset::Brightness { factor: 0.6 }));
}

#[test]
fn from_name_accepts_css_functions() {
    assert_eq!(FilterPreset::from_name("brightness(1.2)"), Some(FilterPreset::Brightness { factor: 1.2 }));
    assert_eq!(FilterPreset::from_name("saturate(150%)"), Some(FilterPreset::Saturate { factor: 1.5 }));
    assert_eq!(FilterPreset::from_name("blur(3px)"), Some(FilterPreset::Blur { sigma: 3.0 }));
    assert_eq!(FilterPreset::from_name("grayscale(100%)"), Some(FilterPreset::Grayscale));
}

#[test]
fn from_name_rejects_unknown() {
    assert_eq!(FilterPreset::from_name("vignette"), None);
}

#[test]
fn from_name_ignores_negative_and_non_finite_arguments() {
    assert_eq!(FilterPreset::from_name("blur(-3px)"), Some(FilterPreset::Blur { sigma: BLUR_SIGMA }));
    assert_eq!(FilterPreset::from_name("blur(NaN)"), Some(FilterPreset::Blur { sigma: BLUR_SIGMA }));
    assert_eq!(FilterPreset::from_name("blur(inf)"), Some(FilterPreset::Blur { sigma: BLUR_SIGMA }));
    assert_eq!(FilterPreset::from_name("brightness(-1)"), Some(FilterPreset::Brightness { factor: BRIGHTEN_FACTOR }));
    assert_eq!(FilterPreset::from_name("saturate(-50%)"), Some(FilterPreset::Saturate { factor: SATURATE_FACTOR }));
}

#[test]
fn from_name_caps_large_arguments() {
    assert_eq!(FilterPreset::from_name("blur(1000px)"), Some(FilterPreset::Blur { sigma: MAX_BLUR_SIGMA }));
    assert_eq!(FilterPreset::from_name("contrast(5000%)"), Some(FilterPreset::Contrast { factor: MAX_FACTOR }));
}

#[test]
fn model_supplied_blur_names_never_panic() {
    let image = sample_image();
    for name in ["blur(-3px)", "blur(NaN)", "blur(0px)"] {
        let preset = FilterPreset::from_name(name).unwrap();
        let out = apply_preset(&image, preset);
        assert_eq!(out.to_rgba8().dimensions(), image.to_rgba8().dimensions(), "{name}");
    }
}

#[test]
fn degenerate_blur_sigma_leaves_pixels_unchanged() {
    let image = sample_image();
    for sigma in [0.0, -3.0, f32::NAN, f32::NEG_INFINITY] {
        let out = apply_preset(&image, FilterPreset::Blur { sigma });
        assert_eq!(out.to_rgba8().as_raw(), image.to_rgba8().as_raw(), "sigma {sigma}");
    }
}

#[test]
fn css_round_trips_through_from_name() {
    for preset in KEYWORDS.iter().map(|(_, p)| *p) {
        assert_eq!(FilterPreset::from_name(&preset.css()), Some(preset));
    }
}

// =============================================================================
// apply_effect / apply_preset
// =============================================================================

#[test]
fn no_keyword_is_pixel_identical() {
    let input = sample_image();
    let out = apply_effect(input.clone(), "make it look like a painting");
    assert_eq!(out.to_rgba8().as_raw(), input.to_rgba8().as_raw());
    assert_eq!(out.color(), input.color());
}

#[test]
fn brighten_multiplies_and_clamps() {
    let out = apply_effect(sample_image(), "brighter").to_rgba8();
    let src = sample_image().to_rgba8();
    for (o, s) in out.pixels().zip(src.pixels()) {
        for c in 0..3 {
            let expected = (f32::from(s[c]) * 1.5).round().min(255.0);
            assert!((f32::from(o[c]) - expected).abs() <= 1.0);
        }
        assert_eq!(o[3], s[3]);
    }
}

#[test]
fn darken_scales_down() {
    let out = apply_effect(sample_image(), "darker").to_rgba8();
    let src = sample_image().to_rgba8();
    for (o, s) in out.pixels().zip(src.pixels()) {
        assert!(o[0] <= s[0] && o[1] <= s[1] && o[2] <= s[2]);
        assert_eq!(o[3], s[3]);
    }
}

#[test]
fn contrast_pushes_away_from_mid_grey() {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([64, 128, 192, 255])));
    let out = apply_preset(&img, FilterPreset::Contrast { factor: 1.5 }).to_rgba8();
    let px = out.get_pixel(0, 0);
    assert!(px[0] < 64);
    assert!(px[2] > 192);
    assert!((i16::from(px[1]) - 128).abs() <= 1);
}

#[test]
fn grayscale_equalises_channels_and_keeps_alpha() {
    let src = sample_image().to_rgba8();
    let out = apply_effect(sample_image(), "Convert to black and white").to_rgba8();
    for (o, s) in out.pixels().zip(src.pixels()) {
        assert_eq!(o[0], o[1]);
        assert_eq!(o[1], o[2]);
        assert_eq!(o[3], s[3]);
        let luma = 0.2126 * f32::from(s[0]) + 0.7152 * f32::from(s[1]) + 0.0722 * f32::from(s[2]);
        assert!((f32::from(o[0]) - luma).abs() <= 1.0);
    }
}

#[test]
fn sepia_warms_pure_grey() {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([100, 100, 100, 200])));
    let px = *apply_preset(&img, FilterPreset::Sepia).to_rgba8().get_pixel(0, 0);
    assert!(px[0] > px[1] && px[1] > px[2]);
    assert_eq!(px[3], 200);
}

#[test]
fn saturate_leaves_grey_untouched() {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([90, 90, 90, 255])));
    let px = *apply_preset(&img, FilterPreset::Saturate { factor: 2.0 }).to_rgba8().get_pixel(0, 0);
    for c in 0..3 {
        assert!((i16::from(px[c]) - 90).abs() <= 1);
    }
}

#[test]
fn saturate_amplifies_dominant_channel() {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([180, 100, 100, 255])));
    let px = *apply_preset(&img, FilterPreset::Saturate { factor: 2.0 }).to_rgba8().get_pixel(0, 0);
    assert!(px[0] > 180);
    assert!(px[1] < 100);
}

#[test]
fn blur_keeps_dimensions_and_smooths_edges() {
    let mut img = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255]));
    for y in 0..16 {
        for x in 8..16 {
            img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
        }
    }
    let out = apply_preset(&DynamicImage::ImageRgba8(img), FilterPreset::Blur { sigma: BLUR_SIGMA }).to_rgba8();
    assert_eq!(out.dimensions(), (16, 16));
    let edge = out.get_pixel(7, 8)[0];
    assert!(edge > 0 && edge < 255);
}

// =============================================================================
// data URI entry points
// =============================================================================

#[test]
fn data_uri_passthrough_returns_same_string() {
    let input = "data:image/png;base64,not-even-decoded";
    assert_eq!(apply_effect_to_data_uri(input, "do something creative").unwrap(), input);
}

#[test]
fn data_uri_grayscale_round_trip() {
    let out = apply_effect_to_data_uri(&sample_data_uri(), "grayscale").unwrap();
    let decoded = DataUri::parse(&out).unwrap();
    assert_eq!(decoded.mime_type, "image/png");
    let img = image::load_from_memory(&decoded.bytes).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (4, 3));
    assert!(img.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
}

#[test]
fn data_uri_invalid_payload_errors_when_preset_matches() {
    let err = apply_effect_to_data_uri("not a data uri", "sepia").unwrap_err();
    assert!(matches!(err, EffectError::DataUri(_)));
}

#[test]
fn data_uri_undecodable_image_errors() {
    let err = apply_preset_to_data_uri("data:image/png;base64,AAEC", FilterPreset::Sepia).unwrap_err();
    assert!(matches!(err, EffectError::Image(_)));
}
