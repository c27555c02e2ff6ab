use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::*;

fn png_data_uri() -> String {
    let mut img = RgbaImage::new(4, 4);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let x = u8::try_from(x).unwrap();
        let y = u8::try_from(y).unwrap();
        *pixel = Rgba([180 - x * 30, 40 + y * 40, 90 + x * 10, 255]);
    }
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    DataUri::new("image/png", bytes).encode()
}

fn pixels(uri: &str) -> RgbaImage {
    let parsed = DataUri::parse(uri).unwrap();
    image::load_from_memory(&parsed.bytes).unwrap().to_rgba8()
}

// =============================================================================
// argument parsing
// =============================================================================

#[test]
fn edit_accepts_repeated_commands() {
    let cli = Cli::try_parse_from(["snapedit-cli", "edit", "photo.png", "-c", "blur", "--command", "sepia", "--local"])
        .unwrap();
    let Command::Edit(args) = cli.command else {
        panic!("expected edit subcommand");
    };
    assert_eq!(args.input, PathBuf::from("photo.png"));
    assert_eq!(args.commands, ["blur", "sepia"]);
    assert!(args.local);
    assert!(args.output.is_none());
}

#[test]
fn edit_requires_a_command() {
    assert!(Cli::try_parse_from(["snapedit-cli", "edit", "photo.png"]).is_err());
}

#[test]
fn base_url_must_be_http() {
    assert_eq!(normalize_base_url("http://localhost:3000/").unwrap(), "http://localhost:3000");
    assert_eq!(normalize_base_url(" https://edit.example.com ").unwrap(), "https://edit.example.com");
    assert!(matches!(normalize_base_url("localhost:3000"), Err(CliError::InvalidBaseUrl(_))));
}

// =============================================================================
// rendering server results
// =============================================================================

#[test]
fn processed_image_is_returned_as_is() {
    let out = render_result(EditResult::ProcessedImage { image: "data:image/png;base64,AA==".into() }, "x").unwrap();
    assert_eq!(out, "data:image/png;base64,AA==");
}

#[test]
fn named_filter_is_rendered_locally() {
    let original = png_data_uri();
    let out = render_result(EditResult::Filter { filter: Some("grayscale".into()), image: original.clone() }, "x")
        .unwrap();
    assert_ne!(out, original);
    for pixel in pixels(&out).pixels() {
        assert_eq!(pixel[0], pixel[1]);
        assert_eq!(pixel[1], pixel[2]);
    }
}

#[test]
fn missing_filter_falls_back_to_command_keywords() {
    let original = png_data_uri();
    let out = render_result(EditResult::Filter { filter: None, image: original.clone() }, "Add sepia tone").unwrap();
    assert_ne!(pixels(&out).as_raw(), pixels(&original).as_raw());
}

#[test]
fn unknown_filter_without_keyword_leaves_image() {
    let original = png_data_uri();
    let out = render_result(EditResult::Filter { filter: Some("vignette".into()), image: original.clone() }, "hmm")
        .unwrap();
    assert_eq!(out, original);
}

#[test]
fn error_bodies_are_summarized() {
    let body = r#"{"error":"Failed to process image","details":"Unsupported edit action: bogus","code":"E_DISPATCH_UNSUPPORTED"}"#;
    assert_eq!(
        describe_error(500, body),
        "HTTP 500 E_DISPATCH_UNSUPPORTED: Failed to process image (Unsupported edit action: bogus)"
    );
    assert_eq!(
        describe_error(429, r#"{"error":"Rate limit exceeded. Please try again later.","code":"E_RATE_LIMITED"}"#),
        "HTTP 429 E_RATE_LIMITED: Rate limit exceeded. Please try again later."
    );
    assert_eq!(describe_error(502, "Bad Gateway\n"), "HTTP 502: Bad Gateway");
}

#[tokio::test]
async fn unreachable_server_falls_back_to_local_filters() {
    let original = png_data_uri();
    let remote = RemoteEditor::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
    assert!(matches!(remote.edit(&original, "blur").await, Err(EditorError::Unavailable(_))));

    let mut session = EditSession::new();
    session.load(original).unwrap();
    let editor = WithFallback::new(remote, LocalEditor);
    session.run("Convert to black and white", &editor).await.unwrap();

    assert_eq!(session.history().len(), 1);
    for pixel in pixels(session.edited().unwrap()).pixels() {
        assert_eq!(pixel[0], pixel[1]);
        assert_eq!(pixel[1], pixel[2]);
        assert_eq!(pixel[3], 255);
    }
}

// =============================================================================
// stub server
// =============================================================================

/// Answer every request with `status` and a JSON `body`. Returns the base
/// URL and a request counter.
async fn stub_server(status: u16, body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            if read_request(&mut stream).await.is_err() {
                continue;
            }
            let response = format!(
                "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    (base, hits)
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 8192];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                return Ok(());
            }
        }
    }
}

#[tokio::test]
async fn client_errors_are_surfaced_not_masked_by_fallback() {
    for (status, body) in [
        (400, r#"{"error":"Command too long","code":"E_VALIDATION"}"#),
        (429, r#"{"error":"Rate limit exceeded. Please try again later.","code":"E_RATE_LIMITED"}"#),
    ] {
        let (base, hits) = stub_server(status, body).await;
        let remote = RemoteEditor::new(&base, Duration::from_secs(5)).unwrap();
        let editor = WithFallback::new(remote, LocalEditor);

        let mut session = EditSession::new();
        session.load(png_data_uri()).unwrap();
        let command = format!("Convert to black and white {}", "x".repeat(480));
        let err = session.run(&command, &editor).await.unwrap_err();

        assert!(
            matches!(&err, SessionError::EditFailed(EditorError::Rejected(msg)) if msg.contains(&format!("HTTP {status}"))),
            "{status}: {err}"
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), effects::SessionState::Loaded);
        assert!(session.history().is_empty());
        assert!(session.edited().is_none());
    }
}

#[tokio::test]
async fn server_errors_fall_back_to_local_filters() {
    let (base, _) =
        stub_server(500, r#"{"error":"Failed to process image","details":"upstream down","code":"E_SERVICE_REQUEST"}"#)
            .await;
    let remote = RemoteEditor::new(&base, Duration::from_secs(5)).unwrap();
    assert!(matches!(remote.edit(&png_data_uri(), "sepia").await, Err(EditorError::Unavailable(_))));

    let mut session = EditSession::new();
    session.load(png_data_uri()).unwrap();
    session
        .run("Convert to black and white", &WithFallback::new(remote, LocalEditor))
        .await
        .unwrap();
    assert_eq!(session.history().len(), 1);
    for pixel in pixels(session.edited().unwrap()).pixels() {
        assert_eq!(pixel[0], pixel[1]);
        assert_eq!(pixel[1], pixel[2]);
    }
}

// =============================================================================
// files
// =============================================================================

#[test]
fn mime_follows_extension() {
    assert_eq!(mime_for_path(Path::new("a/photo.PNG")), Some("image/png"));
    assert_eq!(mime_for_path(Path::new("photo.jpeg")), Some("image/jpeg"));
    assert_eq!(mime_for_path(Path::new("photo.webp")), Some("image/webp"));
    assert_eq!(mime_for_path(Path::new("notes.txt")), None);
    assert_eq!(mime_for_path(Path::new("noext")), None);
}

#[test]
fn default_output_sits_next_to_input() {
    assert_eq!(default_output_path(Path::new("shots/cat.jpg"), "image/png"), PathBuf::from("shots/cat-edited.png"));
    assert_eq!(default_output_path(Path::new("cat.png"), "image/jpeg"), PathBuf::from("cat-edited.jpg"));
}

#[test]
fn read_image_builds_data_uri() {
    let path = std::env::temp_dir().join(format!("snapedit-cli-read-{}.png", std::process::id()));
    let bytes = DataUri::parse(&png_data_uri()).unwrap().bytes;
    fs::write(&path, &bytes).unwrap();

    let uri = read_image(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let parsed = DataUri::parse(&uri).unwrap();
    assert_eq!(parsed.mime_type, "image/png");
    assert_eq!(parsed.bytes, bytes);
}

#[test]
fn read_image_rejects_unknown_extension() {
    let err = read_image(Path::new("notes.txt")).unwrap_err();
    assert!(matches!(err, CliError::UnsupportedInput(_)));
}
