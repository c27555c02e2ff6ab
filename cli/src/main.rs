use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use effects::{
    DataUri, DataUriError, EditRequest, EditResponse, EditResult, EditSession, Editor, EditorError, ErrorResponse,
    FilterPreset, LocalEditor, QUICK_COMMANDS, SessionError, WithFallback, apply_preset_to_data_uri,
    preset_for_command,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {status}: {message}")]
    ServerError { status: u16, message: String },
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("unsupported image file: {0}")]
    UnsupportedInput(PathBuf),
    #[error("edited image is not a data URI: {0}")]
    Output(#[from] DataUriError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "snapedit-cli", about = "SnapEdit image editing CLI")]
struct Cli {
    #[arg(long, env = "SNAPEDIT_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    /// Per-request timeout for server calls.
    #[arg(long, env = "SNAPEDIT_TIMEOUT_SECS", default_value_t = 120)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server is up.
    Ping,
    /// Apply one or more edits to an image file.
    Edit(EditArgs),
    /// List the canned commands.
    QuickCommands,
}

#[derive(Args, Debug)]
struct EditArgs {
    /// PNG, JPEG, GIF or WebP file to edit.
    input: PathBuf,

    /// Edit command; repeat to chain edits.
    #[arg(long = "command", short = 'c', required = true)]
    commands: Vec<String>,

    /// Where to write the result. Defaults to `<input>-edited.<ext>`.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Skip the server and use the keyword filters only.
    #[arg(long, default_value_t = false)]
    local: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let base_url = normalize_base_url(&cli.base_url)?;
    let timeout = Duration::from_secs(cli.timeout_secs);

    match cli.command {
        Command::Ping => run_ping(&base_url, timeout).await,
        Command::Edit(args) => run_edit(&base_url, timeout, args).await,
        Command::QuickCommands => {
            for command in QUICK_COMMANDS {
                println!("{command}");
            }
            Ok(())
        }
    }
}

async fn run_ping(base_url: &str, timeout: Duration) -> Result<(), CliError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.get(format!("{base_url}/healthz")).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError { status: status.as_u16(), message: "health check failed".to_owned() });
    }
    println!("ok");
    Ok(())
}

async fn run_edit(base_url: &str, timeout: Duration, args: EditArgs) -> Result<(), CliError> {
    let image = read_image(&args.input)?;
    let mut session = EditSession::new();
    session.load(image)?;

    let editor: Box<dyn Editor> = if args.local {
        Box::new(LocalEditor)
    } else {
        Box::new(WithFallback::new(RemoteEditor::new(base_url, timeout)?, LocalEditor))
    };

    for command in &args.commands {
        session.run(command, editor.as_ref()).await?;
        eprintln!("applied: {command}");
    }

    let edited = session.current_image().unwrap_or_default();
    let uri = DataUri::parse(edited)?;
    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input, &uri.mime_type));
    fs::write(&output, &uri.bytes).map_err(|source| CliError::Io { path: output.clone(), source })?;

    print_json(&serde_json::to_value(session.history())?)?;
    eprintln!("wrote {}", output.display());
    Ok(())
}

// =============================================================================
// REMOTE EDITOR
// =============================================================================

/// Editor backed by `POST /api/edit-image`. Filter instructions are
/// rendered locally. Transport failures and 5xx answers are
/// [`EditorError::Unavailable`]; any other non-success answer is
/// [`EditorError::Rejected`].
struct RemoteEditor {
    http: reqwest::Client,
    endpoint: String,
}

impl RemoteEditor {
    fn new(base_url: &str, timeout: Duration) -> Result<Self, CliError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint: format!("{base_url}/api/edit-image") })
    }
}

#[async_trait::async_trait]
impl Editor for RemoteEditor {
    async fn edit(&self, image: &str, command: &str) -> Result<String, EditorError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&EditRequest::new(image, command))
            .send()
            .await
            .map_err(|e| EditorError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EditorError::Unavailable(e.to_string()))?;
        if status.is_server_error() {
            return Err(EditorError::Unavailable(describe_error(status.as_u16(), &body)));
        }
        if !status.is_success() {
            return Err(EditorError::Rejected(describe_error(status.as_u16(), &body)));
        }

        let parsed: EditResponse =
            serde_json::from_str(&body).map_err(|e| EditorError::Unavailable(format!("unexpected response: {e}")))?;
        tracing::info!(analysis = %parsed.analysis, "server classified edit");
        render_result(parsed.result, command)
    }
}

/// Turn a server result into an image. Filter names the client does not
/// know fall back to the keyword table for `command`.
fn render_result(result: EditResult, command: &str) -> Result<String, EditorError> {
    match result {
        EditResult::ProcessedImage { image } => Ok(image),
        EditResult::Filter { filter, image } => {
            let preset = filter
                .as_deref()
                .and_then(FilterPreset::from_name)
                .or_else(|| preset_for_command(command));
            match preset {
                Some(preset) => {
                    tracing::debug!(filter = %preset.css(), "rendering filter locally");
                    Ok(apply_preset_to_data_uri(&image, preset)?)
                }
                None => Ok(image),
            }
        }
    }
}

fn describe_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => match err.details {
            Some(details) => format!("HTTP {status} {}: {} ({details})", err.code, err.error),
            None => format!("HTTP {status} {}: {}", err.code, err.error),
        },
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}

// =============================================================================
// FILES
// =============================================================================

fn normalize_base_url(raw: &str) -> Result<String, CliError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_owned())
    } else {
        Err(CliError::InvalidBaseUrl(raw.to_owned()))
    }
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "png",
    }
}

fn read_image(path: &Path) -> Result<String, CliError> {
    let mime = mime_for_path(path).ok_or_else(|| CliError::UnsupportedInput(path.to_path_buf()))?;
    let bytes = fs::read(path).map_err(|source| CliError::Io { path: path.to_path_buf(), source })?;
    Ok(DataUri::new(mime, bytes).encode())
}

fn default_output_path(input: &Path, mime: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("image");
    input.with_file_name(format!("{stem}-edited.{}", extension_for_mime(mime)))
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
