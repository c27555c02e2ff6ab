//! Client-side editing primitives shared by the server and the CLI.
//!
//! This crate owns everything that can run without an external service:
//! the data-URI codec, the keyword-driven filter fallback, the edit session
//! state machine, and the JSON wire types of the edit endpoint.

pub mod data_uri;
pub mod editor;
pub mod filter;
pub mod session;
pub mod wire;

pub use data_uri::{DataUri, DataUriError};
pub use editor::{Editor, EditorError, LocalEditor, WithFallback};
pub use filter::{
    EffectError, FilterPreset, apply_effect, apply_effect_to_data_uri, apply_preset, apply_preset_to_data_uri,
    preset_for_command,
};
pub use session::{EditSession, EditTicket, HistoryEntry, SessionError, SessionState};
pub use wire::{EditRequest, EditResponse, EditResult, ErrorResponse, HealthEndpoints, HealthResponse};

/// Canned commands offered to users who don't know what to type.
pub const QUICK_COMMANDS: [&str; 6] = [
    "Make it brighter",
    "Convert to black and white",
    "Apply blur effect",
    "Increase contrast",
    "Make it darker",
    "Add sepia tone",
];

/// Longest edit command accepted, counted in characters.
pub const MAX_COMMAND_CHARS: usize = 500;
