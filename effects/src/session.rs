//! Edit session: one image carried through a chain of edits.
//!
//! DESIGN
//! ======
//! ```text
//! empty ──load──▶ loaded ──begin──▶ processing ──complete──▶ edited
//!                    ▲                  │  ▲                   │
//!                    └──────fail────────┘  └───────begin───────┘
//! ```
//! `fail` returns to whichever state `begin` was called from. `reset`
//! returns to `empty` from anywhere. History grows only on `complete`.
//! Failed edits never touch the stored images.

use serde::Serialize;
use time::OffsetDateTime;

use crate::data_uri::DataUri;
use crate::editor::{Editor, EditorError};

/// User-facing message stored on a failed edit.
pub const EDIT_FAILED_MESSAGE: &str = "Failed to process image. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Empty,
    Loaded,
    Processing,
    Edited,
}

/// One successful edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub command: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Please upload a valid image file")]
    InvalidImage,
    #[error("Please upload an image and enter a command")]
    MissingInput,
    #[error("an edit is already in progress")]
    Busy,
    #[error("no edit is in progress")]
    NotProcessing,
    #[error("edit failed: {0}")]
    EditFailed(#[from] EditorError),
}

/// Work handed out by [`EditSession::begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTicket {
    /// Latest edited image, or the original when nothing is edited yet.
    pub image: String,
    pub command: String,
}

#[derive(Debug)]
pub struct EditSession {
    state: SessionState,
    /// State to restore when the in-flight edit fails.
    resume: SessionState,
    original: Option<String>,
    edited: Option<String>,
    pending: Option<String>,
    history: Vec<HistoryEntry>,
    error: Option<String>,
}

impl EditSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Empty,
            resume: SessionState::Empty,
            original: None,
            edited: None,
            pending: None,
            history: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    #[must_use]
    pub fn edited(&self) -> Option<&str> {
        self.edited.as_deref()
    }

    /// The image the next edit would start from.
    #[must_use]
    pub fn current_image(&self) -> Option<&str> {
        self.edited().or_else(|| self.original())
    }

    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Load a new original image, discarding edits and history.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Busy`] while an edit is in flight and
    /// [`SessionError::InvalidImage`] when `image` is not an image data URI.
    pub fn load(&mut self, image: impl Into<String>) -> Result<(), SessionError> {
        if self.state == SessionState::Processing {
            return Err(SessionError::Busy);
        }
        let image = image.into();
        match DataUri::parse(&image) {
            Ok(uri) if uri.is_image() => {}
            _ => {
                self.error = Some(SessionError::InvalidImage.to_string());
                return Err(SessionError::InvalidImage);
            }
        }
        self.original = Some(image);
        self.edited = None;
        self.history.clear();
        self.error = None;
        self.state = SessionState::Loaded;
        Ok(())
    }

    /// Enter `processing` and hand out the working image.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Busy`] if already processing and
    /// [`SessionError::MissingInput`] without an image or with a blank command.
    pub fn begin(&mut self, command: &str) -> Result<EditTicket, SessionError> {
        if self.state == SessionState::Processing {
            return Err(SessionError::Busy);
        }
        let image = self
            .current_image()
            .filter(|_| !command.trim().is_empty())
            .map(str::to_string);
        let Some(image) = image else {
            self.error = Some(SessionError::MissingInput.to_string());
            return Err(SessionError::MissingInput);
        };

        self.resume = self.state;
        self.state = SessionState::Processing;
        self.pending = Some(command.to_string());
        self.error = None;
        Ok(EditTicket { image, command: command.to_string() })
    }

    /// Finish the in-flight edit successfully.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotProcessing`] when no edit is in flight.
    pub fn complete(&mut self, image: impl Into<String>) -> Result<(), SessionError> {
        if self.state != SessionState::Processing {
            return Err(SessionError::NotProcessing);
        }
        let command = self.pending.take().unwrap_or_default();
        self.edited = Some(image.into());
        self.history.push(HistoryEntry { command, timestamp: OffsetDateTime::now_utc() });
        self.state = SessionState::Edited;
        Ok(())
    }

    /// Abandon the in-flight edit and restore the prior state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotProcessing`] when no edit is in flight.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), SessionError> {
        if self.state != SessionState::Processing {
            return Err(SessionError::NotProcessing);
        }
        self.pending = None;
        self.error = Some(message.into());
        self.state = self.resume;
        Ok(())
    }

    /// Drop everything and return to `empty`.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Run one edit end to end. `processing` always resolves to `edited`
    /// or back to the prior state before this returns.
    ///
    /// # Errors
    ///
    /// Returns the `begin` error, or [`SessionError::EditFailed`] when the
    /// editor fails.
    pub async fn run(&mut self, command: &str, editor: &(dyn Editor + '_)) -> Result<(), SessionError> {
        let ticket = self.begin(command)?;
        match editor.edit(&ticket.image, &ticket.command).await {
            Ok(image) => self.complete(image),
            Err(e) => {
                self.fail(EDIT_FAILED_MESSAGE)?;
                Err(SessionError::EditFailed(e))
            }
        }
    }
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
