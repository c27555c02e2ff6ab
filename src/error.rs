//! Error classification shared by every server-side error enum.
//!
//! Each layer keeps its own `thiserror` enum; this trait gives handlers and
//! the retry loop one way to ask "what kind of failure is this" without
//! matching on foreign variants.

/// Stable, grepable code plus a retry hint for an error value.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
