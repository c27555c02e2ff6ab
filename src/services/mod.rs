//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the edit pipeline and its upstream calls so route
//! handlers can stay focused on protocol translation and rate limiting.

pub mod classifier;
pub mod dispatch;
pub mod edit;
pub mod images;
pub mod retry;
