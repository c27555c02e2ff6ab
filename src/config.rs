//! Server configuration parsed from environment variables.
//!
//! Every config struct in the crate exposes `from_env()` plus a
//! `from_lookup()` that takes the variable source as a closure, so tests can
//! feed a map instead of mutating the process environment.

use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Source of configuration values, normally [`env_lookup`].
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Read a variable from the process environment.
#[must_use]
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse `key` from `var`, falling back to `default` when absent or invalid.
pub fn parse_or<T>(var: Lookup<'_>, key: &str, default: T) -> T
where
    T: FromStr,
{
    var(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Upper bound on request bodies; data-URI images are large.
    pub max_body_bytes: usize,
}

impl ServerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(&env_lookup)
    }

    /// - `PORT`: default 3000
    /// - `MAX_BODY_BYTES`: default 16 MiB
    #[must_use]
    pub fn from_lookup(var: Lookup<'_>) -> Self {
        Self {
            port: parse_or(var, "PORT", DEFAULT_PORT),
            max_body_bytes: parse_or(var, "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT, max_body_bytes: DEFAULT_MAX_BODY_BYTES }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
