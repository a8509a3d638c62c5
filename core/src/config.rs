//! Runtime settings read from the environment.
//!
//! `api_base` feeds every `TodoClient`; `session_file` is where
//! `TodoApp::from_config` keeps the token.

use std::env;
use std::path::PathBuf;

use tracing::info;

pub const DEFAULT_API_BASE: &str = "http://0.0.0.0:8080";
pub const DEFAULT_SESSION_FILE: &str = ".tasklist-session.json";

/// Where the API lives and where the session token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base: String,
    pub session_file: PathBuf,
}

impl Config {
    /// Read `TASKLIST_API_BASE` and `TASKLIST_SESSION_FILE`, falling back to
    /// defaults.
    pub fn load() -> Self {
        Self {
            api_base: try_load("TASKLIST_API_BASE", DEFAULT_API_BASE),
            session_file: PathBuf::from(try_load("TASKLIST_SESSION_FILE", DEFAULT_SESSION_FILE)),
        }
    }

    pub fn new(api_base: &str, session_file: impl Into<PathBuf>) -> Self {
        Self {
            api_base: api_base.to_string(),
            session_file: session_file.into(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE, DEFAULT_SESSION_FILE)
    }
}

fn try_load(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => {
            info!("{key} not set, using default: {default}");
            default.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_uses_default() {
        assert_eq!(try_load("TASKLIST_TEST_SURELY_UNSET", "fallback"), "fallback");
    }

    #[test]
    fn default_points_at_local_api() {
        let config = Config::default();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.session_file, PathBuf::from(DEFAULT_SESSION_FILE));
    }
}
