//! Environment-driven configuration.

use std::path::PathBuf;

use crate::error::{CodelensError, Result};

/// Backend used when no URL is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

const API_URL_VARS: [&str; 2] = ["CODELENS_API_URL", "NEXT_PUBLIC_API_URL"];

/// Client settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL.
    pub api_url: String,
}

impl ClientConfig {
    /// Read `CODELENS_API_URL`, then `NEXT_PUBLIC_API_URL`, else [`DEFAULT_API_URL`].
    pub fn from_env() -> Self {
        let api_url = API_URL_VARS
            .iter()
            .find_map(|key| non_empty_var(key))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self { api_url }
    }

    /// Replace the URL when an explicit override is given.
    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        if let Some(api_url) = api_url.filter(|url| !url.trim().is_empty()) {
            self.api_url = api_url;
        }
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// Resolve the result cache directory.
pub fn cache_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    if let Some(path) = non_empty_var("CODELENS_CACHE_DIR") {
        return Ok(PathBuf::from(path));
    }
    if let Some(base) = non_empty_var("XDG_CACHE_HOME") {
        return Ok(PathBuf::from(base).join("codelens"));
    }
    if let Some(home) = non_empty_var("HOME") {
        return Ok(PathBuf::from(home).join(".cache/codelens"));
    }
    Err(CodelensError::Other(
        "unable to resolve cache directory".to_string(),
    ))
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
