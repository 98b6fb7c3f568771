//! Local implementations for glean: the page core (extraction and highlighting),
//! the Gemini-backed assistant, and summary storage.

use glean_core::{Error, Result};
use std::time::Duration;

pub mod assistant;
pub mod extract;
pub mod gemini;
pub mod highlight;
pub mod library;
pub mod messaging;
pub mod page;
pub mod prompt;
pub mod stats;

pub use page::Page;

/// Trimmed, non-empty environment variable.
pub fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Shared HTTP client for model and library calls.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("glean/", env!("CARGO_PKG_VERSION")))
        // Per-request timeouts can still tighten this.
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(120))
        .build()
        .map_err(|e| Error::NotConfigured(format!("http client: {e}")))
}
