use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no usable content: {0}")]
    NoContent(String),
    #[error("llm failed: {0}")]
    Llm(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Summary flavour requested by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    #[default]
    Brief,
    Detailed,
    Bullets,
    Eli5,
}

impl SummaryMode {
    pub const ALL: [SummaryMode; 4] = [
        SummaryMode::Brief,
        SummaryMode::Detailed,
        SummaryMode::Bullets,
        SummaryMode::Eli5,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SummaryMode::Brief => "brief",
            SummaryMode::Detailed => "detailed",
            SummaryMode::Bullets => "bullets",
            SummaryMode::Eli5 => "eli5",
        }
    }
}

impl fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brief" => Ok(SummaryMode::Brief),
            "detailed" => Ok(SummaryMode::Detailed),
            "bullets" => Ok(SummaryMode::Bullets),
            "eli5" => Ok(SummaryMode::Eli5),
            other => Err(Error::InvalidInput(format!(
                "unknown summary mode {other:?} (allowed: brief, detailed, bullets, eli5)"
            ))),
        }
    }
}

/// A finished summary as submitted to the library.
///
/// Only `url`, `title` and `summary` are required; `type` and `tags` fall back to
/// `brief` and `[]` when absent, `null` or empty. A `null` required field reads as
/// empty so [`NewSummary::validate`] reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSummary {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub summary: String,
    #[serde(rename = "type", default, deserialize_with = "mode_or_default")]
    pub mode: SummaryMode,
    #[serde(default, deserialize_with = "tags_or_empty")]
    pub tags: Vec<String>,
}

fn string_or_empty<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn mode_or_default<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<SummaryMode, D::Error> {
    match Option::<String>::deserialize(d)? {
        Some(s) if !s.trim().is_empty() => s.parse().map_err(serde::de::Error::custom),
        _ => Ok(SummaryMode::default()),
    }
}

fn tags_or_empty<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(d)?.unwrap_or_default())
}

impl NewSummary {
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty()
            || self.title.trim().is_empty()
            || self.summary.trim().is_empty()
        {
            return Err(Error::InvalidInput("Missing required fields".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub summary: String,
    #[serde(rename = "type")]
    pub mode: SummaryMode,
    pub tags: Vec<String>,
    pub created_at_epoch_ms: u64,
}

/// Text-in, text-out model backend.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Where finished summaries go.
#[async_trait::async_trait]
pub trait SummaryStore: Send + Sync {
    async fn save(&self, new: NewSummary) -> Result<SummaryRecord>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<SummaryRecord>>;
    async fn get(&self, id: &str) -> Result<Option<SummaryRecord>>;
}
