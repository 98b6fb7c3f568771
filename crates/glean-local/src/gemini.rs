//! Gemini `generateContent` backend.
//!
//! Key-in-query requests against the Generative Language API (v1beta). Point
//! `GLEAN_GEMINI_BASE_URL` at a proxy or a local stub to avoid the real endpoint.

use glean_core::{Error, Result, Summarizer};
use serde::Serialize;

use crate::env;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Returned when the model answers without any text part.
pub const NO_RESPONSE: &str = "No response available.";

pub fn gemini_api_key_from_env() -> Option<String> {
    env("GLEAN_GEMINI_API_KEY").or_else(|| env("GEMINI_API_KEY"))
}

pub fn gemini_model_from_env() -> String {
    env("GLEAN_GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

pub fn gemini_base_url_from_env() -> String {
    env("GLEAN_GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
}

pub fn gemini_timeout_ms_from_env() -> u64 {
    env("GLEAN_GEMINI_TIMEOUT_MS")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(30_000)
        .clamp(200, 120_000)
}

#[derive(Debug, Serialize)]
struct ReqPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct ReqContent {
    parts: Vec<ReqPart>,
}

#[derive(Debug, Serialize)]
struct GenCfg {
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiReq {
    contents: Vec<ReqContent>,
    generation_config: GenCfg,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_ms: u64,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            timeout_ms: 30_000,
        }
    }

    pub fn from_env(client: reqwest::Client, model_override: Option<String>) -> Result<Self> {
        let api_key = gemini_api_key_from_env().ok_or_else(|| {
            Error::NotConfigured("missing GLEAN_GEMINI_API_KEY (or GEMINI_API_KEY)".to_string())
        })?;
        Ok(Self::new(client, api_key)
            .with_base_url(gemini_base_url_from_env())
            .with_model(model_override.unwrap_or_else(gemini_model_from_env))
            .with_timeout_ms(gemini_timeout_ms_from_env()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    fn endpoint_generate(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base(),
            self.model,
            self.api_key
        )
    }

    /// Names of the models visible to this key.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1beta/models?key={}", self.base(), self.api_key);
        let resp = self
            .client
            .get(url)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| Error::Llm(e.without_url().to_string()))?;
        let status = resp.status();
        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Llm(e.without_url().to_string()))?;
        if !status.is_success() {
            return Err(Error::Llm(api_error_message(&v)));
        }
        Ok(v.get("models")
            .and_then(|x| x.as_array())
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn api_error_message(v: &serde_json::Value) -> String {
    v.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| "API request failed".to_string())
}

/// `candidates[0].content.parts[0].text`
fn first_candidate_text(v: &serde_json::Value) -> Option<String> {
    v.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait::async_trait]
impl Summarizer for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let req = GeminiReq {
            contents: vec![ReqContent {
                parts: vec![ReqPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenCfg { temperature: 0.2 },
        };

        let resp = self
            .client
            .post(self.endpoint_generate())
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .json(&req)
            .send()
            .await
            // The URL carries the key; never let it reach an error message.
            .map_err(|e| Error::Llm(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let v: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
            let message = api_error_message(&v);
            tracing::warn!(status = status.as_u16(), model = %self.model, %message, "gemini request failed");
            if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::BAD_REQUEST {
                match self.list_models().await {
                    Ok(models) => tracing::warn!(?models, "available gemini models"),
                    Err(e) => tracing::debug!(error = %e, "listing gemini models failed"),
                }
            }
            return Err(Error::Llm(message));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Llm(format!("unreadable model reply: {}", e.without_url())))?;
        Ok(first_candidate_text(&v).unwrap_or_else(|| NO_RESPONSE.to_string()))
    }
}
