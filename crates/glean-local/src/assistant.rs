use glean_core::{Error, Result, Summarizer, SummaryMode};

use crate::prompt;

/// The model-backed operations a controller offers on top of extracted article text.
///
/// `summarize` and `ask` surface failures to the caller; `tags` and
/// `key_sentences` are enrichment and degrade to an empty list instead.
#[derive(Debug, Clone)]
pub struct Assistant<S> {
    backend: S,
}

impl<S: Summarizer> Assistant<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub async fn summarize(&self, text: &str, mode: SummaryMode) -> Result<String> {
        require_content(text)?;
        tracing::info!(backend = self.backend.name(), %mode, chars = text.chars().count(), "summarizing");
        self.backend
            .generate(&prompt::summary_prompt(text, mode))
            .await
    }

    pub async fn ask(&self, text: &str, question: &str) -> Result<String> {
        require_content(text)?;
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("question must be non-empty".to_string()));
        }
        tracing::info!(backend = self.backend.name(), "answering question");
        self.backend
            .generate(&prompt::question_prompt(text, question))
            .await
    }

    pub async fn tags(&self, text: &str) -> Vec<String> {
        if require_content(text).is_err() {
            return Vec::new();
        }
        match self.backend.generate(&prompt::tags_prompt(text)).await {
            Ok(reply) => prompt::parse_tags(&reply),
            Err(e) => {
                tracing::warn!(error = %e, "tag generation failed");
                Vec::new()
            }
        }
    }

    /// Up to three sentences the model claims appear verbatim in `text`.
    pub async fn key_sentences(&self, text: &str) -> Vec<String> {
        if require_content(text).is_err() {
            return Vec::new();
        }
        match self.backend.generate(&prompt::key_sentences_prompt(text)).await {
            Ok(reply) => prompt::parse_key_sentences(&reply),
            Err(e) => {
                tracing::warn!(error = %e, "key sentence generation failed");
                Vec::new()
            }
        }
    }
}

fn require_content(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::NoContent(
            "no article text found on this page".to_string(),
        ));
    }
    Ok(())
}
