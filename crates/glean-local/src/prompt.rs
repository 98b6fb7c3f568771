//! Prompt construction and reply parsing for the assistant operations.

use glean_core::SummaryMode;

/// Input cap for summaries and questions.
pub const SUMMARY_INPUT_CHARS: usize = 20_000;
/// Input cap for tag and key-sentence extraction.
pub const ANALYSIS_INPUT_CHARS: usize = 15_000;
pub const MAX_TAGS: usize = 3;
pub const MAX_KEY_SENTENCES: usize = 3;
/// Key sentences must be longer than this to be kept.
pub const KEY_SENTENCE_MIN_CHARS: usize = 10;

/// Clip `text` to `max_chars`, appending `...` when something was cut.
pub fn truncate_article(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn summary_prompt(text: &str, mode: SummaryMode) -> String {
    let article = truncate_article(text, SUMMARY_INPUT_CHARS);
    match mode {
        SummaryMode::Brief => format!(
            "Keep it brief. Summarize the following article in 2-3 sentences:\n\n{article}"
        ),
        SummaryMode::Detailed => format!(
            "Provide a detailed summary of the following article, covering all main points. Use paragraphs:\n\n{article}"
        ),
        SummaryMode::Bullets => format!(
            "Summarize the following article in 5-7 key points. Format each point starting with \"- \" (dash space):\n\n{article}"
        ),
        SummaryMode::Eli5 => format!(
            "Explain the main ideas of this article as if I am 5 years old. Use simple language:\n\n{article}"
        ),
    }
}

pub fn question_prompt(text: &str, question: &str) -> String {
    let article = truncate_article(text, SUMMARY_INPUT_CHARS);
    format!(
        "Answer this question based on the article provided. Question: \"{question}\"\n\nArticle:\n{article}"
    )
}

pub fn tags_prompt(text: &str) -> String {
    let article = truncate_article(text, ANALYSIS_INPUT_CHARS);
    format!(
        "Analyze this article and provide exactly 3 relevant tags. Return ONLY the tags separated by commas, no other text. Example: Technology, AI, Future.\n\nArticle:\n{article}"
    )
}

pub fn key_sentences_prompt(text: &str) -> String {
    let article = truncate_article(text, ANALYSIS_INPUT_CHARS);
    format!(
        "Identify exactly 3 most important sentences from this article that capture the core message. Return ONLY the sentences separated by a pipe symbol \"|\". Do not alter the sentences, they must match the text exactly.\n\nArticle:\n{article}"
    )
}

/// `"Technology, AI , Future"` -> `["Technology", "AI", "Future"]`.
pub fn parse_tags(reply: &str) -> Vec<String> {
    reply
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .take(MAX_TAGS)
        .map(str::to_string)
        .collect()
}

/// Pipe-delimited reply -> candidate sentences for highlighting.
pub fn parse_key_sentences(reply: &str) -> Vec<String> {
    reply
        .split('|')
        .map(str::trim)
        .filter(|s| s.chars().count() > KEY_SENTENCE_MIN_CHARS)
        .take(MAX_KEY_SENTENCES)
        .map(str::to_string)
        .collect()
}
