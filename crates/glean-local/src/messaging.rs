//! Request/response boundary between a controller and the page.
//!
//! The wire shapes match what a content script exchanges with its popup:
//! `{"type":"GET_ARTICLE_TEXT"}` -> `{"text": ...}` and
//! `{"type":"HIGHLIGHT_TEXT","sentences":[...]}` -> `{"status":"success"}`.

use serde::{Deserialize, Serialize};

use crate::extract::article_text;
use crate::highlight::apply_highlights;
use crate::page::Page;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageRequest {
    GetArticleText,
    HighlightText {
        #[serde(default)]
        sentences: Vec<String>,
    },
    Ping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageResponse {
    Text { text: String },
    Status { status: String },
}

impl PageResponse {
    fn status(s: &str) -> Self {
        PageResponse::Status {
            status: s.to_string(),
        }
    }
}

/// Serve one request against `page`.
///
/// Runs to completion synchronously. The `&mut` borrow is what serializes
/// extraction and highlighting against the same document.
pub fn handle_request(page: &mut Page, req: PageRequest) -> PageResponse {
    match req {
        PageRequest::GetArticleText => PageResponse::Text {
            text: article_text(page),
        },
        PageRequest::HighlightText { sentences } => {
            apply_highlights(page, &sentences);
            PageResponse::status("success")
        }
        PageRequest::Ping => PageResponse::status("PONG"),
    }
}
