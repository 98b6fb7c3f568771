//! Parsed page model.
//!
//! A [`Page`] owns the document tree that the extractor reads and the highlighter
//! mutates in place. Callers hand it to both operations explicitly; nothing here
//! reaches for ambient state, which keeps the core testable on synthetic markup.

use ego_tree::{NodeId, NodeRef};
use html_scraper::{Html, Node, Selector};

use crate::highlight::HIGHLIGHT_SELECTOR;

/// Mutation detaches nodes rather than freeing them, so the underlying arena grows
/// with every highlight pass. Re-parse from [`Page::html`] to compact a page that
/// lives across many passes.
#[derive(Debug)]
pub struct Page {
    doc: Html,
}

impl Page {
    /// Parse a full HTML document. Parsing never fails; malformed markup is repaired
    /// the way a browser would.
    pub fn parse(html: &str) -> Self {
        Self {
            doc: Html::parse_document(html),
        }
    }

    /// Serialize the current (possibly highlighted) document.
    pub fn html(&self) -> String {
        self.doc.html()
    }

    /// Whitespace-normalized `<title>`, if present and non-empty.
    pub fn title(&self) -> Option<String> {
        let sel = Selector::parse("title").ok()?;
        let el = self.doc.select(&sel).next()?;
        let t = el
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        (!t.is_empty()).then_some(t)
    }

    /// Concatenation of every text leaf in scope, in document order.
    ///
    /// This is the raw `textContent`, not the rendered text: highlight passes must
    /// leave it byte-for-byte unchanged.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        if let Some(scope) = self.scope() {
            for node in scope.descendants() {
                if let Some(t) = leaf_text(node.value()) {
                    out.push_str(t);
                }
            }
        }
        out
    }

    /// Number of highlight markers currently in the document.
    pub fn highlight_count(&self) -> usize {
        match Selector::parse(HIGHLIGHT_SELECTOR) {
            Ok(sel) => self.doc.root_element().select(&sel).count(),
            Err(_) => 0,
        }
    }

    /// `<body>` when the parser produced one, else the document root.
    pub(crate) fn scope(&self) -> Option<NodeRef<'_, Node>> {
        let id = self.scope_id();
        self.doc.tree.get(id)
    }

    pub(crate) fn scope_id(&self) -> NodeId {
        Selector::parse("body")
            .ok()
            .and_then(|sel| self.doc.select(&sel).next().map(|el| el.id()))
            .unwrap_or_else(|| self.doc.tree.root().id())
    }

    pub(crate) fn doc(&self) -> &Html {
        &self.doc
    }

    pub(crate) fn doc_mut(&mut self) -> &mut Html {
        &mut self.doc
    }
}

pub(crate) fn leaf_text(node: &Node) -> Option<&str> {
    node.as_text().map(|t| &**t)
}
