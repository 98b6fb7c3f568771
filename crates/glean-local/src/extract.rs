use ego_tree::NodeRef;
use html_scraper::{ElementRef, Node, Selector};

use crate::page::Page;

/// Words per minute used for the "reading time saved" estimate.
pub const READING_WPM: usize = 200;

/// Elements whose content is never rendered.
const NON_RENDERED: &[&str] = &[
    "head", "title", "script", "style", "noscript", "template", "meta", "link",
];

/// Elements that start and end on their own line.
const BLOCK_LEVEL: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "caption",
    "dd",
    "details",
    "dialog",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "pre",
    "section",
    "summary",
    "table",
    "tr",
    "ul",
];

/// The article text of a page, as the reader sees it.
///
/// - the first `<article>` element wins, rendered as plain text
/// - otherwise every `<p>` in document order, rendered, joined with a blank line
/// - otherwise `""`
///
/// An empty result means "no usable content"; callers must not summarize it.
pub fn article_text(page: &Page) -> String {
    let doc = page.doc();
    if let Ok(sel) = Selector::parse("article") {
        if let Some(article) = doc.select(&sel).next() {
            return inner_text(article);
        }
    }
    let Ok(sel) = Selector::parse("p") else {
        return String::new();
    };
    doc.select(&sel)
        .map(inner_text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Minutes needed to read `text` at [`READING_WPM`], rounded up.
pub fn reading_minutes(text: &str) -> u64 {
    let words = text.split_whitespace().count();
    words.div_ceil(READING_WPM) as u64
}

#[derive(Debug)]
enum Piece {
    /// Text subject to whitespace collapsing.
    Text(String),
    /// Text rendered verbatim (`<pre>` content, cell separators).
    Verbatim(String),
    /// A forced newline (`<br>`).
    Newline,
    /// A required line break run around a block; adjacent runs collapse to the max.
    Break(usize),
}

/// Rendered plain text of an element, close to the browser's `innerText`.
pub fn inner_text(el: ElementRef<'_>) -> String {
    let mut pieces = Vec::new();
    collect(*el, false, &mut pieces);
    assemble(pieces)
}

fn collect(node: NodeRef<'_, Node>, in_pre: bool, out: &mut Vec<Piece>) {
    match node.value() {
        Node::Text(t) => {
            let s: &str = t;
            let s = s.to_string();
            if in_pre {
                out.push(Piece::Verbatim(s));
            } else {
                out.push(Piece::Text(s));
            }
        }
        Node::Element(el) => {
            let name = el.name();
            if NON_RENDERED.contains(&name) {
                return;
            }
            if name == "br" {
                out.push(Piece::Newline);
                return;
            }
            let breaks = if name == "p" {
                2
            } else if BLOCK_LEVEL.contains(&name) {
                1
            } else {
                0
            };
            if breaks > 0 {
                out.push(Piece::Break(breaks));
            }
            let pre = in_pre || name == "pre" || name == "textarea";
            for child in node.children() {
                collect(child, pre, out);
            }
            if (name == "td" || name == "th") && has_next_cell(node) {
                out.push(Piece::Verbatim("\t".to_string()));
            }
            if breaks > 0 {
                out.push(Piece::Break(breaks));
            }
        }
        Node::Document | Node::Fragment => {
            for child in node.children() {
                collect(child, in_pre, out);
            }
        }
        _ => {}
    }
}

fn has_next_cell(node: NodeRef<'_, Node>) -> bool {
    node.next_siblings().any(|s| {
        s.value()
            .as_element()
            .is_some_and(|e| e.name() == "td" || e.name() == "th")
    })
}

fn collapse_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for ch in s.chars() {
        // Only ASCII whitespace collapses; U+00A0 is content.
        if matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{000C}') {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(ch);
            in_ws = false;
        }
    }
    out
}

fn at_line_start(out: &str) -> bool {
    out.is_empty() || out.ends_with('\n')
}

fn trim_trailing_spaces(out: &mut String) {
    let keep = out.trim_end_matches(' ').len();
    out.truncate(keep);
}

fn flush_breaks(out: &mut String, pending: &mut usize) {
    if *pending == 0 {
        return;
    }
    trim_trailing_spaces(out);
    for _ in 0..*pending {
        out.push('\n');
    }
    *pending = 0;
}

fn assemble(pieces: Vec<Piece>) -> String {
    let mut out = String::new();
    let mut pending = 0usize;
    for piece in pieces {
        match piece {
            Piece::Break(n) => {
                // Leading breaks are dropped; trailing ones are never flushed.
                if !out.is_empty() {
                    pending = pending.max(n);
                }
            }
            Piece::Newline => {
                flush_breaks(&mut out, &mut pending);
                trim_trailing_spaces(&mut out);
                out.push('\n');
            }
            Piece::Text(t) => {
                let collapsed = collapse_ws(&t);
                if collapsed.is_empty() {
                    continue;
                }
                if collapsed == " " && (pending > 0 || at_line_start(&out) || out.ends_with(' '))
                {
                    continue;
                }
                flush_breaks(&mut out, &mut pending);
                let s = if at_line_start(&out) || out.ends_with(' ') {
                    collapsed.trim_start_matches(' ')
                } else {
                    collapsed.as_str()
                };
                out.push_str(s);
            }
            Piece::Verbatim(t) => {
                if t.is_empty() {
                    continue;
                }
                flush_breaks(&mut out, &mut pending);
                out.push_str(&t);
            }
        }
    }
    trim_trailing_spaces(&mut out);
    out
}
