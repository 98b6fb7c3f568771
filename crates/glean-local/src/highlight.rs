//! Key-sentence highlighting.
//!
//! A pass first unwraps every marker left by the previous pass, then marks the first
//! literal occurrence of each candidate sentence. Only one generation of markers is
//! ever live, and the page's `textContent` is unchanged by either step.

use ego_tree::NodeId;
use html_scraper::node::{Element, Text};
use html_scraper::{Html, Node, Selector};
use serde::Serialize;

use crate::page::{leaf_text, Page};

/// Class carried by every marker; the only way markers are found again.
pub const HIGHLIGHT_CLASS: &str = "ai-highlight";
pub const HIGHLIGHT_STYLE: &str = "background-color: #fef08a; color: #000";
pub(crate) const HIGHLIGHT_SELECTOR: &str = "mark.ai-highlight";

/// Candidates shorter than this (in chars) are treated as noise.
pub const MIN_SENTENCE_CHARS: usize = 10;

/// Text under these elements is never wrapped.
const RAW_TEXT: &[&str] = &["script", "style", "noscript", "template", "textarea"];

/// What a pass did. Diagnostic only: callers get a plain acknowledgement at the
/// messaging boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HighlightStats {
    /// Markers unwrapped from the previous pass.
    pub removed: usize,
    pub requested: usize,
    pub skipped_short: usize,
    pub marked: usize,
}

/// Run one highlight pass over `page`.
///
/// Each candidate is searched independently, in input order, from the start of the
/// (already mutated) document. Matching is exact: case, whitespace and punctuation
/// all count. Candidates that never match are dropped silently.
///
/// Text already inside a marker from this pass stays eligible, so a candidate that
/// is a substring of an earlier one nests inside its marker.
pub fn apply_highlights<S: AsRef<str>>(page: &mut Page, sentences: &[S]) -> HighlightStats {
    let mut stats = HighlightStats {
        removed: clear_highlights(page),
        requested: sentences.len(),
        ..HighlightStats::default()
    };

    let Some(template) = marker_template() else {
        tracing::warn!("highlight marker template failed to parse; skipping pass");
        return stats;
    };

    for sentence in sentences {
        let sentence = sentence.as_ref();
        if sentence.chars().count() < MIN_SENTENCE_CHARS {
            stats.skipped_short += 1;
            continue;
        }
        let Some((leaf, at)) = first_leaf_containing(page, sentence) else {
            tracing::debug!(sentence_chars = sentence.chars().count(), "no match for candidate");
            continue;
        };
        wrap_match(page.doc_mut(), leaf, at, sentence, &template);
        stats.marked += 1;
    }

    tracing::debug!(
        removed = stats.removed,
        requested = stats.requested,
        skipped_short = stats.skipped_short,
        marked = stats.marked,
        "highlight pass complete"
    );
    stats
}

/// Unwrap every marker back into plain text. Returns how many markers were removed.
///
/// The restored text is merged with neighbouring text nodes so a later pass can
/// match sentences that straddle an old marker boundary.
pub fn clear_highlights(page: &mut Page) -> usize {
    let Ok(sel) = Selector::parse(HIGHLIGHT_SELECTOR) else {
        return 0;
    };
    // Select from the root element: `Html::select` also walks detached subtrees.
    let marks: Vec<(NodeId, String)> = page
        .doc()
        .root_element()
        .select(&sel)
        .map(|m| (m.id(), m.text().collect::<String>()))
        .collect();

    let doc = page.doc_mut();
    let mut parents: Vec<NodeId> = Vec::new();
    let mut removed = 0;
    for (id, text) in &marks {
        // A marker nested in one we already unwrapped is gone with it.
        if !is_attached(doc, *id) {
            continue;
        }
        let Some(mut mark) = doc.tree.get_mut(*id) else {
            continue;
        };
        let Some(parent) = mark.parent().map(|p| p.id()) else {
            continue;
        };
        if !text.is_empty() {
            mark.insert_before(text_node(text));
        }
        mark.detach();
        removed += 1;
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }
    for parent in parents {
        merge_text_runs(doc, parent);
    }
    removed
}

fn marker_template() -> Option<Element> {
    let frag = Html::parse_fragment(&format!(
        r#"<mark class="{HIGHLIGHT_CLASS}" style="{HIGHLIGHT_STYLE}"></mark>"#
    ));
    let sel = Selector::parse("mark").ok()?;
    let el = frag.select(&sel).next()?;
    Some(el.value().clone())
}

fn text_node(s: &str) -> Node {
    Node::Text(Text { text: s.into() })
}

fn in_raw_text(page: &Page, id: NodeId) -> bool {
    let Some(node) = page.doc().tree.get(id) else {
        return false;
    };
    node.ancestors().any(|a| {
        a.value()
            .as_element()
            .is_some_and(|e| RAW_TEXT.contains(&e.name()))
    })
}

/// First text leaf (pre-order, source order) containing `sentence`, with the byte
/// offset of its first occurrence.
fn first_leaf_containing(page: &Page, sentence: &str) -> Option<(NodeId, usize)> {
    let scope = page.scope()?;
    scope
        .descendants()
        .filter_map(|node| {
            let at = leaf_text(node.value())?.find(sentence)?;
            Some((node.id(), at))
        })
        .find(|(id, _)| !in_raw_text(page, *id))
}

/// Replace the leaf with `prefix`, `<mark>sentence</mark>`, `suffix`. Empty
/// prefix/suffix nodes are omitted.
fn wrap_match(doc: &mut Html, leaf: NodeId, at: usize, sentence: &str, template: &Element) {
    let Some(mut node) = doc.tree.get_mut(leaf) else {
        return;
    };
    let full = match leaf_text(node.value()) {
        Some(t) => t.to_string(),
        None => return,
    };
    let (prefix, rest) = full.split_at(at);
    let suffix = &rest[sentence.len()..];

    if !prefix.is_empty() {
        node.insert_before(text_node(prefix));
    }
    {
        let mut mark = node.insert_before(Node::Element(template.clone()));
        mark.append(text_node(sentence));
    }
    if !suffix.is_empty() {
        node.insert_before(text_node(suffix));
    }
    node.detach();
}

fn is_attached(doc: &Html, id: NodeId) -> bool {
    let root = doc.tree.root().id();
    match doc.tree.get(id) {
        Some(node) => node.ancestors().any(|a| a.id() == root),
        None => false,
    }
}

/// Merge each run of adjacent text children of `parent` into its first node.
fn merge_text_runs(doc: &mut Html, parent: NodeId) {
    let Some(p) = doc.tree.get(parent) else {
        return;
    };
    let mut runs: Vec<(NodeId, String, Vec<NodeId>)> = Vec::new();
    let mut in_run = false;
    for child in p.children() {
        match leaf_text(child.value()) {
            Some(t) => {
                if in_run {
                    if let Some((_, merged, rest)) = runs.last_mut() {
                        merged.push_str(t);
                        rest.push(child.id());
                    }
                } else {
                    runs.push((child.id(), t.to_string(), Vec::new()));
                    in_run = true;
                }
            }
            None => in_run = false,
        }
    }

    for (first, merged, rest) in runs {
        if rest.is_empty() {
            continue;
        }
        if let Some(mut node) = doc.tree.get_mut(first) {
            if let Node::Text(t) = node.value() {
                t.text = merged.as_str().into();
            }
        }
        for id in rest {
            if let Some(mut node) = doc.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TWO_PARAS: &str =
        "<html><body><p>The sky is blue today.</p><p>Water boils at 100 degrees.</p></body></html>";

    fn marker_texts(page: &Page) -> Vec<String> {
        let sel = Selector::parse(HIGHLIGHT_SELECTOR).unwrap();
        page.doc()
            .root_element()
            .select(&sel)
            .map(|m| m.text().collect::<String>())
            .collect()
    }

    #[test]
    fn marks_only_the_matching_paragraph() {
        let mut page = Page::parse(TWO_PARAS);
        let stats = apply_highlights(&mut page, &["Water boils at 100 degrees."]);
        assert_eq!(stats.marked, 1);
        assert_eq!(marker_texts(&page), vec!["Water boils at 100 degrees."]);

        let sel = Selector::parse("p").unwrap();
        let first = page.doc().select(&sel).next().unwrap();
        assert!(!first.html().contains("<mark"));
        assert_eq!(
            page.text_content(),
            "The sky is blue today.Water boils at 100 degrees."
        );
    }

    #[test]
    fn marker_carries_class_and_style() {
        let mut page = Page::parse(TWO_PARAS);
        apply_highlights(&mut page, &["The sky is blue today."]);
        let html = page.html();
        assert!(html.contains(r#"class="ai-highlight""#), "{html}");
        assert!(html.contains("background-color: #fef08a; color: #000"), "{html}");
    }

    #[test]
    fn splits_prefix_and_suffix_around_the_match() {
        let mut page = Page::parse("<p>Before. The key sentence is here. After.</p>");
        apply_highlights(&mut page, &["The key sentence is here."]);
        let sel = Selector::parse("p").unwrap();
        let p = page.doc().select(&sel).next().unwrap();
        let kinds: Vec<&str> = p
            .children()
            .map(|c| match c.value() {
                Node::Text(_) => "text",
                Node::Element(_) => "mark",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["text", "mark", "text"]);
        assert_eq!(page.text_content(), "Before. The key sentence is here. After.");
    }

    #[test]
    fn omits_empty_prefix_and_suffix() {
        let mut page = Page::parse("<p>Exactly the whole text.</p>");
        apply_highlights(&mut page, &["Exactly the whole text."]);
        let sel = Selector::parse("p").unwrap();
        let p = page.doc().select(&sel).next().unwrap();
        assert_eq!(p.children().count(), 1);
    }

    #[test]
    fn marks_at_most_one_occurrence_per_candidate() {
        let mut page = Page::parse(
            "<p>Repeat this line.</p><p>Repeat this line.</p><p>Repeat this line.</p>",
        );
        apply_highlights(&mut page, &["Repeat this line."]);
        assert_eq!(page.highlight_count(), 1);
        // The first occurrence in document order is the one marked.
        let sel = Selector::parse("p").unwrap();
        let first = page.doc().select(&sel).next().unwrap();
        assert!(first.html().contains("<mark"));
    }

    #[test]
    fn keeps_text_after_a_repeat_inside_the_same_leaf() {
        let mut page = Page::parse("<p>Same words twice. Same words twice. Tail.</p>");
        apply_highlights(&mut page, &["Same words twice."]);
        assert_eq!(page.highlight_count(), 1);
        assert_eq!(
            page.text_content(),
            "Same words twice. Same words twice. Tail."
        );
    }

    #[test]
    fn length_guard_is_ten_chars() {
        let mut page = Page::parse("<p>123456789 and 1234567890 appear here.</p>");
        let stats = apply_highlights(&mut page, &["123456789"]);
        assert_eq!(stats.skipped_short, 1);
        assert_eq!(page.highlight_count(), 0);

        let stats = apply_highlights(&mut page, &["1234567890"]);
        assert_eq!(stats.skipped_short, 0);
        assert_eq!(page.highlight_count(), 1);
    }

    #[test]
    fn length_guard_counts_chars_not_bytes() {
        // 9 chars, 18 bytes.
        let mut page = Page::parse("<p>ééééééééé here</p>");
        apply_highlights(&mut page, &["ééééééééé"]);
        assert_eq!(page.highlight_count(), 0);
    }

    #[test]
    fn matching_is_case_and_whitespace_sensitive() {
        let mut page = Page::parse(TWO_PARAS);
        let stats = apply_highlights(
            &mut page,
            &["the sky is blue today.", "Water boils at  100 degrees."],
        );
        assert_eq!(stats.marked, 0);
        assert_eq!(page.highlight_count(), 0);
    }

    #[test]
    fn unmatched_candidates_are_dropped_silently() {
        let mut page = Page::parse(TWO_PARAS);
        let stats = apply_highlights(
            &mut page,
            &["A sentence the model made up.", "The sky is blue today."],
        );
        assert_eq!(stats.requested, 2);
        assert_eq!(stats.marked, 1);
    }

    #[test]
    fn empty_pass_resets_to_the_original_text() {
        let mut page = Page::parse(TWO_PARAS);
        let before = page.text_content();
        apply_highlights(&mut page, &["The sky is blue today.", "Water boils at 100 degrees."]);
        assert_eq!(page.highlight_count(), 2);

        let stats = apply_highlights::<&str>(&mut page, &[]);
        assert_eq!(stats.removed, 2);
        assert_eq!(page.highlight_count(), 0);
        assert_eq!(page.text_content(), before);
        assert!(!page.html().contains("<mark"));
    }

    #[test]
    fn repeated_passes_do_not_accumulate() {
        let mut page = Page::parse(TWO_PARAS);
        let cands = ["The sky is blue today."];
        apply_highlights(&mut page, &cands);
        apply_highlights(&mut page, &cands);
        assert_eq!(marker_texts(&page), vec!["The sky is blue today."]);
    }

    #[test]
    fn later_pass_matches_across_an_old_marker_boundary() {
        let mut page = Page::parse("<p>Alpha beta gamma delta epsilon.</p>");
        apply_highlights(&mut page, &["beta gamma delta"]);
        let stats = apply_highlights(&mut page, &["Alpha beta gamma"]);
        assert_eq!(stats.marked, 1);
        assert_eq!(marker_texts(&page), vec!["Alpha beta gamma"]);
    }

    #[test]
    fn substring_of_an_earlier_candidate_nests_inside_its_marker() {
        let mut page = Page::parse("<p>One long sentence with a middle part.</p>");
        let stats = apply_highlights(
            &mut page,
            &["One long sentence with a middle part.", "with a middle"],
        );
        assert_eq!(stats.marked, 2);
        assert_eq!(page.highlight_count(), 2);
        assert_eq!(page.text_content(), "One long sentence with a middle part.");

        // The inner marker goes with the outer one.
        let stats = apply_highlights::<&str>(&mut page, &[]);
        assert_eq!(stats.removed, 1);
        assert_eq!(page.highlight_count(), 0);
        assert_eq!(page.text_content(), "One long sentence with a middle part.");

        let stats = apply_highlights::<&str>(&mut page, &[]);
        assert_eq!(stats.removed, 0);
        assert_eq!(page.html(), Page::parse(&page.html()).html());
    }

    #[test]
    fn reset_after_nested_pass_leaves_no_markers_behind() {
        let mut page = Page::parse("<p>Alpha beta gamma delta epsilon.</p>");
        apply_highlights(
            &mut page,
            &["Alpha beta gamma delta", "beta gamma delta", "gamma delta"],
        );
        assert_eq!(page.highlight_count(), 3);

        let stats = apply_highlights(&mut page, &["delta epsilon."]);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.marked, 1);
        assert_eq!(page.highlight_count(), 1);
        assert_eq!(marker_texts(&page), vec!["delta epsilon."]);
        assert_eq!(page.text_content(), "Alpha beta gamma delta epsilon.");
    }

    #[test]
    fn reparsed_page_keeps_markers_and_can_be_reset() {
        let mut page = Page::parse(TWO_PARAS);
        apply_highlights(&mut page, &["Water boils at 100 degrees."]);
        let mut fresh = Page::parse(&page.html());
        assert_eq!(fresh.html(), page.html());
        assert_eq!(fresh.highlight_count(), 1);

        assert_eq!(clear_highlights(&mut fresh), 1);
        assert_eq!(fresh.text_content(), Page::parse(TWO_PARAS).text_content());
    }

    #[test]
    fn never_wraps_script_or_style_text() {
        let mut page = Page::parse(
            "<body><script>var s = 'secret sentence here';</script><p>secret sentence here</p></body>",
        );
        apply_highlights(&mut page, &["secret sentence here"]);
        let sel = Selector::parse("script").unwrap();
        let script = page.doc().select(&sel).next().unwrap();
        assert!(!script.html().contains("<mark"));
        assert_eq!(page.highlight_count(), 1);
    }

    #[test]
    fn text_spanning_elements_does_not_match() {
        let mut page = Page::parse("<p>Split across <b>two nodes</b> here.</p>");
        let stats = apply_highlights(&mut page, &["Split across two nodes"]);
        assert_eq!(stats.marked, 0);
    }

    proptest! {
        #[test]
        fn highlight_never_changes_text_content(
            paras in prop::collection::vec("[a-zA-Z .,]{0,60}", 0..6),
            picks in prop::collection::vec((0usize..6, 0usize..60, 0usize..40), 0..6),
        ) {
            let body: String = paras
                .iter()
                .map(|p| format!("<p>{p}</p>"))
                .collect();
            let mut page = Page::parse(&format!("<html><body>{body}</body></html>"));
            let before = page.text_content();

            // Candidates are slices of real paragraphs, so some match and some overlap.
            let cands: Vec<String> = picks
                .iter()
                .filter_map(|(i, start, len)| {
                    let p = paras.get(*i)?;
                    let s = (*start).min(p.len());
                    let e = (s + len).min(p.len());
                    Some(p[s..e].to_string())
                })
                .collect();

            let stats = apply_highlights(&mut page, &cands);
            prop_assert_eq!(page.text_content(), before.clone());
            prop_assert_eq!(page.highlight_count(), stats.marked);

            apply_highlights::<String>(&mut page, &[]);
            prop_assert_eq!(page.highlight_count(), 0);
            prop_assert_eq!(page.text_content(), before);
        }
    }
}
