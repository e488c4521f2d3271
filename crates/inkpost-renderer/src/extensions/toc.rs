//! Table of contents built from the rendered headings.
//!
//! The target platform strips in-page anchors, so entries are plain text
//! with hierarchical numbers rather than links.

use std::collections::HashSet;
use std::fmt::Write;

use serde::Serialize;

use crate::context::RenderContext;
use crate::extension::{Extension, ExtensionError};
use crate::markup::{self, Node, StartTag};
use crate::util::escape_html;

const DEFAULT_TITLE: &str = "Contents";
const LEVELS: usize = 6;

/// A heading found in rendered HTML.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HeadingRecord {
    pub level: u8,
    /// Text content with markup stripped and whitespace collapsed.
    pub text: String,
    pub id: String,
}

struct ScannedHeading {
    level: u8,
    text: String,
    id: Option<String>,
    /// Offset of the `<hN` start tag.
    tag_start: usize,
    /// Where an `id` attribute would go.
    attr_at: usize,
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn scan_headings(html: &str) -> Vec<ScannedHeading> {
    let mut headings = Vec::new();
    let mut current: Option<(String, ScannedHeading)> = None;
    // Open elements inside a skipped subtree of the current heading.
    let mut hidden_depth = 0_usize;
    let mut link_depth = 0_usize;

    for node in markup::scan(html) {
        match node {
            Node::Open(tag) if !tag.self_closing && hidden_depth > 0 => hidden_depth += 1,
            Node::Close { .. } if hidden_depth > 0 => hidden_depth -= 1,
            Node::Open(tag) if !tag.self_closing => {
                if current.is_some() && is_decoration(&tag, link_depth) {
                    hidden_depth = 1;
                } else if let Some(level) = heading_level(&tag.name) {
                    if let Some((_, open)) = current.take() {
                        headings.push(open);
                    }
                    link_depth = 0;
                    let heading = ScannedHeading {
                        level,
                        text: String::new(),
                        id: tag.attr("id").filter(|id| !id.is_empty()).map(str::to_owned),
                        tag_start: tag.range.start,
                        attr_at: tag.attr_insert_at(html),
                    };
                    current = Some((tag.name, heading));
                } else if tag.name == "a" && current.is_some() {
                    link_depth += 1;
                }
            }
            Node::Open(_) => {}
            Node::Text(text) => {
                if hidden_depth > 0 {
                    continue;
                }
                if let Some((_, heading)) = &mut current {
                    heading.text.push_str(&text);
                }
            }
            Node::Close { name } => {
                if name == "a" {
                    link_depth = link_depth.saturating_sub(1);
                } else if current.as_ref().is_some_and(|(open, _)| *open == name)
                    && let Some((_, heading)) = current.take()
                {
                    headings.push(heading);
                }
            }
        }
    }
    if let Some((_, heading)) = current {
        headings.push(heading);
    }

    for heading in &mut headings {
        heading.text = heading.text.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    headings
}

/// Elements whose text stays out of heading text: `aria-hidden` subtrees
/// and link ordinals (`<sup>` inside `<a>`).
fn is_decoration(tag: &StartTag, link_depth: usize) -> bool {
    tag.attr("aria-hidden") == Some("true") || (tag.name == "sup" && link_depth > 0)
}

/// Give every heading an id, returning the ids in document order and
/// whether each one was synthesized.
fn assign_ids(headings: &[ScannedHeading]) -> Vec<(String, bool)> {
    let mut used: HashSet<String> = headings.iter().filter_map(|h| h.id.clone()).collect();
    headings
        .iter()
        .enumerate()
        .map(|(index, heading)| {
            if let Some(id) = &heading.id {
                return (id.clone(), false);
            }
            let base = format!("heading-{index}");
            let mut id = base.clone();
            let mut suffix = 1;
            while used.contains(&id) {
                id = format!("{base}-{suffix}");
                suffix += 1;
            }
            used.insert(id.clone());
            (id, true)
        })
        .collect()
}

/// Headings of `html` in document order.
///
/// Headings without an `id` get `heading-{n}`, where `n` is their
/// zero-based position among all headings.
#[must_use]
pub fn extract_headings(html: &str) -> Vec<HeadingRecord> {
    let headings = scan_headings(html);
    let ids = assign_ids(&headings);
    headings
        .into_iter()
        .zip(ids)
        .map(|(heading, (id, _))| HeadingRecord {
            level: heading.level,
            text: heading.text,
            id,
        })
        .collect()
}

/// Hierarchical numbers for headings at the given levels.
///
/// Incrementing a level resets every deeper level. Levels above the
/// shallowest one seen so far are left out, so a document starting at
/// `h2` numbers its first heading `1`.
#[must_use]
pub fn number_headings(levels: &[u8]) -> Vec<String> {
    let mut counters = [0_u32; LEVELS];
    let mut first = usize::MAX;
    levels
        .iter()
        .map(|&level| {
            let idx = usize::from(level.clamp(1, 6)) - 1;
            first = first.min(idx);
            counters[idx] += 1;
            for deeper in &mut counters[idx + 1..] {
                *deeper = 0;
            }
            counters[first..=idx]
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(".")
        })
        .collect()
}

/// Inserts a numbered table of contents before the first top-level
/// heading.
pub struct TocExtension {
    title: String,
    max_level: u8,
}

impl TocExtension {
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: DEFAULT_TITLE.to_owned(),
            max_level: 6,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Deepest heading level listed (1-6).
    #[must_use]
    pub fn with_max_level(mut self, max_level: u8) -> Self {
        self.max_level = max_level.clamp(1, 6);
        self
    }

    fn render_toc(&self, entries: &[(&ScannedHeading, String)]) -> String {
        let shallowest = entries.iter().map(|(h, _)| h.level).min().unwrap_or(1);
        let mut out = String::from(r#"<section class="auto-toc">"#);
        if !self.title.is_empty() {
            write!(out, r#"<p class="auto-toc-title">{}</p>"#, escape_html(&self.title)).unwrap();
        }
        for (heading, number) in entries {
            let indent = heading.level - shallowest;
            write!(
                out,
                r#"<p class="auto-toc-item auto-toc-h{}" style="padding-left:{indent}em"><span class="toc-number">{number}</span> <span class="toc-text">{}</span></p>"#,
                heading.level,
                escape_html(&heading.text)
            )
            .unwrap();
        }
        out.push_str(r#"</section><hr class="auto-toc-divider" />"#);
        out
    }
}

impl Default for TocExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl Extension for TocExtension {
    fn name(&self) -> &'static str {
        "auto-toc"
    }

    fn postprocess(&self, html: String, _ctx: &mut RenderContext) -> Result<String, ExtensionError> {
        let headings = scan_headings(&html);
        if headings.is_empty() {
            return Ok(html);
        }
        let ids = assign_ids(&headings);

        let listed: Vec<&ScannedHeading> = headings
            .iter()
            .filter(|h| h.level <= self.max_level)
            .collect();
        let levels: Vec<u8> = listed.iter().map(|h| h.level).collect();
        let entries: Vec<(&ScannedHeading, String)> =
            listed.into_iter().zip(number_headings(&levels)).collect();

        let mut edits: Vec<(usize, String)> = Vec::new();
        if !entries.is_empty() {
            let anchor = headings
                .iter()
                .find(|h| h.level <= 2)
                .unwrap_or(&headings[0]);
            edits.push((anchor.tag_start, self.render_toc(&entries)));
        }
        for (heading, (id, synthesized)) in headings.iter().zip(&ids) {
            if *synthesized {
                edits.push((heading.attr_at, format!(r#" id="{}""#, escape_html(id))));
            }
        }
        edits.sort_by_key(|(pos, _)| *pos);

        tracing::debug!(
            headings = headings.len(),
            entries = entries.len(),
            "inserting table of contents"
        );

        let mut out = String::with_capacity(html.len() + edits.iter().map(|(_, s)| s.len()).sum::<usize>());
        let mut copied = 0;
        for (pos, insert) in &edits {
            out.push_str(&html[copied..*pos]);
            out.push_str(insert);
            copied = *pos;
        }
        out.push_str(&html[copied..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(ext: &TocExtension, html: &str) -> String {
        ext.postprocess(html.to_owned(), &mut RenderContext::default())
            .unwrap()
    }

    #[test]
    fn test_numbering() {
        assert_eq!(number_headings(&[1, 2, 2, 1, 2]), ["1", "1.1", "1.2", "2", "2.1"]);
    }

    #[test]
    fn test_numbering_starts_at_first_used_level() {
        assert_eq!(number_headings(&[2, 3, 2]), ["1", "1.1", "2"]);
        assert_eq!(number_headings(&[3, 2]), ["1", "1"]);
    }

    #[test]
    fn test_extract_strips_markup() {
        let html = r#"<h2 id="bold"><strong>Bold</strong> &amp; more</h2><p>x</p><h3 id="c">  C  </h3>"#;
        assert_eq!(
            extract_headings(html),
            vec![
                HeadingRecord {
                    level: 2,
                    text: "Bold & more".to_owned(),
                    id: "bold".to_owned(),
                },
                HeadingRecord {
                    level: 3,
                    text: "C".to_owned(),
                    id: "c".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn test_extract_skips_hidden_decorations() {
        let html = concat!(
            r#"<h1 id="a">Start <span aria-hidden="true"><svg><g><text>*</text></g></svg></span> end</h1>"#,
            r#"<h2 id="b">Next</h2>"#
        );
        let texts: Vec<String> = extract_headings(html)
            .into_iter()
            .map(|h| h.text)
            .collect();
        assert_eq!(texts, ["Start end", "Next"]);
    }

    #[test]
    fn test_missing_ids_are_synthesized_without_collisions() {
        let html = r#"<h1>A</h1><h2 id="heading-1">B</h2><h2>C</h2>"#;
        let ids: Vec<String> = extract_headings(html)
            .into_iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(ids, ["heading-0", "heading-1", "heading-2"]);

        let html = r#"<h1 id="heading-1">A</h1><h2>B</h2>"#;
        let ids: Vec<String> = extract_headings(html)
            .into_iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(ids, ["heading-1", "heading-1-1"]);
    }

    #[test]
    fn test_no_headings_returns_input_unchanged() {
        let html = "<p>plain &amp; simple</p>\n<br>";
        assert_eq!(run(&TocExtension::new(), html), html);
    }

    #[test]
    fn test_toc_inserted_before_first_top_level_heading() {
        let html = r#"<p>intro</p><h3 id="x">X</h3><h1 id="a">A</h1><h2 id="b">B</h2>"#;
        let out = run(&TocExtension::new().with_title("Index"), html);
        assert_eq!(
            out,
            concat!(
                r#"<p>intro</p><h3 id="x">X</h3>"#,
                r#"<section class="auto-toc"><p class="auto-toc-title">Index</p>"#,
                r#"<p class="auto-toc-item auto-toc-h3" style="padding-left:2em"><span class="toc-number">1</span> <span class="toc-text">X</span></p>"#,
                r#"<p class="auto-toc-item auto-toc-h1" style="padding-left:0em"><span class="toc-number">1</span> <span class="toc-text">A</span></p>"#,
                r#"<p class="auto-toc-item auto-toc-h2" style="padding-left:1em"><span class="toc-number">1.1</span> <span class="toc-text">B</span></p>"#,
                r#"</section><hr class="auto-toc-divider" />"#,
                r#"<h1 id="a">A</h1><h2 id="b">B</h2>"#
            )
        );
    }

    #[test]
    fn test_toc_falls_back_to_first_heading() {
        let html = r#"<p>a</p><h4 id="d">D</h4>"#;
        let out = run(&TocExtension::new(), html);
        assert!(out.starts_with(r#"<p>a</p><section class="auto-toc">"#));
        assert!(out.ends_with(r#"<hr class="auto-toc-divider" /><h4 id="d">D</h4>"#));
    }

    #[test]
    fn test_ids_written_back() {
        let out = run(&TocExtension::new().with_title(""), "<h1>A</h1><h2 class=\"k\">B</h2>");
        assert!(out.contains(r#"<h1 id="heading-0">A</h1>"#));
        assert!(out.contains(r#"<h2 class="k" id="heading-1">B</h2>"#));
        assert!(!out.contains("auto-toc-title"));
    }

    #[test]
    fn test_max_level_limits_entries() {
        let html = r#"<h1 id="a">A</h1><h2 id="b">B</h2><h3 id="c">C</h3>"#;
        let out = run(&TocExtension::new().with_max_level(2), html);
        assert!(out.contains(r#"<span class="toc-text">B</span>"#));
        assert!(!out.contains(r#"<span class="toc-text">C</span>"#));
    }

    #[test]
    fn test_entry_text_is_escaped() {
        let out = run(&TocExtension::new(), r#"<h1 id="a">1 &lt; 2</h1>"#);
        assert!(out.contains(r#"<span class="toc-text">1 &lt; 2</span>"#));
    }

    #[test]
    fn test_link_ordinals_stay_out_of_entries() {
        let html = r#"<h1 id="a">See <a href="https://rust-lang.org">Rust<sup>[1]</sup></a> now</h1><p>x<sup>2</sup></p>"#;
        let texts: Vec<String> = extract_headings(html).into_iter().map(|h| h.text).collect();
        assert_eq!(texts, ["See Rust now"]);
    }

    #[test]
    fn test_heading_superscript_outside_links_is_kept() {
        let texts: Vec<String> = extract_headings(r#"<h2 id="e">E = mc<sup>2</sup></h2>"#)
            .into_iter()
            .map(|h| h.text)
            .collect();
        assert_eq!(texts, ["E = mc2"]);
    }

    #[test]
    fn test_unterminated_comment_does_not_fail() {
        let html = "<h1>T</h1>\n<!-- draft\n";
        let out = run(&TocExtension::new(), html);
        assert!(out.starts_with(r#"<section class="auto-toc">"#));
        assert!(out.ends_with(r#"<h1 id="heading-0">T</h1>
<!-- draft
"#));
    }
}
