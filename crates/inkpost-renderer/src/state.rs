//! Bookkeeping the renderer carries between pulldown-cmark events.

use std::collections::HashSet;

use pulldown_cmark::{Alignment, LinkType};

use crate::util::slugify;

/// Fenced or indented code block being collected.
#[derive(Default)]
pub(crate) struct CodeBlockState {
    active: bool,
    language: Option<String>,
    buffer: String,
}

impl CodeBlockState {
    pub fn start(&mut self, language: Option<String>) {
        self.active = true;
        self.language = language;
        self.buffer.clear();
    }

    /// Finish the block, returning `(language, content)`.
    pub fn end(&mut self) -> (Option<String>, String) {
        self.active = false;
        (self.language.take(), std::mem::take(&mut self.buffer))
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }
}

/// Column alignment and header tracking for GFM tables.
#[derive(Default)]
pub(crate) struct TableState {
    in_head: bool,
    alignments: Vec<Alignment>,
    cell_index: usize,
}

impl TableState {
    pub fn start(&mut self, alignments: Vec<Alignment>) {
        self.alignments = alignments;
        self.in_head = false;
        self.cell_index = 0;
    }

    pub fn start_head(&mut self) {
        self.in_head = true;
        self.cell_index = 0;
    }

    pub fn end_head(&mut self) {
        self.in_head = false;
    }

    pub fn start_row(&mut self) {
        self.cell_index = 0;
    }

    pub fn next_cell(&mut self) {
        self.cell_index += 1;
    }

    pub fn cell_tag(&self) -> &'static str {
        if self.in_head { "th" } else { "td" }
    }

    /// Inline style for the current cell; the target platform strips
    /// `align` attributes but keeps `style`.
    pub fn current_alignment_style(&self) -> &'static str {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => r#" style="text-align:left""#,
            Some(Alignment::Center) => r#" style="text-align:center""#,
            Some(Alignment::Right) => r#" style="text-align:right""#,
            Some(Alignment::None) | None => "",
        }
    }
}

/// Image whose alt text is being collected.
pub(crate) struct PendingImage {
    pub src: String,
    pub title: String,
    pub alt: String,
}

/// Link whose inner HTML is being collected.
pub(crate) struct LinkCapture {
    pub link_type: LinkType,
    pub dest: String,
    pub title: String,
    pub html: String,
}

/// Paragraph currently open in the output.
///
/// A paragraph holding nothing but one display-mode token is emitted
/// without its `<p>` wrapper, since `<section>` may not nest in `<p>`.
pub(crate) struct ParagraphState {
    /// Byte offset of the `<p>` in the output buffer.
    pub start: usize,
    pub display_tokens: usize,
    pub other_content: bool,
}

impl ParagraphState {
    pub fn new(start: usize) -> Self {
        Self {
            start,
            display_tokens: 0,
            other_content: false,
        }
    }

    pub fn is_single_display(&self) -> bool {
        self.display_tokens == 1 && !self.other_content
    }
}

/// Heading being collected plus the ids handed out so far.
#[derive(Default)]
pub(crate) struct HeadingState {
    current_level: Option<u8>,
    text: String,
    html: String,
    used_ids: HashSet<String>,
    count: usize,
}

impl HeadingState {
    pub fn is_active(&self) -> bool {
        self.current_level.is_some()
    }

    pub fn start(&mut self, level: u8) {
        self.current_level = Some(level);
        self.text.clear();
        self.html.clear();
    }

    pub fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn push_html(&mut self, html: &str) {
        self.html.push_str(html);
    }

    /// Finish the heading, returning `(level, id, inner_html)`.
    pub fn complete(&mut self) -> Option<(u8, String, String)> {
        let level = self.current_level.take()?;
        let text = std::mem::take(&mut self.text);
        let html = std::mem::take(&mut self.html);
        let id = self.generate_id(&text);
        Some((level, id, html))
    }

    /// Slug of the heading text, made unique within the document.
    ///
    /// Headings without any sluggable characters fall back to
    /// `heading-{n}` where `n` is the heading's zero-based position.
    fn generate_id(&mut self, text: &str) -> String {
        let index = self.count;
        self.count += 1;

        let slug = slugify(text);
        let base = if slug.is_empty() {
            format!("heading-{index}")
        } else {
            slug
        };

        let mut id = base.clone();
        let mut suffix = 1;
        while self.used_ids.contains(&id) {
            id = format!("{base}-{suffix}");
            suffix += 1;
        }
        self.used_ids.insert(id.clone());
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading_id(state: &mut HeadingState, text: &str) -> String {
        state.start(2);
        state.push_text(text);
        state.complete().unwrap().1
    }

    #[test]
    fn test_heading_ids_are_unique() {
        let mut state = HeadingState::default();
        assert_eq!(heading_id(&mut state, "Setup"), "setup");
        assert_eq!(heading_id(&mut state, "Setup"), "setup-1");
        assert_eq!(heading_id(&mut state, "Setup 1"), "setup-1-1");
    }

    #[test]
    fn test_heading_id_fallback_uses_position() {
        let mut state = HeadingState::default();
        assert_eq!(heading_id(&mut state, "Intro"), "intro");
        assert_eq!(heading_id(&mut state, "???"), "heading-1");
    }

    #[test]
    fn test_complete_without_start() {
        let mut state = HeadingState::default();
        assert!(!state.is_active());
        assert!(state.complete().is_none());
    }

    #[test]
    fn test_table_alignment() {
        let mut state = TableState::default();
        state.start(vec![Alignment::None, Alignment::Center]);
        state.start_head();
        assert_eq!(state.cell_tag(), "th");
        assert_eq!(state.current_alignment_style(), "");
        state.next_cell();
        assert_eq!(
            state.current_alignment_style(),
            r#" style="text-align:center""#
        );
        state.end_head();
        state.start_row();
        assert_eq!(state.cell_tag(), "td");
    }

    #[test]
    fn test_paragraph_single_display() {
        let mut para = ParagraphState::new(0);
        assert!(!para.is_single_display());
        para.display_tokens = 1;
        assert!(para.is_single_display());
        para.other_content = true;
        assert!(!para.is_single_display());
    }
}
