//! Markdown renderer with pluggable backend and extension hooks.

use std::fmt::Write;
use std::marker::PhantomData;

use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag, TagEnd};

use crate::backend::RenderBackend;
use crate::context::RenderContext;
use crate::extension::{Extension, ImageSpan, InlineRule, LinkSpan, Token};
use crate::state::{
    CodeBlockState, HeadingState, LinkCapture, ParagraphState, PendingImage, TableState,
};
use crate::util::{escape_html, heading_level_to_num, is_escaped, step_len, unescape_markdown};

/// Markdown renderer driven by pulldown-cmark events.
///
/// Structure (lists, tables, inline formatting) is handled here; element
/// spelling is delegated to the [`RenderBackend`]. Consecutive text and
/// soft breaks inside a block are buffered and scanned with the inline
/// rules of every extension before being written out.
///
/// A renderer is single-use: create one per document.
pub struct MarkdownRenderer<'e, B: RenderBackend> {
    extensions: &'e [Box<dyn Extension>],
    rules: Vec<&'e dyn InlineRule>,
    output: String,
    code: CodeBlockState,
    table: TableState,
    heading: HeadingState,
    image: Option<PendingImage>,
    nested_images: usize,
    links: Vec<LinkCapture>,
    paragraph: Option<ParagraphState>,
    pending_text: String,
    gfm: bool,
    _backend: PhantomData<B>,
}

impl<'e, B: RenderBackend> MarkdownRenderer<'e, B> {
    /// Create a renderer using the given extensions' rules and overrides.
    #[must_use]
    pub fn new(extensions: &'e [Box<dyn Extension>]) -> Self {
        let rules = extensions
            .iter()
            .flat_map(|ext| ext.inline_rules().iter().map(|rule| &**rule))
            .collect();
        Self {
            extensions,
            rules,
            output: String::with_capacity(4096),
            code: CodeBlockState::default(),
            table: TableState::default(),
            heading: HeadingState::default(),
            image: None,
            nested_images: 0,
            links: Vec::new(),
            paragraph: None,
            pending_text: String::new(),
            gfm: true,
            _backend: PhantomData,
        }
    }

    /// Enable or disable GitHub Flavored Markdown (tables, strikethrough,
    /// task lists). Enabled by default.
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    #[must_use]
    pub fn parser_options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }

    /// Render `markdown` to HTML.
    pub fn render(mut self, markdown: &str, ctx: &mut RenderContext) -> String {
        let parser = Parser::new_ext(markdown, self.parser_options());
        for (event, range) in parser.into_offset_iter() {
            self.process_event(event, markdown, range.start, ctx);
        }
        self.flush_text(ctx);
        self.output
    }

    fn process_event(
        &mut self,
        event: Event<'_>,
        source: &str,
        offset: usize,
        ctx: &mut RenderContext,
    ) {
        match event {
            Event::Text(text) => self.text(&text, source, offset),
            Event::SoftBreak => self.soft_break(),
            other => {
                self.flush_text(ctx);
                match other {
                    Event::Start(tag) => self.start_tag(tag),
                    Event::End(tag) => self.end_tag(tag, ctx),
                    Event::Code(code) => self.inline_code(&code),
                    Event::Html(html) => self.output.push_str(&html),
                    Event::InlineHtml(html) => {
                        self.mark_inline_content();
                        self.push_inline(&html);
                    }
                    Event::HardBreak => {
                        self.mark_inline_content();
                        let mut br = String::new();
                        B::hard_break(&mut br);
                        self.push_inline(&br);
                    }
                    Event::Rule => B::horizontal_rule(&mut self.output),
                    Event::TaskListMarker(checked) => {
                        B::task_list_marker(checked, &mut self.output);
                    }
                    Event::Text(_)
                    | Event::SoftBreak
                    | Event::FootnoteReference(_)
                    | Event::InlineMath(_)
                    | Event::DisplayMath(_) => {}
                }
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn start_tag(&mut self, tag: Tag<'_>) {
        if self.image.is_some() {
            // Only plain text survives inside alt text.
            if matches!(tag, Tag::Image { .. }) {
                self.nested_images += 1;
            }
            return;
        }

        match tag {
            Tag::Paragraph => {
                self.paragraph = Some(ParagraphState::new(self.output.len()));
                self.output.push_str("<p>");
            }
            Tag::Heading { level, .. } => {
                self.heading.start(heading_level_to_num(level));
            }
            Tag::BlockQuote(_) => B::blockquote_start(&mut self.output),
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().map(str::to_owned)
                    }
                    CodeBlockKind::Indented => None,
                };
                self.code.start(lang);
            }
            Tag::List(start) => match start {
                Some(1) => self.output.push_str("<ol>"),
                Some(n) => write!(self.output, r#"<ol start="{n}">"#).unwrap(),
                None => self.output.push_str("<ul>"),
            },
            Tag::Item => self.output.push_str("<li>"),
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock | Tag::MetadataBlock(_) => {}
            Tag::DefinitionList => self.output.push_str("<dl>"),
            Tag::DefinitionListTitle => self.output.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.output.push_str("<dd>"),
            Tag::Table(alignments) => {
                self.table.start(alignments);
                self.output.push_str("<table>");
            }
            Tag::TableHead => {
                self.table.start_head();
                self.output.push_str("<thead><tr>");
            }
            Tag::TableRow => {
                self.table.start_row();
                self.output.push_str("<tr>");
            }
            Tag::TableCell => {
                let tag = self.table.cell_tag();
                let align = self.table.current_alignment_style();
                write!(self.output, "<{tag}{align}>").unwrap();
            }
            Tag::Emphasis => self.open_inline("<em>"),
            Tag::Strong => self.open_inline("<strong>"),
            Tag::Strikethrough => self.open_inline("<s>"),
            Tag::Superscript => self.open_inline("<sup>"),
            Tag::Subscript => self.open_inline("<sub>"),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                self.mark_inline_content();
                self.links.push(LinkCapture {
                    link_type,
                    dest: dest_url.into_string(),
                    title: title.into_string(),
                    html: String::new(),
                });
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.mark_inline_content();
                self.image = Some(PendingImage {
                    src: dest_url.into_string(),
                    title: title.into_string(),
                    alt: String::new(),
                });
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn end_tag(&mut self, tag: TagEnd, ctx: &mut RenderContext) {
        if self.image.is_some() {
            if tag == TagEnd::Image {
                if self.nested_images > 0 {
                    self.nested_images -= 1;
                } else {
                    self.finish_image(ctx);
                }
            }
            return;
        }

        match tag {
            TagEnd::Paragraph => match self.paragraph.take() {
                Some(para) if para.is_single_display() => {
                    self.output.replace_range(para.start..para.start + "<p>".len(), "");
                }
                _ => self.output.push_str("</p>"),
            },
            TagEnd::Heading(_) => {
                if let Some((level, id, html)) = self.heading.complete() {
                    write!(
                        self.output,
                        r#"<h{level} id="{}">{}</h{level}>"#,
                        escape_html(&id),
                        html.trim()
                    )
                    .unwrap();
                }
            }
            TagEnd::BlockQuote(_) => B::blockquote_end(&mut self.output),
            TagEnd::CodeBlock => {
                let (lang, content) = self.code.end();
                B::code_block(lang.as_deref(), &content, &mut self.output);
            }
            TagEnd::List(ordered) => {
                self.output.push_str(if ordered { "</ol>" } else { "</ul>" });
            }
            TagEnd::Item => self.output.push_str("</li>"),
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => {}
            TagEnd::DefinitionList => self.output.push_str("</dl>"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>"),
            TagEnd::DefinitionListDefinition => self.output.push_str("</dd>"),
            TagEnd::Table => self.output.push_str("</tbody></table>"),
            TagEnd::TableHead => {
                self.output.push_str("</tr></thead><tbody>");
                self.table.end_head();
            }
            TagEnd::TableRow => self.output.push_str("</tr>"),
            TagEnd::TableCell => {
                write!(self.output, "</{}>", self.table.cell_tag()).unwrap();
                self.table.next_cell();
            }
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</s>"),
            TagEnd::Superscript => self.push_inline("</sup>"),
            TagEnd::Subscript => self.push_inline("</sub>"),
            TagEnd::Link => self.finish_link(ctx),
            TagEnd::Image => {}
        }
    }

    fn text(&mut self, text: &str, source: &str, offset: usize) {
        if self.code.is_active() {
            self.code.push_str(text);
        } else if let Some(image) = &mut self.image {
            image.alt.push_str(text);
        } else {
            // pulldown-cmark drops the backslash of an escape; put it back
            // so inline rules can tell `\$` from `$`.
            if text.starts_with(|c: char| c.is_ascii_punctuation())
                && offset <= source.len()
                && is_escaped(source, offset)
            {
                self.pending_text.push('\\');
            }
            self.pending_text.push_str(text);
        }
    }

    fn soft_break(&mut self) {
        if self.code.is_active() {
            self.code.push_str("\n");
        } else if let Some(image) = &mut self.image {
            image.alt.push(' ');
        } else {
            self.pending_text.push('\n');
        }
    }

    fn inline_code(&mut self, code: &str) {
        if let Some(image) = &mut self.image {
            image.alt.push_str(code);
            return;
        }
        self.mark_inline_content();
        if self.heading.is_active() {
            self.heading.push_text(code);
        }
        self.push_inline(&format!("<code>{}</code>", escape_html(code)));
    }

    fn open_inline(&mut self, html: &str) {
        self.mark_inline_content();
        self.push_inline(html);
    }

    /// Route inline HTML to the innermost open link, heading, or the output.
    fn push_inline(&mut self, content: &str) {
        if let Some(link) = self.links.last_mut() {
            link.html.push_str(content);
        } else if self.heading.is_active() {
            self.heading.push_html(content);
        } else {
            self.output.push_str(content);
        }
    }

    fn mark_inline_content(&mut self) {
        if let Some(para) = &mut self.paragraph {
            para.other_content = true;
        }
    }

    /// Scan buffered text with the inline rules and write it out.
    fn flush_text(&mut self, ctx: &mut RenderContext) {
        if self.pending_text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending_text);
        let mut literal = String::new();
        let mut pos = 0;

        while pos < text.len() {
            let rest = &text[pos..];
            let Some(start) = self.next_rule_start(rest) else {
                literal.push_str(rest);
                break;
            };
            literal.push_str(&rest[..start]);
            pos += start;

            let rest = &text[pos..];
            if let Some((token, html)) = self.apply_rules(rest, ctx) {
                self.emit_literal(&std::mem::take(&mut literal));
                self.emit_token(&token, &html);
                pos += token.raw.len();
            } else {
                let step = step_len(rest);
                literal.push_str(&rest[..step]);
                pos += step;
            }
        }

        self.emit_literal(&literal);
    }

    fn next_rule_start(&self, src: &str) -> Option<usize> {
        self.rules
            .iter()
            .filter_map(|rule| rule.start(src))
            .filter(|&start| src.is_char_boundary(start))
            .min()
    }

    /// Try every rule at the start of `src`; earliest-registered match wins.
    fn apply_rules(&self, src: &str, ctx: &mut RenderContext) -> Option<(Token, String)> {
        for rule in &self.rules {
            let token = match rule.tokenize(src) {
                Ok(Some(token)) if !token.raw.is_empty() && src.starts_with(&token.raw) => token,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(rule = rule.name(), error = %e, "inline rule failed to tokenize");
                    continue;
                }
            };
            match rule.render(&token, ctx) {
                Ok(html) => return Some((token, html)),
                Err(e) => {
                    tracing::warn!(
                        rule = rule.name(),
                        error = %e,
                        "inline rule failed to render, keeping source text"
                    );
                    ctx.warn(format!("{}: {e} (`{}`)", rule.name(), token.raw));
                }
            }
        }
        None
    }

    fn emit_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let text = unescape_markdown(text);
        if !text.trim().is_empty() {
            self.mark_inline_content();
        }
        if self.heading.is_active() {
            self.heading.push_text(&text);
        }
        self.push_inline(&escape_html(&text));
    }

    fn emit_token(&mut self, token: &Token, html: &str) {
        let top_level = self.links.is_empty() && !self.heading.is_active();
        if self.heading.is_active() {
            self.heading.push_text(&token.text);
        }
        if let Some(para) = &mut self.paragraph {
            if token.display && top_level {
                para.display_tokens += 1;
            } else {
                para.other_content = true;
            }
        }
        self.push_inline(html);
    }

    fn finish_link(&mut self, ctx: &mut RenderContext) {
        let Some(capture) = self.links.pop() else {
            return;
        };
        let dest = if capture.link_type == LinkType::Email {
            format!("mailto:{}", capture.dest)
        } else {
            capture.dest
        };
        let span = LinkSpan {
            dest: &dest,
            title: &capture.title,
            inner_html: &capture.html,
        };

        let html = self
            .extensions
            .iter()
            .find_map(|ext| ext.render_link(&span, ctx))
            .unwrap_or_else(|| {
                let mut out = String::new();
                B::link(span.dest, span.title, span.inner_html, &mut out);
                out
            });
        self.push_inline(&html);
    }

    fn finish_image(&mut self, ctx: &mut RenderContext) {
        let Some(image) = self.image.take() else {
            return;
        };
        let span = ImageSpan {
            src: &image.src,
            alt: image.alt.trim(),
            title: &image.title,
        };

        let html = self
            .extensions
            .iter()
            .find_map(|ext| ext.render_image(&span, ctx))
            .unwrap_or_else(|| {
                let mut out = String::new();
                B::image(span.src, span.alt, span.title, &mut out);
                out
            });
        self.push_inline(&html);
    }
}
