//! Extension contract.
//!
//! An [`Extension`] contributes any mix of:
//!
//! - inline grammar rules ([`InlineRule`]) scanned over runs of paragraph text
//! - overrides for how links and images are rendered
//! - a `prepare` hook run before parsing and a `postprocess` hook that
//!   rewrites the whole rendered document
//!
//! Extensions never talk to each other directly. The only thing passed
//! from one `postprocess` to the next is the HTML string.

use crate::context::RenderContext;

/// Error raised by an extension hook or rule.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    /// A rule or hook rejected its input.
    #[error("{0}")]
    Invalid(String),
    /// A math typesetting collaborator failed.
    #[error("typesetting failed: {0}")]
    Typeset(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Construct recognised by an [`InlineRule`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Rule-specific kind tag (e.g. `"inline-math"`).
    pub kind: &'static str,
    /// Exact source text consumed, delimiters included.
    pub raw: String,
    /// Payload between the delimiters.
    pub text: String,
    /// Whether the token renders as a block inside the paragraph.
    pub display: bool,
}

/// A custom inline construct.
///
/// The renderer calls [`start`](Self::start) on the remaining text to find
/// where the construct might begin, then [`tokenize`](Self::tokenize) with
/// the text from that position. A tokenize or render error is logged and
/// treated as "no match", leaving the source text literal.
///
/// Text handed to rules keeps Markdown backslash escapes (`\$` stays two
/// characters); rules should not start a construct on an escaped
/// delimiter. See [`is_escaped`](crate::is_escaped).
pub trait InlineRule: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &'static str;

    /// Byte offset of the first position in `src` where this rule could
    /// match, if any.
    fn start(&self, src: &str) -> Option<usize>;

    /// Match at the very beginning of `src`.
    fn tokenize(&self, src: &str) -> Result<Option<Token>, ExtensionError>;

    /// HTML for a token this rule produced.
    fn render(&self, token: &Token, ctx: &mut RenderContext) -> Result<String, ExtensionError>;
}

/// Link about to be rendered.
#[derive(Debug)]
pub struct LinkSpan<'a> {
    pub dest: &'a str,
    pub title: &'a str,
    /// Already-rendered link text.
    pub inner_html: &'a str,
}

/// Image about to be rendered.
#[derive(Debug)]
pub struct ImageSpan<'a> {
    pub src: &'a str,
    pub alt: &'a str,
    pub title: &'a str,
}

/// A named unit of rendering behavior.
///
/// Implementations must be immutable after construction. Per-document state
/// belongs in the [`RenderContext`], reset from [`prepare`](Self::prepare).
pub trait Extension: Send + Sync {
    /// Stable identifier used in logs and errors.
    fn name(&self) -> &'static str;

    /// Reset per-document state. Called once per render before parsing.
    fn prepare(&self, _ctx: &mut RenderContext) {}

    /// Inline rules, tried in the order returned.
    fn inline_rules(&self) -> &[Box<dyn InlineRule>] {
        &[]
    }

    /// Replace the default link markup. The first extension returning
    /// `Some` wins.
    fn render_link(&self, _link: &LinkSpan<'_>, _ctx: &mut RenderContext) -> Option<String> {
        None
    }

    /// Replace the default image markup. The first extension returning
    /// `Some` wins.
    fn render_image(&self, _image: &ImageSpan<'_>, _ctx: &mut RenderContext) -> Option<String> {
        None
    }

    /// Rewrite the rendered document.
    fn postprocess(&self, html: String, _ctx: &mut RenderContext) -> Result<String, ExtensionError> {
        Ok(html)
    }
}
