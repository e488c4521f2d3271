//! Extensible Markdown-to-HTML pipeline for publishing platforms.
//!
//! A [`Pipeline`] runs a document through the base renderer and an ordered
//! chain of [`Extension`]s:
//!
//! 1. YAML front matter is split off ([`split_front_matter`]).
//! 2. Every extension's `prepare` hook resets its per-document state.
//! 3. [`MarkdownRenderer`] turns pulldown-cmark events into HTML through a
//!    [`RenderBackend`], scanning paragraph text with the extensions'
//!    [`InlineRule`]s and letting them override link and image markup.
//! 4. Every extension's `postprocess` hook rewrites the whole document.
//!
//! Built-in extensions: [`MathExtension`], [`TocExtension`],
//! [`LinksExtension`], [`ImageExtension`] and [`IconizeExtension`].
//!
//! # Example
//!
//! ```
//! use inkpost_renderer::{Pipeline, TocExtension};
//!
//! let pipeline = Pipeline::new().with_extension(TocExtension::new());
//! let html = pipeline.render("# Hello\n\n**Bold** text").unwrap();
//! assert!(html.starts_with(r#"<section class="auto-toc">"#));
//! assert!(html.contains(r#"<h1 id="hello">Hello</h1>"#));
//! ```

mod backend;
mod context;
mod extension;
pub mod extensions;
mod frontmatter;
mod html;
mod markup;
mod pipeline;
mod renderer;
mod state;
mod util;

pub use backend::RenderBackend;
pub use context::RenderContext;
pub use extension::{Extension, ExtensionError, ImageSpan, InlineRule, LinkSpan, Token};
pub use extensions::{
    AssetResolver, HeadingRecord, IconProvider, IconizeExtension, ImageExtension, LinkRegistry,
    LinksExtension, MathExtension, MathTypesetter, TocExtension, extract_headings,
    is_passthrough_url, number_headings,
};
pub use frontmatter::{DocumentMeta, FrontMatter, split_front_matter};
pub use html::HtmlBackend;
pub use pipeline::{Pipeline, PipelineError, RenderOutput};
pub use renderer::MarkdownRenderer;
pub use util::{escape_html, is_escaped, slugify};
