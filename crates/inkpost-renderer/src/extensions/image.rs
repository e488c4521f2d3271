//! Image source resolution and captions.

use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

use crate::context::RenderContext;
use crate::extension::{Extension, ExtensionError, ImageSpan};
use crate::markup::{self, Node};
use crate::util::escape_html;

/// Maps an image path written in a document to the URL to publish.
///
/// Implementations fail open: an unresolvable path is returned unchanged.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, path: &str, document: Option<&Path>) -> String;
}

/// Whether `src` is already a URL the platform can load.
#[must_use]
pub fn is_passthrough_url(src: &str) -> bool {
    ["http://", "https://", "data:", "app://"]
        .iter()
        .any(|prefix| src.starts_with(prefix))
}

/// Resolves image sources and wraps images in captioned figures.
pub struct ImageExtension {
    resolver: Option<Arc<dyn AssetResolver>>,
    captions: bool,
}

impl ImageExtension {
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolver: None,
            captions: true,
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn AssetResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_captions(mut self, captions: bool) -> Self {
        self.captions = captions;
        self
    }
}

impl Default for ImageExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl Extension for ImageExtension {
    fn name(&self) -> &'static str {
        "image"
    }

    fn render_image(&self, image: &ImageSpan<'_>, ctx: &mut RenderContext) -> Option<String> {
        let src = match &self.resolver {
            Some(resolver) if !is_passthrough_url(image.src) => {
                resolver.resolve(image.src, ctx.source_path())
            }
            _ => image.src.to_owned(),
        };
        let mut out = format!(
            r#"<img src="{}" alt="{}""#,
            escape_html(&src),
            escape_html(image.alt)
        );
        if !image.title.is_empty() {
            write!(out, r#" title="{}""#, escape_html(image.title)).unwrap();
        }
        out.push_str(" />");
        Some(out)
    }

    fn postprocess(&self, html: String, _ctx: &mut RenderContext) -> Result<String, ExtensionError> {
        if !self.captions || !html.contains("<img") {
            return Ok(html);
        }

        let mut figure_depth = 0_usize;
        let mut edits = Vec::new();
        for node in markup::scan(&html) {
            match node {
                Node::Open(tag) if tag.name == "figure" && !tag.self_closing => figure_depth += 1,
                Node::Close { name, .. } if name == "figure" => {
                    figure_depth = figure_depth.saturating_sub(1);
                }
                Node::Open(tag) if tag.name == "img" && figure_depth == 0 => {
                    let caption = tag
                        .attr("title")
                        .filter(|t| !t.is_empty())
                        .or_else(|| tag.attr("alt"))
                        .unwrap_or_default()
                        .trim()
                        .to_owned();
                    edits.push((tag.range, caption));
                }
                _ => {}
            }
        }
        if edits.is_empty() {
            return Ok(html);
        }
        tracing::debug!(images = edits.len(), "wrapping images in figures");

        let mut out = String::with_capacity(html.len() + edits.len() * 96);
        let mut copied = 0;
        for (range, caption) in edits {
            out.push_str(&html[copied..range.start]);
            out.push_str(r#"<figure class="image-with-caption">"#);
            out.push_str(&html[range.clone()]);
            if !caption.is_empty() {
                write!(
                    out,
                    r#"<figcaption class="image-caption">{}</figcaption>"#,
                    escape_html(&caption)
                )
                .unwrap();
            }
            out.push_str("</figure>");
            copied = range.end;
        }
        out.push_str(&html[copied..]);
        Ok(out)
    }
}
