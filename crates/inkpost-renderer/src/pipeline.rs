//! Pipeline driver: front matter, prepare, parse, postprocess.

use std::path::Path;

use crate::context::RenderContext;
use crate::extension::{Extension, ExtensionError};
use crate::frontmatter::{DocumentMeta, split_front_matter};
use crate::html::HtmlBackend;
use crate::renderer::MarkdownRenderer;

/// Error that aborts rendering of a document.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("extension `{extension}` failed to postprocess: {source}")]
    Postprocess {
        extension: &'static str,
        #[source]
        source: ExtensionError,
    },
}

/// Result of rendering one document.
#[derive(Debug)]
pub struct RenderOutput {
    pub html: String,
    pub meta: DocumentMeta,
    /// Non-fatal problems: rules that fell back to literal text, invalid
    /// front matter.
    pub warnings: Vec<String>,
}

/// An ordered chain of extensions over the base Markdown renderer.
///
/// A pipeline holds no per-document state and can render many documents
/// concurrently through a shared reference.
///
/// ```
/// use inkpost_renderer::{LinksExtension, Pipeline};
///
/// let pipeline = Pipeline::new().with_extension(LinksExtension);
/// let html = pipeline.render("[docs](https://example.com)").unwrap();
/// assert!(html.contains("<sup>[1]</sup>"));
/// assert!(html.contains(r#"<section class="foot-links">"#));
/// ```
pub struct Pipeline {
    extensions: Vec<Box<dyn Extension>>,
    gfm: bool,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            extensions: Vec::new(),
            gfm: true,
        }
    }

    /// Append an extension. Hooks run in registration order.
    #[must_use]
    pub fn with_extension<E: Extension + 'static>(mut self, extension: E) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Names of the registered extensions, in order.
    #[must_use]
    pub fn extension_names(&self) -> Vec<&'static str> {
        self.extensions.iter().map(|ext| ext.name()).collect()
    }

    /// Render `document` to HTML.
    ///
    /// # Errors
    ///
    /// Returns an error if a postprocess stage fails.
    pub fn render(&self, document: &str) -> Result<String, PipelineError> {
        Ok(self.render_document(document, None)?.html)
    }

    /// Render `document`, returning its metadata and warnings as well.
    ///
    /// `source_path` is made available to extensions (for resolving
    /// relative assets).
    ///
    /// # Errors
    ///
    /// Returns an error if a postprocess stage fails. No partial HTML is
    /// returned in that case.
    pub fn render_document(
        &self,
        document: &str,
        source_path: Option<&Path>,
    ) -> Result<RenderOutput, PipelineError> {
        let front = split_front_matter(document);
        let mut ctx = RenderContext::new(source_path.map(Path::to_path_buf));
        if let Some(error) = front.error {
            ctx.warn(error);
        }

        for ext in &self.extensions {
            ext.prepare(&mut ctx);
        }

        let mut html = MarkdownRenderer::<HtmlBackend>::new(&self.extensions)
            .with_gfm(self.gfm)
            .render(front.body, &mut ctx);
        tracing::debug!(bytes = html.len(), "parsed markdown");

        for ext in &self.extensions {
            html = ext
                .postprocess(html, &mut ctx)
                .map_err(|source| PipelineError::Postprocess {
                    extension: ext.name(),
                    source,
                })?;
            tracing::debug!(extension = ext.name(), bytes = html.len(), "postprocessed");
        }

        Ok(RenderOutput {
            html,
            meta: front.meta,
            warnings: ctx.take_warnings(),
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::extensions::{
        ImageExtension, LinksExtension, MathExtension, MathTypesetter, TocExtension,
    };
    use pretty_assertions::assert_eq;

    struct Tex;

    impl MathTypesetter for Tex {
        fn typeset(&self, source: &str, _display: bool) -> Result<String, ExtensionError> {
            Ok(format!("<svg>{source}</svg>"))
        }
    }

    struct Failing;

    impl Extension for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn postprocess(&self, _html: String, _ctx: &mut RenderContext) -> Result<String, ExtensionError> {
            Err(ExtensionError::Invalid("broken stage".to_owned()))
        }
    }

    /// Records the HTML it receives so ordering can be checked.
    struct Marker(&'static str);

    impl Extension for Marker {
        fn name(&self) -> &'static str {
            self.0
        }

        fn postprocess(&self, mut html: String, _ctx: &mut RenderContext) -> Result<String, ExtensionError> {
            html.push_str(self.0);
            Ok(html)
        }
    }

    #[test]
    fn test_postprocess_runs_in_registration_order() {
        let pipeline = Pipeline::new()
            .with_extension(Marker("[a]"))
            .with_extension(Marker("[b]"));
        assert_eq!(pipeline.extension_names(), ["[a]", "[b]"]);
        assert_eq!(pipeline.render("x").unwrap(), "<p>x</p>[a][b]");
    }

    #[test]
    fn test_postprocess_failure_aborts() {
        let pipeline = Pipeline::new().with_extension(Failing);
        let err = pipeline.render("# Title").unwrap_err();
        let PipelineError::Postprocess { extension, .. } = &err;
        assert_eq!(*extension, "failing");
        assert!(err.to_string().contains("broken stage"));
    }

    #[test]
    fn test_front_matter_is_split() {
        let out = Pipeline::new()
            .render_document("---\ntitle: Hi\n---\nbody", None)
            .unwrap();
        assert_eq!(out.html, "<p>body</p>");
        assert_eq!(out.meta.title.as_deref(), Some("Hi"));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_invalid_front_matter_is_a_warning() {
        let out = Pipeline::new()
            .render_document("---\n: [\n---\nbody", None)
            .unwrap();
        assert_eq!(out.html, "<p>body</p>");
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_toc_text_drops_markup_body_keeps_it() {
        let pipeline = Pipeline::new().with_extension(TocExtension::new());
        let html = pipeline.render("## **Bold**").unwrap();
        assert!(html.contains(r#"<span class="toc-text">Bold</span>"#));
        assert!(html.ends_with(r#"<h2 id="bold"><strong>Bold</strong></h2>"#));
    }

    #[test]
    fn test_all_stages_together() {
        let pipeline = Pipeline::new()
            .with_extension(MathExtension::new(Arc::new(Tex)))
            .with_extension(LinksExtension)
            .with_extension(TocExtension::new());
        let html = pipeline
            .render("# Intro\n\nSee [site](https://x.io) and $e$.\n\n$$\nx^2\n$$")
            .unwrap();
        assert_eq!(
            html,
            concat!(
                r#"<section class="auto-toc"><p class="auto-toc-title">Contents</p>"#,
                r#"<p class="auto-toc-item auto-toc-h1" style="padding-left:0em"><span class="toc-number">1</span> <span class="toc-text">Intro</span></p>"#,
                r#"</section><hr class="auto-toc-divider" />"#,
                r#"<h1 id="intro">Intro</h1>"#,
                r#"<p>See <a href="https://x.io">site<sup>[1]</sup></a> and <span class="inline-math"><svg>e</svg></span>.</p>"#,
                r#"<section class="block-math"><svg>x^2</svg></section>"#,
                r#"<section class="foot-links"><hr class="foot-links-separator" /><ol><li>https://x.io&nbsp;"#,
                "\u{21a9}</li></ol></section>"
            )
        );
    }

    #[test]
    fn test_unclosed_raw_comment_still_renders() {
        let pipeline = Pipeline::new()
            .with_extension(LinksExtension)
            .with_extension(ImageExtension::new())
            .with_extension(TocExtension::new());
        let html = pipeline
            .render("# T\n\n![pic](a.png)\n\n<!-- draft\n")
            .unwrap();
        assert!(html.starts_with(r#"<section class="auto-toc">"#));
        assert!(html.contains(r#"<span class="toc-text">T</span>"#));
        assert!(html.contains(r#"<figure class="image-with-caption"><img src="a.png" alt="pic" />"#));
        assert!(html.contains("<!-- draft"));
    }

    #[test]
    fn test_concurrent_renders_do_not_share_state() {
        let pipeline = Pipeline::new().with_extension(LinksExtension);
        let pipeline = &pipeline;
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    scope.spawn(move || {
                        let doc = format!("[a](https://{i}.io) [b](https://{i}.io/b)");
                        pipeline.render(&doc).unwrap()
                    })
                })
                .collect();
            for (i, handle) in handles.into_iter().enumerate() {
                let html = handle.join().unwrap();
                assert!(html.contains(&format!(r#"<a href="https://{i}.io">a<sup>[1]</sup></a>"#)));
                assert!(html.contains(&format!(r#"<a href="https://{i}.io/b">b<sup>[2]</sup></a>"#)));
                assert_eq!(html.matches("<li>").count(), 2);
            }
        });
    }
}
