//! External links as numbered footnotes.
//!
//! Readers on the target platform cannot follow links, so every `http(s)`
//! link gets a `[n]` marker and its URL is listed at the end of the
//! document.

use std::fmt::Write;

use crate::context::RenderContext;
use crate::extension::{Extension, ExtensionError, LinkSpan};
use crate::util::escape_html;

/// Distinct external targets in first-seen order.
#[derive(Debug, Default)]
pub struct LinkRegistry {
    targets: Vec<String>,
}

impl LinkRegistry {
    /// 1-based ordinal of `target`, registering it if new.
    pub fn ordinal(&mut self, target: &str) -> usize {
        if let Some(pos) = self.targets.iter().position(|t| t == target) {
            return pos + 1;
        }
        self.targets.push(target.to_owned());
        self.targets.len()
    }

    #[must_use]
    pub fn targets(&self) -> &[String] {
        &self.targets
    }
}

fn is_external(dest: &str) -> bool {
    dest.starts_with("http://") || dest.starts_with("https://")
}

pub struct LinksExtension;

impl Extension for LinksExtension {
    fn name(&self) -> &'static str {
        "links"
    }

    fn prepare(&self, ctx: &mut RenderContext) {
        ctx.reset::<LinkRegistry>();
    }

    fn render_link(&self, link: &LinkSpan<'_>, ctx: &mut RenderContext) -> Option<String> {
        if !is_external(link.dest) {
            return None;
        }
        let n = ctx.state_mut::<LinkRegistry>().ordinal(link.dest);
        let mut out = format!(r#"<a href="{}""#, escape_html(link.dest));
        if !link.title.is_empty() {
            write!(out, r#" title="{}""#, escape_html(link.title)).unwrap();
        }
        write!(out, ">{}<sup>[{n}]</sup></a>", link.inner_html).unwrap();
        Some(out)
    }

    fn postprocess(&self, mut html: String, ctx: &mut RenderContext) -> Result<String, ExtensionError> {
        let Some(registry) = ctx.state::<LinkRegistry>() else {
            return Ok(html);
        };
        if registry.targets.is_empty() {
            return Ok(html);
        }
        tracing::debug!(count = registry.targets.len(), "appending link footnotes");
        html.push_str(r#"<section class="foot-links"><hr class="foot-links-separator" /><ol>"#);
        for target in &registry.targets {
            write!(html, "<li>{}&nbsp;\u{21a9}</li>", escape_html(target)).unwrap();
        }
        html.push_str("</ol></section>");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HtmlBackend, MarkdownRenderer};
    use pretty_assertions::assert_eq;

    fn render(markdown: &str) -> (String, RenderContext) {
        let extensions: Vec<Box<dyn Extension>> = vec![Box::new(LinksExtension)];
        let mut ctx = RenderContext::default();
        extensions[0].prepare(&mut ctx);
        let html = MarkdownRenderer::<HtmlBackend>::new(&extensions).render(markdown, &mut ctx);
        (html, ctx)
    }

    #[test]
    fn test_external_links_get_ordinals() {
        let (html, ctx) = render("[a](https://a.io) [b](http://b.io \"B\") [a again](https://a.io)");
        assert_eq!(
            html,
            concat!(
                r#"<p><a href="https://a.io">a<sup>[1]</sup></a> "#,
                r#"<a href="http://b.io" title="B">b<sup>[2]</sup></a> "#,
                r#"<a href="https://a.io">a again<sup>[1]</sup></a></p>"#
            )
        );
        assert_eq!(
            ctx.state::<LinkRegistry>().unwrap().targets(),
            ["https://a.io", "http://b.io"]
        );
    }

    #[test]
    fn test_other_links_are_not_registered() {
        let (html, ctx) = render("[local](./doc.md) [mail](mailto:x@y.z) [ftp](ftp://f.io)");
        assert!(!html.contains("<sup>"));
        assert!(ctx.state::<LinkRegistry>().unwrap().targets().is_empty());
    }

    #[test]
    fn test_footnote_section_lists_each_target_once() {
        let (html, mut ctx) = render("[x](https://x.io) and [y](https://x.io)");
        let out = LinksExtension.postprocess(html, &mut ctx).unwrap();
        assert!(out.ends_with(concat!(
            r#"<section class="foot-links"><hr class="foot-links-separator" /><ol>"#,
            "<li>https://x.io&nbsp;\u{21a9}</li></ol></section>"
        )));
        assert_eq!(out.matches("<li>").count(), 1);
    }

    #[test]
    fn test_postprocess_is_repeatable() {
        let (html, mut ctx) = render("[x](https://x.io)");
        let first = LinksExtension.postprocess(html.clone(), &mut ctx).unwrap();
        let second = LinksExtension.postprocess(html, &mut ctx).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.matches("foot-links\"").count(), 1);
    }

    #[test]
    fn test_prepare_clears_registry() {
        let (_, mut ctx) = render("[x](https://x.io)");
        LinksExtension.prepare(&mut ctx);
        assert!(ctx.state::<LinkRegistry>().unwrap().targets().is_empty());
        let out = LinksExtension.postprocess("<p>x</p>".to_owned(), &mut ctx).unwrap();
        assert_eq!(out, "<p>x</p>");
    }
}
