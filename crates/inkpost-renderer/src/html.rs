//! HTML backend.
//!
//! Void elements are written self-closed (`<br />`, `<img ... />`) so the
//! rendered document stays well-formed enough for the postprocess stages
//! to scan it as XML.

use std::fmt::Write;

use crate::backend::RenderBackend;
use crate::util::escape_html;

/// HTML render backend.
pub struct HtmlBackend;

impl RenderBackend for HtmlBackend {
    fn code_block(lang: Option<&str>, content: &str, out: &mut String) {
        if let Some(lang) = lang {
            write!(
                out,
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                escape_html(lang),
                escape_html(content)
            )
            .unwrap();
        } else {
            write!(out, "<pre><code>{}</code></pre>", escape_html(content)).unwrap();
        }
    }

    fn blockquote_start(out: &mut String) {
        out.push_str("<blockquote>");
    }

    fn blockquote_end(out: &mut String) {
        out.push_str("</blockquote>");
    }

    fn image(src: &str, alt: &str, title: &str, out: &mut String) {
        write!(out, r#"<img src="{}" alt="{}""#, escape_html(src), escape_html(alt)).unwrap();
        if !title.is_empty() {
            write!(out, r#" title="{}""#, escape_html(title)).unwrap();
        }
        out.push_str(" />");
    }

    fn link(href: &str, title: &str, inner_html: &str, out: &mut String) {
        write!(out, r#"<a href="{}""#, escape_html(href)).unwrap();
        if !title.is_empty() {
            write!(out, r#" title="{}""#, escape_html(title)).unwrap();
        }
        write!(out, ">{inner_html}</a>").unwrap();
    }

    fn hard_break(out: &mut String) {
        out.push_str("<br />");
    }

    fn horizontal_rule(out: &mut String) {
        out.push_str("<hr />");
    }

    fn task_list_marker(checked: bool, out: &mut String) {
        if checked {
            out.push_str(r#"<input type="checkbox" checked="checked" disabled="disabled" /> "#);
        } else {
            out.push_str(r#"<input type="checkbox" disabled="disabled" /> "#);
        }
    }
}
