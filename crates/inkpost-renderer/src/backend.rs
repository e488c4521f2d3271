//! Render backend trait for element-level output.

/// Markup for the elements whose shape depends on the target platform.
///
/// The generic renderer handles structure (lists, tables, inline
/// formatting); a backend decides how code blocks, quotes, images, links
/// and void elements are spelled.
pub trait RenderBackend {
    /// Render a code block with an optional language tag.
    fn code_block(lang: Option<&str>, content: &str, out: &mut String);

    fn blockquote_start(out: &mut String);

    fn blockquote_end(out: &mut String);

    /// Render an image. `title` may be empty.
    fn image(src: &str, alt: &str, title: &str, out: &mut String);

    /// Render an anchor around already-rendered `inner_html`.
    fn link(href: &str, title: &str, inner_html: &str, out: &mut String);

    fn hard_break(out: &mut String) {
        out.push_str("<br>");
    }

    fn horizontal_rule(out: &mut String) {
        out.push_str("<hr>");
    }

    fn task_list_marker(checked: bool, out: &mut String) {
        if checked {
            out.push_str(r#"<input type="checkbox" checked disabled> "#);
        } else {
            out.push_str(r#"<input type="checkbox" disabled> "#);
        }
    }
}
