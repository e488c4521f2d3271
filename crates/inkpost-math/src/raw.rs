use inkpost_renderer::{ExtensionError, MathTypesetter, escape_html};

/// Emits the TeX source in a `<code class="math-tex">` element.
///
/// Used when no typesetting server is configured.
#[derive(Debug, Default)]
pub struct RawTexTypesetter;

impl MathTypesetter for RawTexTypesetter {
    fn typeset(&self, source: &str, _display: bool) -> Result<String, ExtensionError> {
        Ok(format!(r#"<code class="math-tex">{}</code>"#, escape_html(source)))
    }
}
