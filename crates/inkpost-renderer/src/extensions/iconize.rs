//! `:name:` icon shortcodes.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::context::RenderContext;
use crate::extension::{Extension, ExtensionError, InlineRule, Token};
use crate::util::{escape_html, is_escaped};

static SHORTCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([A-Za-z0-9_-]+):").unwrap());

/// Looks up icon markup by name.
pub trait IconProvider: Send + Sync {
    /// SVG markup for `name`, or `None` if there is no such icon.
    fn icon_svg(&self, name: &str) -> Option<String>;
}

/// Renders `:name:` as an inline icon.
///
/// Without a provider, or for unknown names, the shortcode is kept as text.
pub struct IconizeExtension {
    rules: Vec<Box<dyn InlineRule>>,
}

impl IconizeExtension {
    #[must_use]
    pub fn new(provider: Option<Arc<dyn IconProvider>>) -> Self {
        Self {
            rules: vec![Box::new(ShortcodeRule { provider })],
        }
    }
}

impl Extension for IconizeExtension {
    fn name(&self) -> &'static str {
        "iconize"
    }

    fn inline_rules(&self) -> &[Box<dyn InlineRule>] {
        &self.rules
    }
}

struct ShortcodeRule {
    provider: Option<Arc<dyn IconProvider>>,
}

impl InlineRule for ShortcodeRule {
    fn name(&self) -> &'static str {
        "iconize"
    }

    fn start(&self, src: &str) -> Option<usize> {
        src.match_indices(':')
            .map(|(i, _)| i)
            .find(|&i| !is_escaped(src, i) && SHORTCODE_RE.is_match(&src[i..]))
    }

    fn tokenize(&self, src: &str) -> Result<Option<Token>, ExtensionError> {
        Ok(SHORTCODE_RE.captures(src).map(|caps| Token {
            kind: "iconize",
            raw: caps[0].to_owned(),
            text: caps[1].to_owned(),
            display: false,
        }))
    }

    fn render(&self, token: &Token, _ctx: &mut RenderContext) -> Result<String, ExtensionError> {
        let name = &token.text;
        let svg = self.provider.as_ref().and_then(|p| p.icon_svg(name));
        let Some(svg) = svg else {
            tracing::debug!(icon = %name, "icon not available, keeping shortcode");
            return Ok(escape_html(&token.raw));
        };
        let name = escape_html(name);
        Ok(format!(
            r#"<span class="iconize-icon" data-icon="{name}" aria-label="{name}" aria-hidden="true" style="display:inline-flex">{svg}</span>"#
        ))
    }
}
