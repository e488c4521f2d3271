//! TeX math: `$inline$` and `$$display$$`.
//!
//! Both forms are inline rules, so a display formula may sit inside a
//! paragraph. A paragraph holding only a display formula loses its `<p>`.

use std::sync::Arc;

use crate::context::RenderContext;
use crate::extension::{Extension, ExtensionError, InlineRule, Token};
use crate::util::is_escaped;

/// Converts TeX source to markup (usually SVG).
pub trait MathTypesetter: Send + Sync {
    fn typeset(&self, source: &str, display: bool) -> Result<String, ExtensionError>;
}

/// Math extension. Inline rule first, then display.
pub struct MathExtension {
    rules: Vec<Box<dyn InlineRule>>,
}

impl MathExtension {
    #[must_use]
    pub fn new(typesetter: Arc<dyn MathTypesetter>) -> Self {
        Self {
            rules: vec![
                Box::new(InlineMathRule {
                    typesetter: Arc::clone(&typesetter),
                }),
                Box::new(BlockMathRule { typesetter }),
            ],
        }
    }
}

impl Extension for MathExtension {
    fn name(&self) -> &'static str {
        "math"
    }

    fn inline_rules(&self) -> &[Box<dyn InlineRule>] {
        &self.rules
    }
}

struct InlineMathRule {
    typesetter: Arc<dyn MathTypesetter>,
}

/// Match `$content$` at the start of `src`, returning `(raw_len, content)`.
///
/// The opening `$` must not be doubled, the content must be non-empty and
/// free of `$` and newlines, and the closing `$` must not be doubled.
fn match_inline(src: &str) -> Option<(usize, &str)> {
    let body = src.strip_prefix('$')?;
    if body.starts_with('$') {
        return None;
    }
    let end = body.find(['$', '\n'])?;
    if end == 0 || body.as_bytes()[end] != b'$' || body[end + 1..].starts_with('$') {
        return None;
    }
    Some((end + 2, &body[..end]))
}

impl InlineRule for InlineMathRule {
    fn name(&self) -> &'static str {
        "inline-math"
    }

    fn start(&self, src: &str) -> Option<usize> {
        let bytes = src.as_bytes();
        let mut from = 0;
        while let Some(offset) = src[from..].find('$') {
            let at = from + offset;
            let run = bytes[at..].iter().take_while(|&&b| b == b'$').count();
            if run == 1 && !is_escaped(src, at) && match_inline(&src[at..]).is_some() {
                return Some(at);
            }
            from = at + run;
        }
        None
    }

    fn tokenize(&self, src: &str) -> Result<Option<Token>, ExtensionError> {
        let Some((len, content)) = match_inline(src) else {
            return Ok(None);
        };
        let text = content.trim();
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(Token {
            kind: "inline-math",
            raw: src[..len].to_owned(),
            text: text.to_owned(),
            display: false,
        }))
    }

    fn render(&self, token: &Token, _ctx: &mut RenderContext) -> Result<String, ExtensionError> {
        let markup = self.typesetter.typeset(&token.text, false)?;
        Ok(format!(r#"<span class="inline-math">{markup}</span>"#))
    }
}

struct BlockMathRule {
    typesetter: Arc<dyn MathTypesetter>,
}

/// Match `$$content$$` at the start of `src`, returning `(raw_len, content)`.
///
/// The closing `$$` is the nearest one followed by whitespace or the end
/// of input.
fn match_block(src: &str) -> Option<(usize, &str)> {
    let body = src.strip_prefix("$$")?;
    if body.starts_with('$') {
        return None;
    }
    let bytes = body.as_bytes();
    (0..bytes.len())
        .filter(|&i| bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'$'))
        .find(|&i| {
            body[i + 2..]
                .chars()
                .next()
                .is_none_or(char::is_whitespace)
        })
        .map(|i| (i + 4, &body[..i]))
}

fn has_blank_line(content: &str) -> bool {
    let lines: Vec<&str> = content.split('\n').collect();
    lines.len() > 2 && lines[1..lines.len() - 1].iter().any(|l| l.trim().is_empty())
}

impl InlineRule for BlockMathRule {
    fn name(&self) -> &'static str {
        "block-math"
    }

    fn start(&self, src: &str) -> Option<usize> {
        src.match_indices("$$")
            .map(|(i, _)| i)
            .find(|&i| !is_escaped(src, i))
    }

    fn tokenize(&self, src: &str) -> Result<Option<Token>, ExtensionError> {
        let Some((len, content)) = match_block(src) else {
            return Ok(None);
        };
        if has_blank_line(content) {
            return Ok(None);
        }
        let text = content.trim();
        if text.is_empty() || (!text.contains('\n') && text.chars().count() < 2) {
            return Ok(None);
        }
        Ok(Some(Token {
            kind: "block-math",
            raw: src[..len].to_owned(),
            text: text.to_owned(),
            display: true,
        }))
    }

    fn render(&self, token: &Token, _ctx: &mut RenderContext) -> Result<String, ExtensionError> {
        let markup = self.typesetter.typeset(&token.text, true)?;
        Ok(format!(r#"<section class="block-math">{markup}</section>"#))
    }
}
