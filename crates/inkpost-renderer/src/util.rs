//! Small text helpers shared by the renderer and the extensions.

use pulldown_cmark::HeadingLevel;

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Whether the byte at `idx` is preceded by an odd number of backslashes.
///
/// Inline rules use this to leave `\$` and similar escaped delimiters alone.
#[must_use]
pub fn is_escaped(text: &str, idx: usize) -> bool {
    let run = text.as_bytes()[..idx]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    run % 2 == 1
}

/// Drop the backslash from `\` + ASCII punctuation pairs.
pub(crate) fn unescape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && next.is_ascii_punctuation()
        {
            result.push(next);
            chars.next();
        } else {
            result.push(c);
        }
    }
    result
}

/// Byte length of the character at the start of `text`, treating a
/// backslash escape pair as a single unit.
pub(crate) fn step_len(text: &str) -> usize {
    let mut chars = text.chars();
    match chars.next() {
        Some('\\') => match chars.next() {
            Some(next) if next.is_ascii_punctuation() => 1 + next.len_utf8(),
            _ => 1,
        },
        Some(c) => c.len_utf8(),
        None => 0,
    }
}

/// Convert text to an anchor slug.
///
/// Lowercases, keeps alphanumerics (including non-Latin scripts), collapses
/// whitespace, `-` and `_` into single dashes and drops everything else.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true;

    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }
    result
}

pub(crate) fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
