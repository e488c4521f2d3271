//! YAML front matter.
//!
//! A document may open with a block fenced by `---` lines:
//!
//! ```text
//! ---
//! title: Release notes
//! author: Ink
//! ---
//! # Body starts here
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use serde_yaml::Value;

/// Metadata declared in a document's front matter.
///
/// The well-known keys are exposed as text when their value is a scalar.
/// Every other entry, including a well-known key holding a list or a
/// mapping, stays in [`DocumentMeta::extra`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DocumentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Short summary shown in article previews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Cover image path or URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,

    /// Any other keys, kept as-is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl From<BTreeMap<String, Value>> for DocumentMeta {
    fn from(mut values: BTreeMap<String, Value>) -> Self {
        let mut take = |key: &str| {
            let text = values.get(key).and_then(scalar_text)?;
            values.remove(key);
            Some(text)
        };
        Self {
            title: take("title"),
            author: take("author"),
            digest: take("digest"),
            cover: take("cover"),
            extra: values,
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A document split into metadata and Markdown body.
#[derive(Debug)]
pub struct FrontMatter<'a> {
    pub meta: DocumentMeta,
    pub body: &'a str,
    /// Why the front matter was ignored, if it was present but invalid.
    pub error: Option<String>,
}

/// Split leading front matter off `document`.
///
/// Without an opening and a closing `---` line the whole document is the
/// body. Invalid YAML is reported through [`FrontMatter::error`] and
/// yields empty metadata; the block is still removed from the body.
#[must_use]
pub fn split_front_matter(document: &str) -> FrontMatter<'_> {
    let doc = document.strip_prefix('\u{feff}').unwrap_or(document);
    let without_meta = FrontMatter {
        meta: DocumentMeta::default(),
        body: doc,
        error: None,
    };

    let Some(rest) = doc
        .strip_prefix("---")
        .and_then(|r| r.strip_prefix("\r\n").or_else(|| r.strip_prefix('\n')))
    else {
        return without_meta;
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return parse_block(yaml, body);
        }
        offset += line.len();
    }

    without_meta
}

fn parse_block<'a>(yaml: &str, body: &'a str) -> FrontMatter<'a> {
    if yaml.trim().is_empty() {
        return FrontMatter {
            meta: DocumentMeta::default(),
            body,
            error: None,
        };
    }

    match serde_yaml::from_str::<BTreeMap<String, Value>>(yaml) {
        Ok(values) => FrontMatter {
            meta: DocumentMeta::from(values),
            body,
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "ignoring invalid front matter");
            FrontMatter {
                meta: DocumentMeta::default(),
                body,
                error: Some(format!("invalid front matter: {e}")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_front_matter() {
        let fm = split_front_matter("# Hello\n");
        assert_eq!(fm.body, "# Hello\n");
        assert_eq!(fm.meta, DocumentMeta::default());
        assert!(fm.error.is_none());
    }

    #[test]
    fn test_known_and_extra_keys() {
        let fm = split_front_matter(
            "---\ntitle: Notes\ndigest: Short\ntags: [a, b]\n---\n# Body\n",
        );
        assert_eq!(fm.body, "# Body\n");
        assert_eq!(fm.meta.title.as_deref(), Some("Notes"));
        assert_eq!(fm.meta.digest.as_deref(), Some("Short"));
        assert_eq!(fm.meta.author, None);
        assert!(fm.meta.extra.contains_key("tags"));
    }

    #[test]
    fn test_crlf_and_bom() {
        let fm = split_front_matter("\u{feff}---\r\ntitle: Win\r\n---\r\nbody");
        assert_eq!(fm.meta.title.as_deref(), Some("Win"));
        assert_eq!(fm.body, "body");
    }

    #[test]
    fn test_empty_block() {
        let fm = split_front_matter("---\n---\nbody");
        assert_eq!(fm.body, "body");
        assert!(fm.error.is_none());
    }

    #[test]
    fn test_unclosed_block_is_body() {
        let doc = "---\ntitle: x\n\nno closing fence";
        let fm = split_front_matter(doc);
        assert_eq!(fm.body, doc);
        assert_eq!(fm.meta.title, None);
    }

    #[test]
    fn test_invalid_yaml_is_reported_and_stripped() {
        let fm = split_front_matter("---\ntitle: [unclosed\n---\nbody");
        assert_eq!(fm.body, "body");
        assert_eq!(fm.meta, DocumentMeta::default());
        assert!(fm.error.unwrap().starts_with("invalid front matter"));
    }

    #[test]
    fn test_non_text_values_do_not_drop_other_keys() {
        let fm = split_front_matter("---\ntitle: 2024\nauthor: [a, b]\ntags: x\n---\nbody");
        assert!(fm.error.is_none());
        assert_eq!(fm.meta.title.as_deref(), Some("2024"));
        assert_eq!(fm.meta.author, None);
        assert_eq!(
            fm.meta.extra.get("author"),
            Some(&Value::Sequence(vec![Value::from("a"), Value::from("b")]))
        );
        assert_eq!(fm.meta.extra.get("tags"), Some(&Value::from("x")));
    }

    #[test]
    fn test_null_title_is_absent() {
        let fm = split_front_matter("---\ntitle:\ndigest: d\n---\n");
        assert_eq!(fm.meta.title, None);
        assert_eq!(fm.meta.digest.as_deref(), Some("d"));
        assert_eq!(fm.meta.extra.get("title"), Some(&Value::Null));
    }
}
