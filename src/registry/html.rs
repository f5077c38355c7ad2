//! HTML handler: MD5-hashed text-node and attribute extraction, full
//! regeneration only.
//!
//! Grounded on `html_handler.py`'s `read_html_file`/`write_html_file`:
//! direct text children of a fixed tag list (`p`, `span`, `div`, ...),
//! plus `alt`/`title`/`placeholder` attribute values, are hashed with a
//! 12-hex-char MD5 prefix and keyed by that hash. Writing substitutes the
//! translated text back wherever the original text occurs verbatim,
//! which is what the upstream tool does via BeautifulSoup's
//! `NavigableString.replace_with`. Deep DOM-tree manipulation (the
//! email-client formatting normalization passes in the original) is out
//! of scope without a full HTML5 parser in the dependency stack; this
//! handler works directly on the source text.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::resource_map::{KeySet, Node, OriginalForm, ResourceMap};

use super::FormatHandler;

const TEXT_TAGS: [&str; 30] = [
    "p", "span", "div", "td", "th", "li", "a", "h1", "h2", "h3", "h4", "h5", "h6", "button",
    "label", "strong", "em", "b", "i", "u", "small", "big", "caption", "title", "option",
    "textarea", "legend", "figcaption", "summary", "details",
];

static IMG_ALT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<img\b[^>]*\balt="([^"]*)"[^>]*>"#).unwrap());
static TITLE_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<[a-zA-Z][a-zA-Z0-9]*\b[^>]*\btitle="([^"]*)"[^>]*>"#).unwrap());
static PLACEHOLDER_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(?:input|textarea)\b[^>]*\bplaceholder="([^"]*)"[^>]*>"#).unwrap()
});

#[derive(Debug, Clone)]
pub struct HtmlOriginal {
    pub raw: String,
    /// hash -> original text, in first-seen order.
    pub original_texts: IndexMap<String, String>,
}

pub struct HtmlHandler;

impl FormatHandler for HtmlHandler {
    fn name(&self) -> &'static str {
        "html"
    }

    fn read(&self, path: &Path) -> Result<ResourceMap> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read HTML file: {}", path.display()))?;
        let original_texts = extract_translatable_text(&raw);

        let mut tree = IndexMap::new();
        for (hash, text) in &original_texts {
            tree.insert(hash.clone(), Node::Leaf(text.clone()));
        }

        Ok(ResourceMap {
            tree,
            original: Some(OriginalForm::Html(HtmlOriginal { raw, original_texts })),
        })
    }

    fn write_full(&self, path: &Path, map: &ResourceMap) -> Result<()> {
        let Some(OriginalForm::Html(orig)) = &map.original else {
            anyhow::bail!("HTML files can only be written from a file that was first read");
        };

        let mut out = orig.raw.clone();
        for (hash, original_text) in &orig.original_texts {
            if original_text.trim().is_empty() {
                continue;
            }
            let Some(Node::Leaf(translated)) = map.tree.get(hash) else {
                continue;
            };
            if translated == original_text {
                continue;
            }
            out = out.replace(original_text.as_str(), translated);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, out).with_context(|| format!("Failed to write HTML file: {}", path.display()))?;
        Ok(())
    }

    fn write_in_place(
        &self,
        _path: &Path,
        _map: &ResourceMap,
        _keys_to_update: &KeySet,
    ) -> Option<Result<()>> {
        None
    }

    fn supports_in_place(&self) -> bool {
        false
    }
}

fn extract_translatable_text(raw: &str) -> IndexMap<String, String> {
    let mut out = IndexMap::new();

    for tag_name in TEXT_TAGS {
        let pattern = format!(r#"(?s)<{tag_name}\b[^>]*>([^<]*)"#);
        let Ok(re) = Regex::new(&pattern) else { continue };
        for caps in re.captures_iter(raw) {
            let text = caps[1].trim();
            insert_if_translatable(&mut out, text);
        }
    }

    for caps in IMG_ALT.captures_iter(raw) {
        insert_if_translatable(&mut out, caps[1].trim());
    }
    for caps in TITLE_ATTR.captures_iter(raw) {
        insert_if_translatable(&mut out, caps[1].trim());
    }
    for caps in PLACEHOLDER_ATTR.captures_iter(raw) {
        insert_if_translatable(&mut out, caps[1].trim());
    }

    out
}

fn insert_if_translatable(out: &mut IndexMap<String, String>, text: &str) {
    if text.is_empty() || text.starts_with("<!--") || text.starts_with("<![") || text.contains("v:") {
        return;
    }
    out.insert(hash_text(text), text.to_string());
}

fn hash_text(text: &str) -> String {
    let digest = Md5::digest(text.as_bytes());
    format!("{digest:x}")[..12].to_string()
}
