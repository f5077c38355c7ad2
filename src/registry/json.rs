//! JSON format handler.
//!
//! Nested, in-place capable. Detects the original indentation (spaces vs
//! tabs, and how many) and trailing-newline presence so a full rewrite of a
//! file this handler didn't touch looks untouched; in-place updates patch
//! only the byte spans of the values being changed or append new keys,
//! using a small hand-rolled span-tracking parser rather than a
//! round-trip-unaware `serde_json::Value` tree (`serde_json::Value` doesn't
//! carry byte offsets, so it can't tell us where to cut).

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;

use crate::resource_map::{KeySet, Node, OriginalForm, ResourceMap};

use super::FormatHandler;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndentStyle {
    Spaces(usize),
    Tabs(usize),
    /// No line breaks between entries in the original file.
    Minified,
}

#[derive(Debug, Clone)]
pub struct JsonOriginal {
    pub raw: String,
    pub indent: IndentStyle,
    pub trailing_newline: bool,
}

pub struct JsonHandler;

impl FormatHandler for JsonHandler {
    fn name(&self) -> &'static str {
        "json"
    }

    fn read(&self, path: &Path) -> Result<ResourceMap> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON file: {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse JSON file: {}", path.display()))?;
        let serde_json::Value::Object(_) = &value else {
            bail!("{}: expected a JSON object at the root", path.display());
        };

        let tree = value_to_tree(&value)?;
        let indent = detect_indent(&raw);
        let trailing_newline = raw.ends_with('\n');

        Ok(ResourceMap {
            tree,
            original: Some(OriginalForm::Json(JsonOriginal {
                raw,
                indent,
                trailing_newline,
            })),
        })
    }

    fn write_full(&self, path: &Path, map: &ResourceMap) -> Result<()> {
        let (indent, trailing_newline) = match &map.original {
            Some(OriginalForm::Json(orig)) => (orig.indent.clone(), orig.trailing_newline),
            _ => (IndentStyle::Spaces(2), true),
        };

        let mut out = String::new();
        write_object(&map.tree, &indent, 0, &mut out);
        if trailing_newline {
            out.push('\n');
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, out)
            .with_context(|| format!("Failed to write JSON file: {}", path.display()))?;
        Ok(())
    }

    fn write_in_place(
        &self,
        path: &Path,
        map: &ResourceMap,
        keys_to_update: &KeySet,
    ) -> Option<Result<()>> {
        Some(self.write_in_place_impl(path, map, keys_to_update))
    }

    fn supports_in_place(&self) -> bool {
        true
    }
}

impl JsonHandler {
    fn write_in_place_impl(&self, path: &Path, map: &ResourceMap, keys_to_update: &KeySet) -> Result<()> {
        let Some(OriginalForm::Json(orig)) = &map.original else {
            return self.write_full(path, map);
        };

        if keys_to_update.is_empty() {
            fs::write(path, &orig.raw)
                .with_context(|| format!("Failed to write JSON file: {}", path.display()))?;
            return Ok(());
        }

        let indent_unit = match &orig.indent {
            IndentStyle::Spaces(n) => " ".repeat(*n),
            IndentStyle::Tabs(n) => "\t".repeat(*n),
            IndentStyle::Minified => String::new(),
        };
        let minified = matches!(orig.indent, IndentStyle::Minified);

        let spans = ObjectSpanParser::parse(&orig.raw)?;

        let mut edits: Vec<(usize, usize, String)> = Vec::new();
        for key in keys_to_update.iter() {
            let Some(value) = map.tree_leaf(key) else {
                continue;
            };
            let encoded = serde_json::to_string(&value).expect("string always encodes");

            if let Some((start, end)) = spans.leaf_spans.get(key) {
                edits.push((*start, *end, encoded));
            } else {
                let parent_path = key.rsplit_once('.').map(|(p, _)| p).unwrap_or("");
                let Some(container) = spans.nearest_container(parent_path) else {
                    bail!(
                        "cannot locate insertion point for new key '{}' in {}",
                        key,
                        path.display()
                    );
                };
                let remaining: Vec<&str> = key[container.path.len()..]
                    .trim_start_matches('.')
                    .split('.')
                    .collect();
                let rendered = render_new_entry(
                    &remaining,
                    &value,
                    container.depth + 1,
                    &indent_unit,
                    minified,
                );
                let insertion = build_insertion(&container, &rendered, &indent_unit, minified);
                edits.push((container.insert_at, container.insert_at, insertion));
            }
        }

        edits.sort_by(|a, b| b.0.cmp(&a.0));
        let mut out = orig.raw.clone();
        for (start, end, replacement) in edits {
            out.replace_range(start..end, &replacement);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, out)
            .with_context(|| format!("Failed to write JSON file: {}", path.display()))?;
        Ok(())
    }
}

impl ResourceMap {
    fn tree_leaf(&self, dotted_key: &str) -> Option<String> {
        let mut current = &self.tree;
        let mut parts = dotted_key.split('.').peekable();
        while let Some(part) = parts.next() {
            let node = current.get(part)?;
            if parts.peek().is_none() {
                return node.as_leaf().map(str::to_string);
            }
            current = node.as_map()?;
        }
        None
    }
}

fn value_to_tree(value: &serde_json::Value) -> Result<IndexMap<String, Node>> {
    let serde_json::Value::Object(map) = value else {
        bail!("expected a JSON object");
    };
    let mut tree = IndexMap::new();
    for (key, v) in map {
        tree.insert(key.clone(), json_value_to_node(v));
    }
    Ok(tree)
}

fn json_value_to_node(value: &serde_json::Value) -> Node {
    match value {
        serde_json::Value::Object(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map {
                out.insert(k.clone(), json_value_to_node(v));
            }
            Node::Map(out)
        }
        serde_json::Value::String(s) => Node::Leaf(s.clone()),
        // Non-string, non-object leaves are outside the declared data model
        // (§3: nested tree has string leaves); stringify them so they still
        // participate in key-existence comparisons.
        other => Node::Leaf(other.to_string()),
    }
}

fn detect_indent(raw: &str) -> IndentStyle {
    for line in raw.lines() {
        let trimmed = line.trim_start_matches(' ').trim_start_matches('\t');
        if !trimmed.starts_with('"') {
            continue;
        }
        let leading = &line[..line.len() - trimmed.len()];
        if leading.is_empty() {
            continue;
        }
        if leading.starts_with('\t') {
            return IndentStyle::Tabs(leading.chars().take_while(|&c| c == '\t').count());
        }
        return IndentStyle::Spaces(leading.chars().take_while(|&c| c == ' ').count());
    }
    IndentStyle::Minified
}

fn write_object(tree: &IndexMap<String, Node>, indent: &IndentStyle, depth: usize, out: &mut String) {
    let minified = matches!(indent, IndentStyle::Minified);
    let unit = indent_unit(indent);
    let pad = unit.repeat(depth + 1);
    let closing_pad = unit.repeat(depth);

    out.push('{');
    if tree.is_empty() {
        out.push('}');
        return;
    }
    if !minified {
        out.push('\n');
    }

    let len = tree.len();
    for (i, (key, node)) in tree.iter().enumerate() {
        if !minified {
            out.push_str(&pad);
        }
        out.push_str(&serde_json::to_string(key).unwrap());
        out.push(':');
        if !minified {
            out.push(' ');
        }
        match node {
            Node::Leaf(value) => out.push_str(&serde_json::to_string(value).unwrap()),
            Node::Map(nested) => write_object(nested, indent, depth + 1, out),
        }
        if i + 1 < len {
            out.push(',');
        }
        if !minified {
            out.push('\n');
        }
    }
    if !minified {
        out.push_str(&closing_pad);
    }
    out.push('}');
}

fn indent_unit(style: &IndentStyle) -> String {
    match style {
        IndentStyle::Spaces(n) => " ".repeat(*n),
        IndentStyle::Tabs(n) => "\t".repeat(*n),
        IndentStyle::Minified => String::new(),
    }
}

/// Byte-span bookkeeping for a single `{ ... }` container, recorded while
/// parsing the raw document, used to append a new key to an existing
/// object in-place.
struct ContainerSpan {
    path: String,
    depth: usize,
    /// Byte offset to insert a new entry at (just before the closing
    /// brace, after any trailing whitespace of the last entry).
    insert_at: usize,
    has_entries: bool,
}

struct ObjectSpanParser<'a> {
    bytes: &'a [u8],
    leaf_spans: IndexMap<String, (usize, usize)>,
    containers: IndexMap<String, ContainerSpan>,
}

impl<'a> ObjectSpanParser<'a> {
    fn parse(raw: &'a str) -> Result<Spans> {
        let mut parser = ObjectSpanParser {
            bytes: raw.as_bytes(),
            leaf_spans: IndexMap::new(),
            containers: IndexMap::new(),
        };
        let mut pos = skip_ws(parser.bytes, 0);
        parser.parse_object("", 0, &mut pos)?;
        Ok(Spans {
            leaf_spans: parser.leaf_spans,
            containers: parser.containers,
        })
    }

    fn parse_object(&mut self, path: &str, depth: usize, pos: &mut usize) -> Result<()> {
        if self.bytes.get(*pos) != Some(&b'{') {
            bail!("expected '{{' at byte {}", pos);
        }
        *pos += 1;
        *pos = skip_ws(self.bytes, *pos);

        let mut has_entries = false;
        let mut last_value_end = *pos;

        while self.bytes.get(*pos) != Some(&b'}') {
            has_entries = true;
            let key = parse_json_string(self.bytes, pos)?;
            *pos = skip_ws(self.bytes, *pos);
            if self.bytes.get(*pos) != Some(&b':') {
                bail!("expected ':' after key '{}'", key);
            }
            *pos += 1;
            *pos = skip_ws(self.bytes, *pos);

            let child_path = if path.is_empty() {
                key.clone()
            } else {
                format!("{path}.{key}")
            };

            if self.bytes.get(*pos) == Some(&b'{') {
                self.parse_object(&child_path, depth + 1, pos)?;
            } else if self.bytes.get(*pos) == Some(&b'"') {
                let value_start = *pos;
                parse_json_string(self.bytes, pos)?;
                self.leaf_spans.insert(child_path, (value_start, *pos));
            } else {
                skip_scalar(self.bytes, pos)?;
            }

            last_value_end = *pos;
            *pos = skip_ws(self.bytes, *pos);
            if self.bytes.get(*pos) == Some(&b',') {
                *pos += 1;
                *pos = skip_ws(self.bytes, *pos);
            }
        }

        self.containers.insert(
            path.to_string(),
            ContainerSpan {
                path: path.to_string(),
                depth,
                insert_at: last_value_end,
                has_entries,
            },
        );

        *pos += 1; // consume '}'
        Ok(())
    }
}

struct Spans {
    leaf_spans: IndexMap<String, (usize, usize)>,
    containers: IndexMap<String, ContainerSpan>,
}

impl Spans {
    /// The deepest existing container whose path is a prefix of
    /// `wanted_path` (possibly the root, `""`).
    fn nearest_container(&self, wanted_path: &str) -> Option<&ContainerSpan> {
        if let Some(c) = self.containers.get(wanted_path) {
            return Some(c);
        }
        let mut candidate = wanted_path;
        while let Some((head, _)) = candidate.rsplit_once('.') {
            if let Some(c) = self.containers.get(head) {
                return Some(c);
            }
            candidate = head;
        }
        self.containers.get("")
    }
}

fn build_insertion(container: &ContainerSpan, rendered: &str, indent_unit: &str, minified: bool) -> String {
    let pad = indent_unit.repeat(container.depth + 1);
    let mut insertion = String::new();
    if container.has_entries {
        insertion.push(',');
    }
    if !minified {
        insertion.push('\n');
        insertion.push_str(&pad);
    }
    insertion.push_str(rendered);
    insertion
}

fn render_new_entry(
    remaining_path: &[&str],
    value: &str,
    depth: usize,
    indent_unit: &str,
    minified: bool,
) -> String {
    let Some((first, rest)) = remaining_path.split_first() else {
        return String::new();
    };
    let mut out = String::new();
    out.push_str(&serde_json::to_string(first).unwrap());
    out.push(':');
    if !minified {
        out.push(' ');
    }

    if rest.is_empty() {
        out.push_str(&serde_json::to_string(value).unwrap());
    } else {
        let pad = indent_unit.repeat(depth + 1);
        let closing_pad = indent_unit.repeat(depth);
        out.push('{');
        if !minified {
            out.push('\n');
            out.push_str(&pad);
        }
        out.push_str(&render_new_entry(rest, value, depth + 1, indent_unit, minified));
        if !minified {
            out.push('\n');
            out.push_str(&closing_pad);
        }
        out.push('}');
    }
    out
}

fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while let Some(&b) = bytes.get(pos) {
        if b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' {
            pos += 1;
        } else {
            break;
        }
    }
    pos
}

fn parse_json_string(bytes: &[u8], pos: &mut usize) -> Result<String> {
    if bytes.get(*pos) != Some(&b'"') {
        bail!("expected string at byte {}", pos);
    }
    let start = *pos;
    *pos += 1;
    while let Some(&b) = bytes.get(*pos) {
        match b {
            b'\\' => *pos += 2,
            b'"' => {
                *pos += 1;
                let slice = std::str::from_utf8(&bytes[start..*pos])?;
                let value: String = serde_json::from_str(slice)?;
                return Ok(value);
            }
            _ => *pos += 1,
        }
    }
    bail!("unterminated string starting at byte {}", start)
}

fn skip_scalar(bytes: &[u8], pos: &mut usize) -> Result<()> {
    if bytes.get(*pos) == Some(&b'[') {
        let mut depth = 0i32;
        loop {
            match bytes.get(*pos) {
                Some(b'[') => {
                    depth += 1;
                    *pos += 1;
                }
                Some(b']') => {
                    depth -= 1;
                    *pos += 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(b'"') => {
                    parse_json_string(bytes, pos)?;
                }
                Some(_) => *pos += 1,
                None => bail!("unterminated array"),
            }
        }
        return Ok(());
    }
    while let Some(&b) = bytes.get(*pos) {
        if b == b',' || b == b'}' || b == b']' || b.is_ascii_whitespace() {
            break;
        }
        *pos += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_map::KeySet;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn keyset(keys: &[&str]) -> KeySet {
        KeySet(keys.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>())
    }

    #[test]
    fn reads_nested_json_preserving_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.json");
        fs::write(&path, r#"{"greeting":"Hi","user":{"title":"Hello"}}"#).unwrap();

        let map = JsonHandler.read(&path).unwrap();
        let flat = map.flatten();
        assert_eq!(flat.get("greeting"), Some("Hi"));
        assert_eq!(flat.get("user.title"), Some("Hello"));
    }

    #[test]
    fn write_full_regenerates_with_detected_indent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.json");
        fs::write(&path, "{\n  \"a\": \"A\"\n}\n").unwrap();

        let mut map = JsonHandler.read(&path).unwrap();
        map.set_path("b", "B".to_string());
        JsonHandler.write_full(&path, &map).unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(out, "{\n  \"a\": \"A\",\n  \"b\": \"B\"\n}\n");
    }

    #[test]
    fn minified_input_stays_minified_on_full_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.json");
        fs::write(&path, r#"{"a":"A"}"#).unwrap();

        let map = JsonHandler.read(&path).unwrap();
        JsonHandler.write_full(&path, &map).unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(out, r#"{"a":"A"}"#);
    }

    #[test]
    fn in_place_empty_update_is_byte_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.json");
        let original = "{\n  \"a\": \"A\",\n  \"b\": \"B\"\n}\n";
        fs::write(&path, original).unwrap();

        let map = JsonHandler.read(&path).unwrap();
        JsonHandler
            .write_in_place(&path, &map, &KeySet::default())
            .unwrap()
            .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn in_place_update_touches_only_the_changed_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.json");
        let original = "{\n  \"a\": \"A\",\n  \"b\": \"B\"\n}\n";
        fs::write(&path, original).unwrap();

        let mut map = JsonHandler.read(&path).unwrap();
        map.set_path("a", "Updated".to_string());
        JsonHandler
            .write_in_place(&path, &map, &keyset(&["a"]))
            .unwrap()
            .unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(out, "{\n  \"a\": \"Updated\",\n  \"b\": \"B\"\n}\n");
    }

    #[test]
    fn in_place_appends_new_top_level_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.json");
        let original = "{\n  \"a\": \"A\"\n}\n";
        fs::write(&path, original).unwrap();

        let mut map = JsonHandler.read(&path).unwrap();
        map.set_path("b", "B".to_string());
        JsonHandler
            .write_in_place(&path, &map, &keyset(&["b"]))
            .unwrap()
            .unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(out, "{\n  \"a\": \"A\",\n  \"b\": \"B\"\n}\n");
    }

    #[test]
    fn in_place_appends_new_nested_key_under_existing_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.json");
        let original = "{\n  \"user\": {\n    \"title\": \"Hello\"\n  }\n}\n";
        fs::write(&path, original).unwrap();

        let mut map = JsonHandler.read(&path).unwrap();
        map.set_path("user.nickname", "Bob".to_string());
        JsonHandler
            .write_in_place(&path, &map, &keyset(&["user.nickname"]))
            .unwrap()
            .unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(
            out,
            "{\n  \"user\": {\n    \"title\": \"Hello\",\n    \"nickname\": \"Bob\"\n  }\n}\n"
        );
    }
}
