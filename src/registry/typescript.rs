//! TypeScript format handler: `export const <name> = { ... };`.
//!
//! Nested, full-regeneration only. The upstream tool locates the export
//! with a lazy regex over the whole file, which only works for
//! non-nested objects; nested locale objects are the common case, so this
//! handler instead brace-matches to find the full object literal before
//! parsing it, keeping the same "grep for the export, parse the object"
//! shape without inheriting that bug.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::resource_map::{KeySet, Node, ResourceMap};

use super::FormatHandler;

static EXPORT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"export\s+const\s+(\w+)\s*=\s*\{").unwrap());

pub struct TypeScriptHandler;

impl FormatHandler for TypeScriptHandler {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn read(&self, path: &Path) -> Result<ResourceMap> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read TypeScript file: {}", path.display()))?;

        let m = EXPORT_PATTERN
            .find(&raw)
            .with_context(|| format!("No `export const x = {{...}}` found in {}", path.display()))?;
        let brace_start = m.end() - 1;
        let brace_end = find_matching_brace(&raw, brace_start)
            .with_context(|| format!("Unbalanced braces in {}", path.display()))?;

        let object_text = &raw[brace_start..=brace_end];
        let mut parser = JsObjectParser::new(object_text);
        let tree = parser.parse_object()?;

        Ok(ResourceMap::from_tree(tree))
    }

    fn write_full(&self, path: &Path, map: &ResourceMap) -> Result<()> {
        let export_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("translations")
            .to_string();

        let mut out = format!("export const {export_name} = ");
        write_object(&map.tree, 0, &mut out);
        out.push_str(";\n");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, out)
            .with_context(|| format!("Failed to write TypeScript file: {}", path.display()))?;
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

fn find_matching_brace(text: &str, open_pos: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut i = open_pos;
    let mut in_string: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(quote) = in_string {
            if b == b'\\' {
                i += 1;
            } else if b == quote {
                in_string = None;
            }
        } else {
            match b {
                b'"' | b'\'' | b'`' => in_string = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

fn write_object(tree: &IndexMap<String, Node>, depth: usize, out: &mut String) {
    if tree.is_empty() {
        out.push_str("{}");
        return;
    }
    let pad = "  ".repeat(depth + 1);
    let closing_pad = "  ".repeat(depth);

    out.push_str("{\n");
    for (key, node) in tree {
        out.push_str(&pad);
        out.push_str(&render_key(key));
        out.push_str(": ");
        match node {
            Node::Leaf(value) => out.push_str(&render_string(value)),
            Node::Map(nested) => write_object(nested, depth + 1, out),
        }
        out.push_str(",\n");
    }
    out.push_str(&closing_pad);
    out.push('}');
}

fn render_key(key: &str) -> String {
    let is_identifier = !key.is_empty()
        && key
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if is_identifier {
        key.to_string()
    } else {
        render_string(key)
    }
}

fn render_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
    format!("\"{escaped}\"")
}

/// Minimal JS object-literal parser: bare or quoted keys, single/double
/// quoted string values, nested objects, trailing commas, `//` comments.
struct JsObjectParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> JsObjectParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn parse_object(&mut self) -> Result<IndexMap<String, Node>> {
        self.skip_trivia();
        if self.bytes.get(self.pos) != Some(&b'{') {
            bail!("expected '{{' at byte {}", self.pos);
        }
        self.pos += 1;
        self.skip_trivia();

        let mut map = IndexMap::new();
        while self.bytes.get(self.pos) != Some(&b'}') {
            let key = self.parse_key()?;
            self.skip_trivia();
            if self.bytes.get(self.pos) != Some(&b':') {
                bail!("expected ':' after key '{}'", key);
            }
            self.pos += 1;
            self.skip_trivia();

            let node = if self.bytes.get(self.pos) == Some(&b'{') {
                Node::Map(self.parse_object()?)
            } else {
                Node::Leaf(self.parse_string()?)
            };
            map.insert(key, node);

            self.skip_trivia();
            if self.bytes.get(self.pos) == Some(&b',') {
                self.pos += 1;
                self.skip_trivia();
            }
        }
        self.pos += 1; // consume '}'
        Ok(map)
    }

    fn parse_key(&mut self) -> Result<String> {
        match self.bytes.get(self.pos) {
            Some(b'"') | Some(b'\'') => self.parse_string(),
            _ => {
                let start = self.pos;
                while let Some(&b) = self.bytes.get(self.pos) {
                    if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                if self.pos == start {
                    bail!("expected object key at byte {}", self.pos);
                }
                Ok(std::str::from_utf8(&self.bytes[start..self.pos])?.to_string())
            }
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        let quote = match self.bytes.get(self.pos) {
            Some(&b @ (b'"' | b'\'')) => b,
            _ => bail!("expected a quoted string at byte {}", self.pos),
        };
        self.pos += 1;
        let mut out = String::new();
        while let Some(&b) = self.bytes.get(self.pos) {
            match b {
                b'\\' => {
                    self.pos += 1;
                    match self.bytes.get(self.pos) {
                        Some(b'n') => out.push('\n'),
                        Some(b't') => out.push('\t'),
                        Some(&c) => out.push(c as char),
                        None => bail!("unterminated escape"),
                    }
                    self.pos += 1;
                }
                c if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                _ => {
                    let ch_start = self.pos;
                    let ch_len = utf8_char_len(b);
                    out.push_str(std::str::from_utf8(&self.bytes[ch_start..ch_start + ch_len])?);
                    self.pos += ch_len;
                }
            }
        }
        bail!("unterminated string")
    }

    fn skip_trivia(&mut self) {
        loop {
            while let Some(&b) = self.bytes.get(self.pos) {
                if b.is_ascii_whitespace() {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            if self.bytes.get(self.pos) == Some(&b'/') && self.bytes.get(self.pos + 1) == Some(&b'/') {
                while let Some(&b) = self.bytes.get(self.pos) {
                    if b == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }
            if self.bytes.get(self.pos) == Some(&b'/') && self.bytes.get(self.pos + 1) == Some(&b'*') {
                self.pos += 2;
                while self.pos < self.bytes.len()
                    && !(self.bytes.get(self.pos) == Some(&b'*') && self.bytes.get(self.pos + 1) == Some(&b'/'))
                {
                    self.pos += 1;
                }
                self.pos += 2;
                continue;
            }
            break;
        }
    }
}

fn utf8_char_len(first_byte: u8) -> usize {
    if first_byte & 0x80 == 0 {
        1
    } else if first_byte & 0xE0 == 0xC0 {
        2
    } else if first_byte & 0xF0 == 0xE0 {
        3
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_nested_export_with_bare_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.ts");
        fs::write(
            &path,
            "export const en = {\n  greeting: \"Hi\",\n  user: {\n    title: 'Hello',\n  },\n};\n",
        )
        .unwrap();

        let map = TypeScriptHandler.read(&path).unwrap();
        let flat = map.flatten();
        assert_eq!(flat.get("greeting"), Some("Hi"));
        assert_eq!(flat.get("user.title"), Some("Hello"));
    }

    #[test]
    fn write_full_emits_bare_keys_and_export_name_from_file_stem() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fr.ts");

        let mut map = ResourceMap::empty();
        map.set_path("greeting", "Salut".to_string());
        TypeScriptHandler.write_full(&path, &map).unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert!(out.starts_with("export const fr = {\n"));
        assert!(out.contains("  greeting: \"Salut\",\n"));
        assert!(out.trim_end().ends_with("};"));
    }

    #[test]
    fn handles_nested_braces_the_lazy_regex_would_truncate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("en.ts");
        fs::write(
            &path,
            "export const en = { a: { b: { c: \"deep\" } }, d: \"after\" };\n",
        )
        .unwrap();

        let map = TypeScriptHandler.read(&path).unwrap();
        let flat = map.flatten();
        assert_eq!(flat.get("a.b.c"), Some("deep"));
        assert_eq!(flat.get("d"), Some("after"));
    }
}
