//! iOS `.strings` handler: flat `"key" = "value";` entries, in-place
//! capable.
//!
//! `write_full` sorts keys alphabetically on write, matching the upstream
//! tool's behavior; `write_in_place` is a supplement the original doesn't
//! have — it patches only the quoted value span of changed keys and
//! appends new entries at the end, which is what lets comments above
//! existing entries survive a translation run instead of being dropped by
//! a full rewrite.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use indexmap::IndexMap;

use crate::resource_map::{KeySet, Node, OriginalForm, ResourceMap};

use super::FormatHandler;

#[derive(Debug, Clone)]
pub struct StringsOriginal {
    pub raw: String,
}

pub struct IosStringsHandler;

impl FormatHandler for IosStringsHandler {
    fn name(&self) -> &'static str {
        "ios_strings"
    }

    fn read(&self, path: &Path) -> Result<ResourceMap> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read .strings file: {}", path.display()))?;
        let entries = parse_entries(&raw);

        let mut tree = IndexMap::new();
        for entry in entries {
            tree.insert(entry.key, Node::Leaf(entry.value));
        }

        Ok(ResourceMap {
            tree,
            original: Some(OriginalForm::IosStrings(StringsOriginal { raw })),
        })
    }

    fn write_full(&self, path: &Path, map: &ResourceMap) -> Result<()> {
        let mut keys: Vec<&String> = map.tree.keys().collect();
        keys.sort();

        let mut out = String::new();
        for key in keys {
            let Some(Node::Leaf(value)) = map.tree.get(key) else {
                continue;
            };
            out.push('"');
            out.push_str(&escape_ios_string(key));
            out.push_str("\" = \"");
            out.push_str(&escape_ios_string(value));
            out.push_str("\";\n");
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, out)
            .with_context(|| format!("Failed to write .strings file: {}", path.display()))?;
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

impl IosStringsHandler {
    fn write_in_place_impl(&self, path: &Path, map: &ResourceMap, keys_to_update: &KeySet) -> Result<()> {
        let Some(OriginalForm::IosStrings(orig)) = &map.original else {
            return self.write_full(path, map);
        };
        if keys_to_update.is_empty() {
            fs::write(path, &orig.raw)
                .with_context(|| format!("Failed to write .strings file: {}", path.display()))?;
            return Ok(());
        }

        let entries = parse_entries(&orig.raw);
        let mut edits: Vec<(usize, usize, String)> = Vec::new();
        let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();

        for entry in &entries {
            seen.insert(entry.key.as_str());
            if !keys_to_update.contains(&entry.key) {
                continue;
            }
            if let Some(Node::Leaf(value)) = map.tree.get(&entry.key) {
                edits.push((
                    entry.value_span.0,
                    entry.value_span.1,
                    format!("\"{}\"", escape_ios_string(value)),
                ));
            }
        }

        edits.sort_by(|a, b| b.0.cmp(&a.0));
        let mut out = orig.raw.clone();
        for (start, end, replacement) in edits {
            out.replace_range(start..end, &replacement);
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }

        for key in keys_to_update.iter() {
            if seen.contains(key) {
                continue;
            }
            let Some(Node::Leaf(value)) = map.tree.get(key) else {
                continue;
            };
            out.push('"');
            out.push_str(&escape_ios_string(key));
            out.push_str("\" = \"");
            out.push_str(&escape_ios_string(value));
            out.push_str("\";\n");
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, out)
            .with_context(|| format!("Failed to write .strings file: {}", path.display()))?;
        Ok(())
    }
}

struct StringEntry {
    key: String,
    value: String,
    /// Byte span of the quoted value (including quotes) in the raw file.
    value_span: (usize, usize),
}

fn parse_entries(raw: &str) -> Vec<StringEntry> {
    let bytes = raw.as_bytes();
    let mut entries = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match skip_to_next_string(bytes, pos) {
            Some(key_start) => {
                let Some((key_raw, key_end)) = scan_quoted(bytes, key_start) else {
                    break;
                };
                let after_key = skip_ws_and_comments(bytes, key_end);
                if bytes.get(after_key) != Some(&b'=') {
                    pos = key_end;
                    continue;
                }
                let after_eq = skip_ws_and_comments(bytes, after_key + 1);
                if bytes.get(after_eq) != Some(&b'"') {
                    pos = after_eq;
                    continue;
                }
                let Some((value_raw, value_end)) = scan_quoted(bytes, after_eq) else {
                    break;
                };
                entries.push(StringEntry {
                    key: unescape_ios_string(&key_raw),
                    value: unescape_ios_string(&value_raw),
                    value_span: (after_eq, value_end),
                });
                pos = value_end;
            }
            None => break,
        }
    }

    entries
}

fn skip_to_next_string(bytes: &[u8], mut pos: usize) -> Option<usize> {
    while pos < bytes.len() {
        match bytes[pos] {
            b'"' => return Some(pos),
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                pos += 2;
                while pos < bytes.len() && !(bytes[pos] == b'*' && bytes.get(pos + 1) == Some(&b'/')) {
                    pos += 1;
                }
                pos += 2;
            }
            _ => pos += 1,
        }
    }
    None
}

fn skip_ws_and_comments(bytes: &[u8], pos: usize) -> usize {
    skip_to_next_non_ws(bytes, pos)
}

fn skip_to_next_non_ws(bytes: &[u8], mut pos: usize) -> usize {
    loop {
        while bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
            pos += 1;
        }
        if bytes.get(pos) == Some(&b'/') && bytes.get(pos + 1) == Some(&b'/') {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        if bytes.get(pos) == Some(&b'/') && bytes.get(pos + 1) == Some(&b'*') {
            pos += 2;
            while pos < bytes.len() && !(bytes[pos] == b'*' && bytes.get(pos + 1) == Some(&b'/')) {
                pos += 1;
            }
            pos += 2;
            continue;
        }
        break;
    }
    pos
}

/// Scans a `"...";`-free quoted literal starting at `pos` (which must be a
/// `"`). Returns the raw escaped contents and the byte offset just past the
/// closing quote.
fn scan_quoted(bytes: &[u8], pos: usize) -> Option<(String, usize)> {
    if bytes.get(pos) != Some(&b'"') {
        return None;
    }
    let mut i = pos + 1;
    let start = i;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => {
                let raw = std::str::from_utf8(&bytes[start..i]).ok()?.to_string();
                return Some((raw, i + 1));
            }
            _ => i += 1,
        }
    }
    None
}

fn unescape_ios_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape_ios_string(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
        .replace('\r', "\\r")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn keyset(keys: &[&str]) -> KeySet {
        KeySet(keys.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>())
    }

    #[test]
    fn reads_flat_entries_and_skips_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Localizable.strings");
        fs::write(
            &path,
            "/* greeting */\n\"greeting\" = \"Hi\";\n\"farewell\" = \"Bye\";\n",
        )
        .unwrap();

        let map = IosStringsHandler.read(&path).unwrap();
        let flat = map.flatten();
        assert_eq!(flat.get("greeting"), Some("Hi"));
        assert_eq!(flat.get("farewell"), Some("Bye"));
    }

    #[test]
    fn write_full_sorts_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Localizable.strings");

        let mut map = ResourceMap::empty();
        map.set_path("zebra", "Z".to_string());
        map.set_path("apple", "A".to_string());
        IosStringsHandler.write_full(&path, &map).unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert!(out.find("apple").unwrap() < out.find("zebra").unwrap());
    }

    #[test]
    fn in_place_preserves_comment_and_updates_only_target_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Localizable.strings");
        let original = "/* greeting */\n\"greeting\" = \"Hi\";\n\"farewell\" = \"Bye\";\n";
        fs::write(&path, original).unwrap();

        let mut map = IosStringsHandler.read(&path).unwrap();
        map.set_path("greeting", "Hello".to_string());
        IosStringsHandler
            .write_in_place(&path, &map, &keyset(&["greeting"]))
            .unwrap()
            .unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert!(out.contains("/* greeting */"));
        assert!(out.contains("\"greeting\" = \"Hello\";"));
        assert!(out.contains("\"farewell\" = \"Bye\";"));
    }
}
