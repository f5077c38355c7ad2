//! Java `.properties` handler: flat `key=value` entries, in-place
//! capable.
//!
//! Grounded on `properties_handler.py`'s `read_properties_file`: keys
//! are already dotted (`app.title`) but are NOT split into a nested
//! tree the way JSON/YAML are — Java properties keys are opaque
//! strings, so they're kept as flat leaves, same treatment as iOS
//! `.strings`. `\\uXXXX` escapes are decoded on read and re-encoded for
//! any non-ASCII character on write, matching the `java.util.Properties`
//! on-disk convention.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use indexmap::IndexMap;

use crate::resource_map::{KeySet, Node, OriginalForm, ResourceMap};

use super::FormatHandler;

#[derive(Debug, Clone)]
pub struct PropertiesOriginal {
    pub raw: String,
}

pub struct PropertiesHandler;

impl FormatHandler for PropertiesHandler {
    fn name(&self) -> &'static str {
        "properties"
    }

    fn read(&self, path: &Path) -> Result<ResourceMap> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read .properties file: {}", path.display()))?;
        let entries = parse_entries(&raw);

        let mut tree = IndexMap::new();
        for entry in entries {
            tree.insert(entry.key, Node::Leaf(entry.value));
        }

        Ok(ResourceMap {
            tree,
            original: Some(OriginalForm::Properties(PropertiesOriginal { raw })),
        })
    }

    fn write_full(&self, path: &Path, map: &ResourceMap) -> Result<()> {
        let mut out = String::new();
        for (key, node) in &map.tree {
            let Node::Leaf(value) = node else { continue };
            out.push_str(&escape_properties(key));
            out.push('=');
            out.push_str(&escape_properties(value));
            out.push('\n');
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, out)
            .with_context(|| format!("Failed to write .properties file: {}", path.display()))?;
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

impl PropertiesHandler {
    fn write_in_place_impl(&self, path: &Path, map: &ResourceMap, keys_to_update: &KeySet) -> Result<()> {
        let Some(OriginalForm::Properties(orig)) = &map.original else {
            return self.write_full(path, map);
        };
        if keys_to_update.is_empty() {
            fs::write(path, &orig.raw)
                .with_context(|| format!("Failed to write .properties file: {}", path.display()))?;
            return Ok(());
        }

        let mut out = String::new();
        let mut seen = std::collections::HashSet::new();

        for line in orig.raw.lines() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                out.push_str(line);
                out.push('\n');
                continue;
            }
            let Some((raw_key, _)) = split_entry(line) else {
                out.push_str(line);
                out.push('\n');
                continue;
            };
            let key = unescape_properties(raw_key.trim());
            seen.insert(key.clone());

            if keys_to_update.contains(&key) {
                if let Some(Node::Leaf(value)) = map.tree.get(&key) {
                    out.push_str(&escape_properties(&key));
                    out.push('=');
                    out.push_str(&escape_properties(value));
                    out.push('\n');
                    continue;
                }
            }
            out.push_str(line);
            out.push('\n');
        }

        for key in keys_to_update.iter() {
            if seen.contains(key) {
                continue;
            }
            let Some(Node::Leaf(value)) = map.tree.get(key) else {
                continue;
            };
            out.push_str(&escape_properties(key));
            out.push('=');
            out.push_str(&escape_properties(value));
            out.push('\n');
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, out)
            .with_context(|| format!("Failed to write .properties file: {}", path.display()))?;
        Ok(())
    }
}

struct PropertyEntry {
    key: String,
    value: String,
}

fn parse_entries(raw: &str) -> Vec<PropertyEntry> {
    let mut entries = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        if let Some((key, value)) = split_entry(line) {
            entries.push(PropertyEntry {
                key: unescape_properties(key.trim()),
                value: unescape_properties(value.trim_start()),
            });
        }
    }
    entries
}

fn split_entry(line: &str) -> Option<(&str, &str)> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'=' | b':' => return Some((&line[..i], &line[i + 1..])),
            _ => i += 1,
        }
    }
    None
}

fn unescape_properties(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('\\') => out.push('\\'),
                Some('u') => {
                    let hex: String = (0..4).filter_map(|_| chars.next()).collect();
                    if let Ok(code) = u32::from_str_radix(&hex, 16) {
                        if let Some(ch) = char::from_u32(code) {
                            out.push(ch);
                        }
                    }
                }
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape_properties(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() => out.push(c),
            c => out.push_str(&format!("\\u{:04x}", c as u32)),
        }
    }
    out
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
    fn reads_flat_dotted_keys_without_splitting() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("messages.properties");
        fs::write(&path, "# comment\napp.title=My Application\nlogin.button=Log In\n").unwrap();

        let map = PropertiesHandler.read(&path).unwrap();
        let flat = map.flatten();
        assert_eq!(flat.get("app.title"), Some("My Application"));
        assert_eq!(flat.get("login.button"), Some("Log In"));
    }

    #[test]
    fn decodes_unicode_escapes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("messages.properties");
        fs::write(&path, "special.chars=Hello \\u00E4\\u00F6\\u00FC\n").unwrap();

        let map = PropertiesHandler.read(&path).unwrap();
        assert_eq!(map.flatten().get("special.chars"), Some("Hello äöü"));
    }

    #[test]
    fn in_place_preserves_comments_and_updates_only_target() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("messages.properties");
        let original = "# English messages\napp.title=My Application\nlogin.button=Log In\n";
        fs::write(&path, original).unwrap();

        let mut map = PropertiesHandler.read(&path).unwrap();
        map.tree.insert("app.title".to_string(), Node::Leaf("Renamed App".to_string()));
        PropertiesHandler
            .write_in_place(&path, &map, &keyset(&["app.title"]))
            .unwrap()
            .unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert!(out.contains("# English messages"));
        assert!(out.contains("app.title=Renamed App"));
        assert!(out.contains("login.button=Log In"));
    }
}
