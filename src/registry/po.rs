//! gettext `.po` handler, in-place capable.
//!
//! Entries are parsed line-by-line the way the upstream tool's
//! `_parse_po_content` does (comments, then `msgctxt`, then `msgid`,
//! then `msgstr`, each possibly spanning multiple quoted-string lines),
//! and unchanged entries are re-emitted byte-for-byte from their original
//! lines so a translation run doesn't reformat single-line entries into
//! multi-line ones or vice versa.
//!
//! `msgctxt` entries are keyed as `{msgctxt}\u{1}{msgid}` in the flattened
//! map — dot-paths have no natural slot for gettext's separate context
//! axis, and `\u{1}` can't appear in a `.po` source string.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use indexmap::IndexMap;

use crate::resource_map::{KeySet, Node, OriginalForm, ResourceMap};

use super::FormatHandler;

const CTX_SEPARATOR: char = '\u{1}';

#[derive(Debug, Clone)]
pub struct PoOriginal {
    pub raw: String,
}

pub struct PoHandler;

impl FormatHandler for PoHandler {
    fn name(&self) -> &'static str {
        "po"
    }

    fn read(&self, path: &Path) -> Result<ResourceMap> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read .po file: {}", path.display()))?;
        let entries = parse_po(&raw);

        let mut tree = IndexMap::new();
        for entry in entries {
            if entry.msgid.is_empty() {
                continue;
            }
            tree.insert(entry.key(), Node::Leaf(entry.msgstr));
        }

        Ok(ResourceMap {
            tree,
            original: Some(OriginalForm::Po(PoOriginal { raw })),
        })
    }

    fn write_full(&self, path: &Path, map: &ResourceMap) -> Result<()> {
        let mut out = String::new();
        out.push_str("msgid \"\"\nmsgstr \"\"\n\"Content-Type: text/plain; charset=UTF-8\\n\"\n\n");

        for (key, node) in &map.tree {
            let Node::Leaf(msgstr) = node else { continue };
            let (msgctxt, msgid) = split_key(key);
            if let Some(ctx) = msgctxt {
                out.push_str(&format!("msgctxt \"{}\"\n", escape_po_string(ctx)));
            }
            push_field(&mut out, "msgid", msgid);
            push_field(&mut out, "msgstr", msgstr);
            out.push('\n');
        }

        write_file(path, &out)
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

impl PoHandler {
    fn write_in_place_impl(&self, path: &Path, map: &ResourceMap, keys_to_update: &KeySet) -> Result<()> {
        let Some(OriginalForm::Po(orig)) = &map.original else {
            return self.write_full(path, map);
        };
        if keys_to_update.is_empty() {
            return write_file(path, &orig.raw);
        }

        let entries = parse_po(&orig.raw);
        let mut updated_keys = std::collections::HashSet::new();
        let mut out = String::new();

        for entry in &entries {
            let key = entry.key();
            updated_keys.insert(key.clone());
            for comment in &entry.comments {
                out.push_str(comment);
                out.push('\n');
            }
            if let Some(ctx) = &entry.msgctxt {
                out.push_str(&format!("msgctxt \"{}\"\n", escape_po_string(ctx)));
            }

            let new_msgstr = if keys_to_update.contains(&key) {
                map.tree
                    .get(&key)
                    .and_then(Node::as_leaf)
                    .map(str::to_string)
                    .unwrap_or_else(|| entry.msgstr.clone())
            } else {
                entry.msgstr.clone()
            };

            if entry.msgid_lines.len() > 1 {
                for line in &entry.msgid_lines {
                    out.push_str(line);
                    out.push('\n');
                }
            } else {
                push_field(&mut out, "msgid", &entry.msgid);
            }

            if keys_to_update.contains(&key) || entry.msgstr_lines.len() <= 1 {
                push_field(&mut out, "msgstr", &new_msgstr);
            } else {
                for line in &entry.msgstr_lines {
                    out.push_str(line);
                    out.push('\n');
                }
            }
            out.push('\n');
        }

        for key in keys_to_update.iter() {
            if updated_keys.contains(key) {
                continue;
            }
            let Some(Node::Leaf(msgstr)) = map.tree.get(key) else {
                continue;
            };
            let (msgctxt, msgid) = split_key(key);
            if let Some(ctx) = msgctxt {
                out.push_str(&format!("msgctxt \"{}\"\n", escape_po_string(ctx)));
            }
            push_field(&mut out, "msgid", msgid);
            push_field(&mut out, "msgstr", msgstr);
            out.push('\n');
        }

        write_file(path, &out)
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write .po file: {}", path.display()))?;
    Ok(())
}

fn split_key(key: &str) -> (Option<&str>, &str) {
    match key.split_once(CTX_SEPARATOR) {
        Some((ctx, id)) => (Some(ctx), id),
        None => (None, key),
    }
}

fn push_field(out: &mut String, field: &str, value: &str) {
    if value.is_empty() || value.contains('\n') || value.len() > 80 {
        out.push_str(&format!("{field} \"\"\n"));
        if !value.is_empty() {
            for (i, line) in value.split('\n').enumerate() {
                if i > 0 {
                    out.push_str(&format!("\"{}\"\n", escape_po_string(&format!("\n{line}"))));
                } else {
                    out.push_str(&format!("\"{}\"\n", escape_po_string(line)));
                }
            }
        }
    } else {
        out.push_str(&format!("{field} \"{}\"\n", escape_po_string(value)));
    }
}

struct PoEntry {
    comments: Vec<String>,
    msgctxt: Option<String>,
    msgid: String,
    msgstr: String,
    msgid_lines: Vec<String>,
    msgstr_lines: Vec<String>,
}

impl PoEntry {
    fn key(&self) -> String {
        match &self.msgctxt {
            Some(ctx) => format!("{ctx}{CTX_SEPARATOR}{}", self.msgid),
            None => self.msgid.clone(),
        }
    }
}

fn parse_po(raw: &str) -> Vec<PoEntry> {
    let lines: Vec<&str> = raw.lines().collect();
    let mut entries = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() {
            i += 1;
            continue;
        }
        if !line.starts_with('#') && !line.starts_with("msgctxt") && !line.starts_with("msgid") {
            i += 1;
            continue;
        }

        let mut comments = Vec::new();
        while i < lines.len() && lines[i].trim_start().starts_with('#') {
            comments.push(lines[i].to_string());
            i += 1;
        }

        let mut msgctxt = None;
        if i < lines.len() && lines[i].trim_start().starts_with("msgctxt") {
            msgctxt = Some(extract_quoted(lines[i].trim()));
            i += 1;
        }

        let mut msgid_lines = Vec::new();
        let mut msgid = String::new();
        if i < lines.len() && lines[i].trim_start().starts_with("msgid") {
            msgid_lines.push(lines[i].to_string());
            msgid.push_str(&extract_quoted(lines[i].trim()));
            i += 1;
            while i < lines.len() && lines[i].trim_start().starts_with('"') {
                msgid_lines.push(lines[i].to_string());
                msgid.push_str(&extract_quoted(lines[i].trim()));
                i += 1;
            }
        }

        let mut msgstr_lines = Vec::new();
        let mut msgstr = String::new();
        if i < lines.len() && lines[i].trim_start().starts_with("msgstr") {
            msgstr_lines.push(lines[i].to_string());
            msgstr.push_str(&extract_quoted(lines[i].trim()));
            i += 1;
            while i < lines.len() && lines[i].trim_start().starts_with('"') {
                msgstr_lines.push(lines[i].to_string());
                msgstr.push_str(&extract_quoted(lines[i].trim()));
                i += 1;
            }
        }

        entries.push(PoEntry {
            comments,
            msgctxt,
            msgid,
            msgstr,
            msgid_lines,
            msgstr_lines,
        });
    }

    entries
}

fn extract_quoted(line: &str) -> String {
    let Some(start) = line.find('"') else { return String::new() };
    let Some(end) = line.rfind('"') else { return String::new() };
    if end <= start {
        return String::new();
    }
    unescape_po_string(&line[start + 1..end])
}

fn unescape_po_string(text: &str) -> String {
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
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape_po_string(text: &str) -> String {
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
    fn reads_simple_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fr.po");
        fs::write(&path, "msgid \"Hello\"\nmsgstr \"Bonjour\"\n\nmsgid \"Bye\"\nmsgstr \"\"\n").unwrap();

        let map = PoHandler.read(&path).unwrap();
        let flat = map.flatten();
        assert_eq!(flat.get("Hello"), Some("Bonjour"));
        assert_eq!(flat.get("Bye"), Some(""));
    }

    #[test]
    fn reads_msgctxt_entries_with_composite_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fr.po");
        fs::write(
            &path,
            "msgctxt \"menu\"\nmsgid \"Home\"\nmsgstr \"Accueil\"\n",
        )
        .unwrap();

        let map = PoHandler.read(&path).unwrap();
        let flat = map.flatten();
        assert_eq!(flat.get(&format!("menu{CTX_SEPARATOR}Home")), Some("Accueil"));
    }

    #[test]
    fn in_place_preserves_comments_and_updates_only_target() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fr.po");
        let original = "#. Key: greeting\nmsgid \"Hello\"\nmsgstr \"Bonjour\"\n\nmsgid \"Bye\"\nmsgstr \"Salut\"\n";
        fs::write(&path, original).unwrap();

        let mut map = PoHandler.read(&path).unwrap();
        map.set_path("Hello", "Salut!".to_string());
        PoHandler
            .write_in_place(&path, &map, &keyset(&["Hello"]))
            .unwrap()
            .unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert!(out.contains("#. Key: greeting"));
        assert!(out.contains("msgstr \"Salut!\""));
        assert!(out.contains("msgid \"Bye\"\nmsgstr \"Salut\""));
    }

    #[test]
    fn long_new_value_is_written_multiline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fr.po");

        let mut map = ResourceMap::empty();
        map.set_path("key", "x".repeat(90));
        PoHandler.write_full(&path, &map).unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert!(out.contains("msgstr \"\"\n"));
    }
}
