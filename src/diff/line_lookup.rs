//! Key-to-line-number lookup, cached per file, feeding git-blame checks.
//!
//! Grounded on the update flow's need to blame a *specific line* rather
//! than a whole file: each key's on-disk line is format-specific (a JSON
//! leaf's line differs from an Android `<string name="...">` line), so
//! this does a simple single-pass text search per format rather than
//! re-parsing with the structured handler, and caches the whole file's
//! key -> line table the first time any key in it is looked up.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Result;
use once_cell::sync::Lazy;

use crate::registry::FormatHandler;

static CACHE: Lazy<Mutex<HashMap<PathBuf, HashMap<String, u32>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Best-effort line number (1-indexed) for `key` inside `path`. Returns
/// `None` when the file can't be read or the key's marker text can't be
/// located, in which case the caller should skip the blame check for that
/// key rather than fail the whole diff.
pub fn line_for_key(path: &Path, key: &str, handler: &dyn FormatHandler) -> Result<Option<u32>> {
    {
        let cache = CACHE.lock().unwrap();
        if let Some(table) = cache.get(path) {
            return Ok(table.get(key).copied());
        }
    }

    let Ok(content) = fs::read_to_string(path) else {
        return Ok(None);
    };
    let table = build_line_table(&content, handler.name());

    let result = table.get(key).copied();
    CACHE.lock().unwrap().insert(path.to_path_buf(), table);
    Ok(result)
}

/// Clear the cache -- used between runs when the same process handles
/// multiple sync commands against files that may have changed on disk.
pub fn clear_cache() {
    CACHE.lock().unwrap().clear();
}

fn build_line_table(content: &str, format: &str) -> HashMap<String, u32> {
    let mut table = HashMap::new();
    for (index, line) in content.lines().enumerate() {
        let line_number = (index + 1) as u32;
        if let Some(key) = extract_key_marker(line, format) {
            table.entry(key).or_insert(line_number);
        }
    }
    table
}

/// Pull a plausible key out of one line, specific to each format's
/// on-disk shape. JSON/YAML/TypeScript/Properties/PO all put the key
/// near the start of the line as a quoted or bare token; Android XML and
/// iOS `.strings` put it inside a `name="..."` or leading-quote position.
fn extract_key_marker(line: &str, format: &str) -> Option<String> {
    let trimmed = line.trim();
    match format {
        "json" | "yaml" | "typescript" => {
            let after_quote = trimmed.strip_prefix('"')?;
            let end = after_quote.find('"')?;
            Some(after_quote[..end].to_string())
        }
        "android_xml" => {
            let start = trimmed.find("name=\"")? + "name=\"".len();
            let rest = &trimmed[start..];
            let end = rest.find('"')?;
            Some(rest[..end].to_string())
        }
        "ios_strings" | "properties" => {
            if format == "properties" {
                let delim = trimmed.find(['=', ':'])?;
                Some(trimmed[..delim].trim().to_string())
            } else {
                let after_quote = trimmed.strip_prefix('"')?;
                let end = after_quote.find('"')?;
                Some(after_quote[..end].to_string())
            }
        }
        "po" => {
            let rest = trimmed.strip_prefix("msgid \"")?;
            let end = rest.find('"')?;
            Some(rest[..end].to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_key_from_quoted_line() {
        assert_eq!(
            extract_key_marker(r#"  "greeting": "Hi","#, "json"),
            Some("greeting".to_string())
        );
    }

    #[test]
    fn extracts_android_xml_key_from_name_attribute() {
        assert_eq!(
            extract_key_marker(r#"<string name="app_title">My App</string>"#, "android_xml"),
            Some("app_title".to_string())
        );
    }

    #[test]
    fn extracts_po_key_from_msgid_line() {
        assert_eq!(extract_key_marker(r#"msgid "Hello""#, "po"), Some("Hello".to_string()));
    }

    #[test]
    fn unrecognized_format_returns_none() {
        assert_eq!(extract_key_marker("anything", "csv"), None);
    }
}
