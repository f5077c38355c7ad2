//! CSV/TSV handler: one key column plus one column per language, in-place
//! capable.
//!
//! Grounded on `csv_handler.py`. A single CSV file holds every locale as
//! a column, so each row's tree node is a `Node::Map` keyed by header
//! name (`tree["greeting"]["fr"] = "Bonjour"`) rather than one leaf per
//! locale file. Duplicate keys are last-write-wins on read, matching
//! `read_csv_file`'s plain dict assignment. [`find_matching_column`] is
//! exported for exact-or-fuzzy language-code matching against headers
//! like `"Chinese (Simplified)(zh)"`, mirroring `_match_language_to_column`.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::resource_map::{KeySet, Node, OriginalForm, ResourceMap};

use super::FormatHandler;

static PAREN_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]+)\)").unwrap());

/// Exact match, then fuzzy match against parenthesized codes in the
/// header (`"English(en)"`, `"Chinese (Simplified)(zh)"`).
pub fn find_matching_column<'a>(columns: &'a [String], language_code: &str) -> Option<&'a str> {
    if let Some(exact) = columns.iter().find(|c| c.as_str() == language_code) {
        return Some(exact);
    }
    columns.iter().find_map(|c| {
        PAREN_CODE
            .captures_iter(c)
            .any(|m| m[1].trim() == language_code.trim())
            .then_some(c.as_str())
    })
}

#[derive(Debug, Clone)]
pub struct CsvOriginal {
    pub key_column: String,
    pub languages: Vec<String>,
    pub row_order: Vec<String>,
}

pub struct CsvHandler {
    pub delimiter: u8,
}

impl FormatHandler for CsvHandler {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn read(&self, path: &Path) -> Result<ResourceMap> {
        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;

        let mut records = reader.records();
        let Some(header_record) = records.next() else {
            bail!("CSV file {} is empty", path.display());
        };
        let headers = header_record?;
        if headers.len() < 2 {
            bail!(
                "CSV file {} must have at least 2 columns (key and at least one language)",
                path.display()
            );
        }
        let key_column = headers[0].to_string();
        let languages: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut tree = IndexMap::new();
        let mut row_order = Vec::new();

        for record in records {
            let record = record?;
            if record.len() != headers.len() {
                continue;
            }
            let key = record[0].trim().to_string();
            if key.is_empty() {
                continue;
            }
            if !tree.contains_key(&key) {
                row_order.push(key.clone());
            }

            let mut lang_map = IndexMap::new();
            for (i, lang) in languages.iter().enumerate() {
                let value = record.get(i + 1).unwrap_or("").trim().to_string();
                lang_map.insert(lang.clone(), Node::Leaf(value));
            }
            tree.insert(key, Node::Map(lang_map));
        }

        Ok(ResourceMap {
            tree,
            original: Some(OriginalForm::Csv(CsvOriginal {
                key_column,
                languages,
                row_order,
            })),
        })
    }

    fn write_full(&self, path: &Path, map: &ResourceMap) -> Result<()> {
        let (key_column, languages) = match &map.original {
            Some(OriginalForm::Csv(orig)) => (orig.key_column.clone(), orig.languages.clone()),
            _ => ("key".to_string(), discover_languages(map)),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let mut writer = ::csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)
            .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;

        let mut header_row = vec![key_column];
        header_row.extend(languages.iter().cloned());
        writer.write_record(&header_row)?;

        for (key, node) in &map.tree {
            let Node::Map(lang_map) = node else { continue };
            let mut row = vec![key.clone()];
            for lang in &languages {
                let value = lang_map.get(lang).and_then(Node::as_leaf).unwrap_or("");
                row.push(value.to_string());
            }
            writer.write_record(&row)?;
        }
        writer.flush()?;
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

impl CsvHandler {
    fn write_in_place_impl(&self, path: &Path, map: &ResourceMap, keys_to_update: &KeySet) -> Result<()> {
        let Some(OriginalForm::Csv(orig)) = &map.original else {
            return self.write_full(path, map);
        };
        if keys_to_update.is_empty() {
            return Ok(());
        }

        let mut rows: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
        for key in &orig.row_order {
            if let Some(Node::Map(lang_map)) = map.tree.get(key) {
                let row: IndexMap<String, String> = orig
                    .languages
                    .iter()
                    .map(|l| {
                        (
                            l.clone(),
                            lang_map.get(l).and_then(Node::as_leaf).unwrap_or("").to_string(),
                        )
                    })
                    .collect();
                rows.insert(key.clone(), row);
            }
        }

        for dotted in keys_to_update.iter() {
            let Some((key, lang)) = dotted.split_once('.') else { continue };
            let Some(Node::Map(lang_map)) = map.tree.get(key) else {
                continue;
            };
            let Some(value) = lang_map.get(lang).and_then(Node::as_leaf) else {
                continue;
            };
            rows.entry(key.to_string())
                .or_insert_with(|| {
                    orig.languages
                        .iter()
                        .map(|l| (l.clone(), String::new()))
                        .collect()
                })
                .insert(lang.to_string(), value.to_string());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let mut writer = ::csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)
            .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;

        let mut header_row = vec![orig.key_column.clone()];
        header_row.extend(orig.languages.iter().cloned());
        writer.write_record(&header_row)?;

        for (key, row) in &rows {
            let mut record = vec![key.clone()];
            for lang in &orig.languages {
                record.push(row.get(lang).cloned().unwrap_or_default());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn discover_languages(map: &ResourceMap) -> Vec<String> {
    let mut seen = Vec::new();
    for node in map.tree.values() {
        if let Node::Map(lang_map) = node {
            for lang in lang_map.keys() {
                if !seen.contains(lang) {
                    seen.push(lang.clone());
                }
            }
        }
    }
    seen
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
    fn reads_rows_into_nested_language_maps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strings.csv");
        fs::write(&path, "key,en,fr\ngreeting,Hi,Bonjour\n").unwrap();

        let map = CsvHandler { delimiter: b',' }.read(&path).unwrap();
        let flat = map.flatten();
        assert_eq!(flat.get("greeting.en"), Some("Hi"));
        assert_eq!(flat.get("greeting.fr"), Some("Bonjour"));
    }

    #[test]
    fn duplicate_keys_last_write_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strings.csv");
        fs::write(&path, "key,en\ngreeting,First\ngreeting,Second\n").unwrap();

        let map = CsvHandler { delimiter: b',' }.read(&path).unwrap();
        assert_eq!(map.flatten().get("greeting.en"), Some("Second"));
    }

    #[test]
    fn fuzzy_column_matching_finds_parenthesized_code() {
        let columns = vec!["Chinese (Simplified)(zh)".to_string(), "English(en)".to_string()];
        assert_eq!(find_matching_column(&columns, "zh"), Some("Chinese (Simplified)(zh)"));
        assert_eq!(find_matching_column(&columns, "en"), Some("English(en)"));
        assert_eq!(find_matching_column(&columns, "de"), None);
    }

    #[test]
    fn write_in_place_updates_only_target_cell() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strings.csv");
        fs::write(&path, "key,en,fr\ngreeting,Hi,Bonjour\nfarewell,Bye,Salut\n").unwrap();

        let mut map = CsvHandler { delimiter: b',' }.read(&path).unwrap();
        if let Some(Node::Map(langs)) = map.tree.get_mut("greeting") {
            langs.insert("fr".to_string(), Node::Leaf("Coucou".to_string()));
        }
        CsvHandler { delimiter: b',' }
            .write_in_place(&path, &map, &keyset(&["greeting.fr"]))
            .unwrap()
            .unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert!(out.contains("greeting,Hi,Coucou"));
        assert!(out.contains("farewell,Bye,Salut"));
    }
}
