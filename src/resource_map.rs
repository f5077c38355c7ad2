//! The in-memory representation of one resource file, polymorphic over
//! format, and its flat projection.
//!
//! Every format handler reads into a single `ResourceMap` shape: an
//! order-preserving nested tree of string leaves (`indexmap::IndexMap`,
//! chosen the way the teacher chooses `serde_json`'s `preserve_order`
//! feature for its own JSON reading) plus, for structured formats, an
//! opaque `original` value the writer uses to reinject translations
//! without reparsing the file from disk.

use std::fmt;

use indexmap::IndexMap;

/// One node of the nested tree: a leaf string, a nested map, or (for
/// Android plurals) a map of quantity → text.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(String),
    Map(IndexMap<String, Node>),
}

impl Node {
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Node::Leaf(s) => Some(s),
            Node::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Map(m) => Some(m),
            Node::Leaf(_) => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, Node>> {
        match self {
            Node::Map(m) => Some(m),
            Node::Leaf(_) => None,
        }
    }
}

/// A resource file's parsed content.
///
/// `Structured` formats (stringsdict, XLIFF, CSV) carry their original
/// parsed representation alongside the flat tree so a full write can
/// re-inject translations into it; `Tree`-only formats (JSON, YAML, TS,
/// flat formats) regenerate entirely from the tree.
#[derive(Debug, Clone)]
pub struct ResourceMap {
    pub tree: IndexMap<String, Node>,
    pub original: Option<OriginalForm>,
}

/// Format-specific original-document state threaded through read → merge →
/// write so in-place writers can reproduce untouched bytes exactly.
#[derive(Debug, Clone)]
pub enum OriginalForm {
    Json(crate::registry::json::JsonOriginal),
    AndroidXml(crate::registry::android_xml::AndroidXmlOriginal),
    IosStrings(crate::registry::ios_strings::StringsOriginal),
    StringsDict(crate::registry::stringsdict::StringsDictOriginal),
    Po(crate::registry::po::PoOriginal),
    Xliff(crate::registry::xliff::XliffOriginal),
    Html(crate::registry::html::HtmlOriginal),
    Csv(crate::registry::csv::CsvOriginal),
    Properties(crate::registry::properties::PropertiesOriginal),
}

impl ResourceMap {
    pub fn empty() -> Self {
        Self {
            tree: IndexMap::new(),
            original: None,
        }
    }

    pub fn from_tree(tree: IndexMap<String, Node>) -> Self {
        Self {
            tree,
            original: None,
        }
    }

    /// Depth-first flattening into dot-notation key → string.
    ///
    /// This is the `flatten` capability every format handler shares; the
    /// fact that it lives here rather than per-handler is what keeps
    /// `flatten(read(x))` deterministic across formats (§3 invariant).
    pub fn flatten(&self) -> FlatMap {
        let mut out = IndexMap::new();
        flatten_into(&self.tree, &mut String::new(), &mut out);
        FlatMap(out)
    }

    /// Set a dot-path to a string value, creating intermediate maps as
    /// needed. Used by the Translator Driver to write results into a copy
    /// of the target tree.
    pub fn set_path(&mut self, dotted_key: &str, value: String) {
        set_path(&mut self.tree, dotted_key, value);
    }
}

fn flatten_into(map: &IndexMap<String, Node>, prefix: &mut String, out: &mut IndexMap<String, String>) {
    for (key, node) in map {
        let start_len = prefix.len();
        if !prefix.is_empty() {
            prefix.push('.');
        }
        prefix.push_str(key);

        match node {
            Node::Leaf(value) => {
                out.insert(prefix.clone(), value.clone());
            }
            Node::Map(nested) => {
                flatten_into(nested, prefix, out);
            }
        }

        prefix.truncate(start_len);
    }
}

fn set_path(map: &mut IndexMap<String, Node>, dotted_key: &str, value: String) {
    let mut parts = dotted_key.split('.');
    let Some(first) = parts.next() else { return };
    let rest: Vec<&str> = parts.collect();

    if rest.is_empty() {
        map.insert(first.to_string(), Node::Leaf(value));
        return;
    }

    let entry = map
        .entry(first.to_string())
        .or_insert_with(|| Node::Map(IndexMap::new()));
    if entry.as_map().is_none() {
        *entry = Node::Map(IndexMap::new());
    }
    let nested = entry.as_map_mut().expect("just ensured Map variant");
    set_path(nested, &rest.join("."), value);
}

/// Ordered key → string projection, the unit the Diff Engine and
/// Translator Driver operate on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatMap(pub IndexMap<String, String>);

impl FlatMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn key_set(&self) -> KeySet {
        KeySet(self.0.keys().cloned().collect())
    }
}

impl fmt::Display for FlatMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.0 {
            writeln!(f, "{k} = {v}")?;
        }
        Ok(())
    }
}

/// An unordered set of dot-notation key paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet(pub std::collections::BTreeSet<String>);

impl KeySet {
    pub fn difference(&self, other: &KeySet) -> KeySet {
        KeySet(self.0.difference(&other.0).cloned().collect())
    }

    pub fn intersection(&self, other: &KeySet) -> KeySet {
        KeySet(self.0.intersection(&other.0).cloned().collect())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
