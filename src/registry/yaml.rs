//! YAML format handler.
//!
//! Nested, full-regeneration only — there's no YAML original-document state
//! to carry, mirroring the upstream tool's own choice to write YAML with
//! `yaml.dump(..., sort_keys=False)` from a plain dict rather than patching
//! a parsed document in place.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;

use crate::resource_map::{KeySet, Node, ResourceMap};

use super::FormatHandler;

pub struct YamlHandler;

impl FormatHandler for YamlHandler {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn read(&self, path: &Path) -> Result<ResourceMap> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read YAML file: {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(ResourceMap::empty());
        }
        let value: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;
        let tree = value_to_tree(&value)?;
        Ok(ResourceMap::from_tree(tree))
    }

    fn write_full(&self, path: &Path, map: &ResourceMap) -> Result<()> {
        let value = tree_to_value(&map.tree);
        let out = serde_yaml::to_string(&value).context("Failed to serialize YAML")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, out)
            .with_context(|| format!("Failed to write YAML file: {}", path.display()))?;
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

fn value_to_tree(value: &serde_yaml::Value) -> Result<IndexMap<String, Node>> {
    let serde_yaml::Value::Mapping(mapping) = value else {
        bail!("expected a YAML mapping at the root");
    };
    let mut tree = IndexMap::new();
    for (k, v) in mapping {
        let key = k.as_str().unwrap_or_default().to_string();
        tree.insert(key, yaml_value_to_node(v));
    }
    Ok(tree)
}

fn yaml_value_to_node(value: &serde_yaml::Value) -> Node {
    match value {
        serde_yaml::Value::Mapping(mapping) => {
            let mut out = IndexMap::new();
            for (k, v) in mapping {
                let key = k.as_str().unwrap_or_default().to_string();
                out.insert(key, yaml_value_to_node(v));
            }
            Node::Map(out)
        }
        serde_yaml::Value::String(s) => Node::Leaf(s.clone()),
        serde_yaml::Value::Null => Node::Leaf(String::new()),
        other => Node::Leaf(
            serde_yaml::to_string(other)
                .unwrap_or_default()
                .trim()
                .to_string(),
        ),
    }
}

fn tree_to_value(tree: &IndexMap<String, Node>) -> serde_yaml::Value {
    let mut mapping = serde_yaml::Mapping::new();
    for (key, node) in tree {
        let value = match node {
            Node::Leaf(s) => serde_yaml::Value::String(s.clone()),
            Node::Map(nested) => tree_to_value(nested),
        };
        mapping.insert(serde_yaml::Value::String(key.clone()), value);
    }
    serde_yaml::Value::Mapping(mapping)
}
