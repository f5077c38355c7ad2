//! iOS `.stringsdict` handler: the Apple plist pluralization dictionary,
//! full regeneration only.
//!
//! Not part of the upstream tool (it only ships flat `.strings` support);
//! added because a complete iOS localization pipeline needs plural rules.
//! Grounded on the Apple plist shape itself and on this registry's own
//! `android_xml` plurals modeling (quantity keys under a nested map),
//! using `quick-xml` the way `android_xml` does.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use quick_xml::events::{BytesText, Event};
use quick_xml::reader::Reader;

use crate::resource_map::{KeySet, Node, OriginalForm, ResourceMap};

use super::FormatHandler;

const PLURAL_QUANTITIES: [&str; 6] = ["zero", "one", "two", "few", "many", "other"];

#[derive(Debug, Clone)]
pub struct StringsDictEntryMeta {
    pub format_key: String,
    pub variable_name: String,
    pub value_type: String,
}

#[derive(Debug, Clone)]
pub struct StringsDictOriginal {
    pub entries: IndexMap<String, StringsDictEntryMeta>,
}

pub struct StringsDictHandler;

impl FormatHandler for StringsDictHandler {
    fn name(&self) -> &'static str {
        "stringsdict"
    }

    fn read(&self, path: &Path) -> Result<ResourceMap> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read .stringsdict file: {}", path.display()))?;
        let (tree, meta) = parse_stringsdict(&raw, path)?;

        Ok(ResourceMap {
            tree,
            original: Some(OriginalForm::StringsDict(StringsDictOriginal { entries: meta })),
        })
    }

    fn write_full(&self, path: &Path, map: &ResourceMap) -> Result<()> {
        let meta = match &map.original {
            Some(OriginalForm::StringsDict(orig)) => orig.entries.clone(),
            _ => IndexMap::new(),
        };

        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(
            "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n",
        );
        out.push_str("<plist version=\"1.0\">\n<dict>\n");

        for (key, node) in &map.tree {
            let Node::Map(quantities) = node else { continue };
            let default_meta = StringsDictEntryMeta {
                format_key: "%#@value@".to_string(),
                variable_name: "value".to_string(),
                value_type: "d".to_string(),
            };
            let entry_meta = meta.get(key).unwrap_or(&default_meta);

            out.push_str(&format!("    <key>{}</key>\n", xml_escape(key)));
            out.push_str("    <dict>\n");
            out.push_str("        <key>NSStringLocalizedFormatKey</key>\n");
            out.push_str(&format!(
                "        <string>{}</string>\n",
                xml_escape(&entry_meta.format_key)
            ));
            out.push_str(&format!("        <key>{}</key>\n", xml_escape(&entry_meta.variable_name)));
            out.push_str("        <dict>\n");
            out.push_str("            <key>NSStringFormatSpecTypeKey</key>\n");
            out.push_str("            <string>NSStringPluralRuleType</string>\n");
            out.push_str("            <key>NSStringFormatValueTypeKey</key>\n");
            out.push_str(&format!(
                "            <string>{}</string>\n",
                xml_escape(&entry_meta.value_type)
            ));
            for quantity in PLURAL_QUANTITIES {
                if let Some(Node::Leaf(value)) = quantities.get(quantity) {
                    out.push_str(&format!("            <key>{quantity}</key>\n"));
                    out.push_str(&format!("            <string>{}</string>\n", xml_escape(value)));
                }
            }
            out.push_str("        </dict>\n");
            out.push_str("    </dict>\n");
        }

        out.push_str("</dict>\n</plist>\n");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(path, out)
            .with_context(|| format!("Failed to write .stringsdict file: {}", path.display()))?;
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

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn parse_stringsdict(
    raw: &str,
    path: &Path,
) -> Result<(IndexMap<String, Node>, IndexMap<String, StringsDictEntryMeta>)> {
    let mut reader = Reader::from_str(raw);
    let mut tree = IndexMap::new();
    let mut meta = IndexMap::new();

    // Top-level: <plist><dict> (<key>NAME</key> <dict> ... </dict>)*
    loop {
        match reader
            .read_event()
            .with_context(|| format!("Invalid plist XML in {}", path.display()))?
        {
            Event::Start(tag) if tag.name().as_ref() == b"key" => {
                let entry_name = read_text_until(&mut reader, b"key")?;
                expect_start(&mut reader, b"dict")?;
                let (quantities, entry_meta) = parse_entry_dict(&mut reader)?;
                let mut nested = IndexMap::new();
                for (quantity, text) in quantities {
                    nested.insert(quantity, Node::Leaf(text));
                }
                tree.insert(entry_name.clone(), Node::Map(nested));
                meta.insert(entry_name, entry_meta);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if tree.is_empty() {
        bail!("No stringsdict entries found in {}", path.display());
    }

    Ok((tree, meta))
}

fn parse_entry_dict(reader: &mut Reader<&[u8]>) -> Result<(Vec<(String, String)>, StringsDictEntryMeta)> {
    let mut format_key = String::new();
    let mut variable_name = String::new();
    let mut value_type = "d".to_string();
    let mut quantities = Vec::new();
    let mut depth = 1;

    while depth > 0 {
        match reader.read_event()? {
            Event::Start(tag) if tag.name().as_ref() == b"dict" => depth += 1,
            Event::End(tag) if tag.name().as_ref() == b"dict" => depth -= 1,
            Event::Start(tag) if tag.name().as_ref() == b"key" => {
                let key = read_text_until(reader, b"key")?;
                match key.as_str() {
                    "NSStringLocalizedFormatKey" => {
                        format_key = read_next_string(reader)?;
                    }
                    "NSStringFormatSpecTypeKey" => {
                        let _ = read_next_string(reader)?;
                    }
                    "NSStringFormatValueTypeKey" => {
                        value_type = read_next_string(reader)?;
                    }
                    quantity if PLURAL_QUANTITIES.contains(&quantity) => {
                        let text = read_next_string(reader)?;
                        quantities.push((quantity.to_string(), text));
                    }
                    other if depth == 1 && variable_name.is_empty() => {
                        variable_name = other.to_string();
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((
        quantities,
        StringsDictEntryMeta {
            format_key,
            variable_name,
            value_type,
        },
    ))
}

fn expect_start(reader: &mut Reader<&[u8]>, name: &[u8]) -> Result<()> {
    loop {
        match reader.read_event()? {
            Event::Start(tag) if tag.name().as_ref() == name => return Ok(()),
            Event::Eof => bail!("expected <{}>", std::str::from_utf8(name)?),
            _ => {}
        }
    }
}

fn read_text_until(reader: &mut Reader<&[u8]>, end_tag: &[u8]) -> Result<String> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&decode_text(&t)?),
            Event::End(tag) if tag.name().as_ref() == end_tag => break,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text.trim().to_string())
}

fn read_next_string(reader: &mut Reader<&[u8]>) -> Result<String> {
    loop {
        match reader.read_event()? {
            Event::Start(tag) if tag.name().as_ref() == b"string" => {
                return read_text_until(reader, b"string");
            }
            Event::Empty(tag) if tag.name().as_ref() == b"string" => return Ok(String::new()),
            Event::Eof => bail!("expected <string> value"),
            _ => {}
        }
    }
}

fn decode_text(t: &BytesText<'_>) -> Result<String> {
    Ok(t.unescape()?.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<dict>
    <key>items_count</key>
    <dict>
        <key>NSStringLocalizedFormatKey</key>
        <string>%#@value@</string>
        <key>value</key>
        <dict>
            <key>NSStringFormatSpecTypeKey</key>
            <string>NSStringPluralRuleType</string>
            <key>NSStringFormatValueTypeKey</key>
            <string>d</string>
            <key>one</key>
            <string>%d item</string>
            <key>other</key>
            <string>%d items</string>
        </dict>
    </dict>
</dict>
</plist>
"#;

    #[test]
    fn reads_plural_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Localizable.stringsdict");
        fs::write(&path, SAMPLE).unwrap();

        let map = StringsDictHandler.read(&path).unwrap();
        let flat = map.flatten();
        assert_eq!(flat.get("items_count.one"), Some("%d item"));
        assert_eq!(flat.get("items_count.other"), Some("%d items"));
    }

    #[test]
    fn write_full_round_trips_format_key_and_value_type() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Localizable.stringsdict");
        fs::write(&path, SAMPLE).unwrap();

        let map = StringsDictHandler.read(&path).unwrap();
        StringsDictHandler.write_full(&path, &map).unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert!(out.contains("%#@value@"));
        assert!(out.contains("NSStringPluralRuleType"));
        assert!(out.contains("%d item</string>"));
    }

    #[test]
    fn stringsdict_has_no_in_place_support() {
        assert!(!StringsDictHandler.supports_in_place());
    }
}
