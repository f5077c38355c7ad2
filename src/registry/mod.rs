//! Format Registry — per-format read/write/in-place/flatten handlers.
//!
//! Each format registers a value implementing [`FormatHandler`]; the
//! Orchestrator looks the handler up by file extension through
//! [`handler_for`]. This is a dispatch table keyed by extension pointing at
//! trait objects, the way the teacher dispatches on its `CheckRule`/
//! `CleanRule` enums — there is no inheritance hierarchy to climb.
//!
//! ## Module Structure
//!
//! - `json`: nested, in-place capable, indentation/newline preserving
//! - `yaml`: nested, full regeneration only
//! - `typescript`: `export const x = {...}` object literal
//! - `android_xml`: `<resources>` strings and plurals, in-place capable
//! - `ios_strings`: flat `"key" = "value";`, in-place capable
//! - `stringsdict`: plist pluralization dict, full regeneration only
//! - `po`: gettext catalog, in-place capable
//! - `xliff`: trans-units, in-place capable
//! - `html`: DOM text-node extraction, full regeneration only
//! - `csv`: key + one column per locale, in-place capable
//! - `properties`: Java `key=value`, in-place capable

pub mod android_xml;
pub mod csv;
pub mod html;
pub mod ios_strings;
pub mod json;
pub mod po;
pub mod properties;
pub mod stringsdict;
pub mod typescript;
pub mod xliff;
pub mod yaml;

use std::path::Path;

use anyhow::Result;

use crate::config::Config;
use crate::resource_map::{KeySet, ResourceMap};

/// Capability set a format handler must provide. `write_in_place` is
/// optional; formats without a meaningful in-place story fall back to
/// `write_full` at the Orchestrator's writer-selection step (§4.5).
///
/// Most handlers have no config-dependent knob and never override the
/// `_configured` variants; Android XML's `api.normalize_strings` is
/// currently the only format whose output shape depends on `Config`, so
/// the config-aware path is opt-in rather than a mandatory parameter on
/// every handler.
pub trait FormatHandler: Send + Sync {
    /// Short name used in error messages and the run summary.
    fn name(&self) -> &'static str;

    fn read(&self, path: &Path) -> Result<ResourceMap>;

    fn write_full(&self, path: &Path, map: &ResourceMap) -> Result<()>;

    /// Config-aware variant of `write_full`. Defaults to ignoring
    /// `config` and deferring to `write_full`; override when the
    /// format's output depends on a config knob.
    fn write_full_configured(&self, path: &Path, map: &ResourceMap, _config: &Config) -> Result<()> {
        self.write_full(path, map)
    }

    /// `None` means the format has no in-place capability; the
    /// Orchestrator falls back to `write_full`.
    fn write_in_place(
        &self,
        _path: &Path,
        _map: &ResourceMap,
        _keys_to_update: &KeySet,
    ) -> Option<Result<()>> {
        None
    }

    /// Config-aware variant of `write_in_place`, analogous to
    /// `write_full_configured`.
    fn write_in_place_configured(
        &self,
        path: &Path,
        map: &ResourceMap,
        keys_to_update: &KeySet,
        _config: &Config,
    ) -> Option<Result<()>> {
        self.write_in_place(path, map, keys_to_update)
    }

    fn supports_in_place(&self) -> bool {
        false
    }
}

/// Look up the handler for a path by its extension. Returns `None` for
/// unrecognized extensions, which the caller treats as "not a resource
/// file" rather than a `FormatError`.
pub fn handler_for(path: &Path) -> Option<&'static dyn FormatHandler> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "json" => &json::JsonHandler,
        "yaml" | "yml" => &yaml::YamlHandler,
        "ts" => &typescript::TypeScriptHandler,
        "xml" => &android_xml::AndroidXmlHandler,
        "strings" => &ios_strings::IosStringsHandler,
        "stringsdict" => &stringsdict::StringsDictHandler,
        "po" => &po::PoHandler,
        "xlf" | "xliff" => &xliff::XliffHandler,
        "html" | "htm" => &html::HtmlHandler,
        "csv" => &csv::CsvHandler { delimiter: b',' },
        "tsv" => &csv::CsvHandler { delimiter: b'\t' },
        "properties" => &properties::PropertiesHandler,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_for_dispatches_by_extension() {
        assert_eq!(handler_for(Path::new("en.json")).unwrap().name(), "json");
        assert_eq!(handler_for(Path::new("en.yaml")).unwrap().name(), "yaml");
        assert_eq!(handler_for(Path::new("en.yml")).unwrap().name(), "yaml");
        assert_eq!(handler_for(Path::new("en.ts")).unwrap().name(), "typescript");
        assert_eq!(
            handler_for(Path::new("values/strings.xml")).unwrap().name(),
            "android_xml"
        );
        assert_eq!(
            handler_for(Path::new("en.lproj/Localizable.strings"))
                .unwrap()
                .name(),
            "ios_strings"
        );
        assert_eq!(handler_for(Path::new("en.po")).unwrap().name(), "po");
        assert_eq!(handler_for(Path::new("en.xlf")).unwrap().name(), "xliff");
        assert_eq!(handler_for(Path::new("index.html")).unwrap().name(), "html");
        assert_eq!(handler_for(Path::new("strings.csv")).unwrap().name(), "csv");
        assert_eq!(handler_for(Path::new("strings.tsv")).unwrap().name(), "csv");
        assert_eq!(
            handler_for(Path::new("messages.properties")).unwrap().name(),
            "properties"
        );
        assert!(handler_for(Path::new("readme.md")).is_none());
    }
}
