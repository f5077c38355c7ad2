//! Locale codes and the internal/destination mapping.
//!
//! A configured `languages` entry is either a bare string (internal code
//! doubles as the destination code) or a single-entry map overriding the
//! destination. `#[serde(untagged)]` lets both shapes deserialize into one
//! type, the way the teacher's `Config` struct absorbs `messagesDir` and
//! `messagesRoot` as aliases of the same field.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One entry of the configured `languages` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocaleEntry {
    /// `fr` — internal and destination codes are identical.
    Bare(String),
    /// `{ uz_Cyrl: uz-Cyrl-UZ }` — destination code differs from the
    /// internal one used as a map key everywhere else in the engine.
    Mapped(HashMap<String, String>),
}

impl LocaleEntry {
    /// The internal code: the dictionary key used throughout the engine.
    pub fn internal(&self) -> &str {
        match self {
            LocaleEntry::Bare(code) => code,
            LocaleEntry::Mapped(map) => map
                .keys()
                .next()
                .map(String::as_str)
                .unwrap_or_default(),
        }
    }

    /// The destination code: used when rendering filenames or directories.
    pub fn destination(&self) -> &str {
        match self {
            LocaleEntry::Bare(code) => code,
            LocaleEntry::Mapped(map) => map
                .values()
                .next()
                .map(String::as_str)
                .unwrap_or_default(),
        }
    }
}

/// Forward (internal → destination) and reverse (destination → internal)
/// lookup built once at config load.
#[derive(Debug, Clone, Default)]
pub struct LocaleMap {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl LocaleMap {
    pub fn build(entries: &[LocaleEntry]) -> Self {
        let mut forward = HashMap::new();
        let mut reverse = HashMap::new();
        for entry in entries {
            forward.insert(entry.internal().to_string(), entry.destination().to_string());
            reverse.insert(entry.destination().to_string(), entry.internal().to_string());
        }
        Self { forward, reverse }
    }

    /// `destination_of(code)`: the destination code for an internal locale.
    /// Falls back to the input unchanged when the locale isn't configured.
    pub fn destination_of<'a>(&'a self, internal: &'a str) -> &'a str {
        self.forward
            .get(internal)
            .map(String::as_str)
            .unwrap_or(internal)
    }

    /// `reverse_locale_lookup`: the internal code for a destination code,
    /// or `None` if no configured locale maps to it.
    pub fn reverse_lookup(&self, destination: &str) -> Option<&str> {
        self.reverse.get(destination).map(String::as_str)
    }

    pub fn internal_codes(&self) -> impl Iterator<Item = &str> {
        self.forward.keys().map(String::as_str)
    }
}
