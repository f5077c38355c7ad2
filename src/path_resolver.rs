//! Path Resolver: source path to destination path for a target locale.
//!
//! Grounded on `path_utils.py`. Two entry points: [`resolve_destination`]
//! handles the explicit `source_files` destination template (substitutes
//! the `%algebras_locale_code%` placeholder), while [`derive_target_path`]
//! covers every source file the config doesn't name explicitly, applying
//! the same directory/filename heuristics the original tries in order.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;

pub const LOCALE_PLACEHOLDER: &str = "%algebras_locale_code%";

/// Substitute every occurrence of the locale placeholder in an explicit
/// `source_files` destination template with the target's destination code.
pub fn resolve_destination(pattern: &str, locale: &str, config: &Config) -> PathBuf {
    let destination_code = config.locale_map().destination_of(locale);
    PathBuf::from(pattern.replace(LOCALE_PLACEHOLDER, destination_code))
}

static LOCALE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(values|lang|locales?|i18n|l10n)-?([A-Za-z]{2}(?:[-_][A-Za-z0-9]+)*)$").unwrap());

/// `derive_target_path`: no explicit destination template exists for this
/// source file, so infer where the target-locale copy belongs from the
/// source path itself. Tries, in order:
///
/// 1. Android `values/` directory -> `values-<code>/`.
/// 2. A path segment that is exactly the source locale code -> replaced
///    with the target code (`locales/en/app.json` -> `locales/fr/app.json`).
/// 3. A path segment prefixed with the source locale
///    (`strings-en/app.json` -> `strings-fr/app.json`).
/// 4. A locale marker in the filename itself
///    (`messages_en.properties` -> `messages_fr.properties`,
///    `en.lproj/Localizable.strings` -> `fr.lproj/Localizable.strings`).
/// 5. Fallback: append `.<target>` before the extension, unless the file
///    already sits in a locale-specific directory (cases 1-3 would have
///    matched) in which case appending would duplicate the locale marker.
pub fn derive_target_path(source_path: &Path, source_locale: &str, target_locale: &str, config: &Config) -> PathBuf {
    let destination_code = config.locale_map().destination_of(target_locale);

    if let Some(path) = android_values_dir(source_path, destination_code) {
        return path;
    }
    if let Some(path) = locale_segment_in_path(source_path, source_locale, destination_code) {
        return path;
    }
    if let Some(path) = locale_prefixed_segment(source_path, source_locale, destination_code) {
        return path;
    }
    if let Some(path) = locale_marker_in_filename(source_path, source_locale, destination_code) {
        return path;
    }
    fallback_append(source_path, destination_code)
}

fn android_values_dir(source_path: &Path, destination_code: &str) -> Option<PathBuf> {
    let parent = source_path.parent()?;
    let dir_name = parent.file_name()?.to_str()?;
    if dir_name != "values" {
        return None;
    }
    let new_dir = parent.with_file_name(format!("values-{destination_code}"));
    Some(new_dir.join(source_path.file_name()?))
}

fn locale_segment_in_path(source_path: &Path, source_locale: &str, destination_code: &str) -> Option<PathBuf> {
    let mut replaced = false;
    let components: Vec<String> = source_path
        .components()
        .map(|c| {
            let s = c.as_os_str().to_string_lossy();
            if !replaced && s == source_locale {
                replaced = true;
                destination_code.to_string()
            } else {
                s.to_string()
            }
        })
        .collect();
    replaced.then(|| PathBuf::from_iter(components))
}

fn locale_prefixed_segment(source_path: &Path, source_locale: &str, destination_code: &str) -> Option<PathBuf> {
    let mut replaced = false;
    let components: Vec<String> = source_path
        .components()
        .map(|c| {
            let s = c.as_os_str().to_string_lossy();
            if !replaced {
                if let Some(caps) = LOCALE_SEGMENT.captures(&s) {
                    if caps.get(2).map(|m| m.as_str()) == Some(source_locale) {
                        replaced = true;
                        return format!("{}-{}", &caps[1], destination_code);
                    }
                }
            }
            s.to_string()
        })
        .collect();
    replaced.then(|| PathBuf::from_iter(components))
}

fn locale_marker_in_filename(source_path: &Path, source_locale: &str, destination_code: &str) -> Option<PathBuf> {
    let file_name = source_path.file_name()?.to_str()?;
    if !file_name.contains(source_locale) {
        return None;
    }
    // Replace the first whole-token occurrence of the source locale (bounded
    // by start/end or non-alphanumeric characters) so "en" doesn't clobber
    // "length" or similar.
    let re = Regex::new(&format!(r"(?:^|[^A-Za-z0-9]){}(?:$|[^A-Za-z0-9])", regex::escape(source_locale))).ok()?;
    let m = re.find(file_name)?;
    let matched = m.as_str();
    let locale_start = m.start() + matched.find(source_locale)?;
    let locale_end = locale_start + source_locale.len();
    let new_name = format!("{}{}{}", &file_name[..locale_start], destination_code, &file_name[locale_end..]);
    Some(source_path.with_file_name(new_name))
}

fn fallback_append(source_path: &Path, destination_code: &str) -> PathBuf {
    match (source_path.file_stem(), source_path.extension()) {
        (Some(stem), Some(ext)) => {
            let new_name = format!("{}.{}.{}", stem.to_string_lossy(), destination_code, ext.to_string_lossy());
            source_path.with_file_name(new_name)
        }
        (Some(stem), None) => {
            let new_name = format!("{}.{}", stem.to_string_lossy(), destination_code);
            source_path.with_file_name(new_name)
        }
        _ => source_path.to_path_buf(),
    }
}

/// `reverse_locale_lookup`: classify a file sitting in a destination-coded
/// directory or filename (`values-fr/`, `fr.lproj/`) back to the internal
/// locale code the engine uses as its map key.
pub fn reverse_locale_lookup(destination_code: &str, config: &Config) -> Option<String> {
    config.locale_map().reverse_lookup(destination_code).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::LocaleEntry;

    fn config_with_languages(codes: &[&str]) -> Config {
        Config {
            languages: codes.iter().map(|c| LocaleEntry::Bare(c.to_string())).collect(),
            ..Config::default()
        }
    }

    #[test]
    fn resolve_destination_substitutes_placeholder() {
        let config = config_with_languages(&["en", "fr"]);
        let path = resolve_destination("locales/%algebras_locale_code%/app.json", "fr", &config);
        assert_eq!(path, PathBuf::from("locales/fr/app.json"));
    }

    #[test]
    fn android_values_directory_gets_locale_suffix() {
        let config = config_with_languages(&["en", "fr"]);
        let source = Path::new("app/src/main/res/values/strings.xml");
        let target = derive_target_path(source, "en", "fr", &config);
        assert_eq!(target, PathBuf::from("app/src/main/res/values-fr/strings.xml"));
    }

    #[test]
    fn locale_segment_in_path_is_replaced() {
        let config = config_with_languages(&["en", "fr"]);
        let source = Path::new("locales/en/app.json");
        let target = derive_target_path(source, "en", "fr", &config);
        assert_eq!(target, PathBuf::from("locales/fr/app.json"));
    }

    #[test]
    fn locale_prefixed_segment_is_replaced() {
        let config = config_with_languages(&["en", "fr"]);
        let source = Path::new("strings-en/app.json");
        let target = derive_target_path(source, "en", "fr", &config);
        assert_eq!(target, PathBuf::from("strings-fr/app.json"));
    }

    #[test]
    fn locale_marker_in_filename_is_replaced() {
        let config = config_with_languages(&["en", "fr"]);
        let source = Path::new("messages_en.properties");
        let target = derive_target_path(source, "en", "fr", &config);
        assert_eq!(target, PathBuf::from("messages_fr.properties"));
    }

    #[test]
    fn ios_lproj_directory_is_replaced() {
        let config = config_with_languages(&["en", "fr"]);
        let source = Path::new("en.lproj/Localizable.strings");
        let target = derive_target_path(source, "en", "fr", &config);
        assert_eq!(target, PathBuf::from("fr.lproj/Localizable.strings"));
    }

    #[test]
    fn fallback_appends_locale_before_extension() {
        let config = config_with_languages(&["en", "fr"]);
        let source = Path::new("app/content.html");
        let target = derive_target_path(source, "en", "fr", &config);
        assert_eq!(target, PathBuf::from("app/content.fr.html"));
    }

    #[test]
    fn reverse_lookup_maps_destination_back_to_internal() {
        let mut config = config_with_languages(&["en"]);
        let mut map = std::collections::HashMap::new();
        map.insert("uz_Cyrl".to_string(), "uz-Cyrl-UZ".to_string());
        config.languages.push(LocaleEntry::Mapped(map));

        assert_eq!(reverse_locale_lookup("uz-Cyrl-UZ", &config), Some("uz_Cyrl".to_string()));
        assert_eq!(reverse_locale_lookup("xx", &config), None);
    }
}
