//! Display-name resolution from OSM name tags.

use std::collections::HashMap;

/// Name tags in priority order: local name, English, Somali
pub const NAME_KEYS: &[&str] = &["name", "name:en", "name:so"];

/// Candidates for the secondary-language name, in priority order
const ALTERNATE_KEYS: &[&str] = &["name:so", "name:en"];

fn non_empty<'a>(tags: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    tags.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// First non-empty name tag by [`NAME_KEYS`] priority
pub fn resolve_name(tags: &HashMap<String, String>) -> Option<String> {
    NAME_KEYS
        .iter()
        .find_map(|key| non_empty(tags, key))
        .map(str::to_string)
}

/// First secondary-language name present, dropped when it repeats the
/// primary name
pub fn alternate_name(tags: &HashMap<String, String>, name: Option<&str>) -> Option<String> {
    ALTERNATE_KEYS
        .iter()
        .find_map(|key| non_empty(tags, key))
        .filter(|alt| Some(*alt) != name)
        .map(str::to_string)
}
