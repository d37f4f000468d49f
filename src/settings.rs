//! `key=value` settings: parsing and order-preserving merge.

use indexmap::IndexMap;

/// Splits a setting on its first `=` into a trimmed key and value.
///
/// The value may itself contain `=`. A string without `=` is all key and an
/// empty string yields an empty key and value.
///
/// # Arguments
/// * `setting` - Setting string such as `boot_wait = 5s`
///
/// # Returns
/// * `(&str, &str)` - The key and the value
pub fn parse_var(setting: &str) -> (&str, &str) {
    match setting.split_once('=') {
        Some((key, value)) => (key.trim(), value.trim()),
        None => (setting.trim(), ""),
    }
}

/// Merges two ordered settings lists by key.
///
/// Overlay entries whose key exists in `base` replace the base entry in
/// place; the rest are appended in overlay order. A key repeated inside the
/// overlay keeps its last value. Neither input is modified.
///
/// # Arguments
/// * `base` - Settings of the less specific layer
/// * `overlay` - Settings of the more specific layer
///
/// # Returns
/// * `None` when both lists are empty, the merged list otherwise
pub fn merge_settings(base: &[String], overlay: &[String]) -> Option<Vec<String>> {
    if base.is_empty() && overlay.is_empty() {
        return None;
    }

    let mut merged: Vec<String> = Vec::with_capacity(base.len() + overlay.len());
    let mut positions: IndexMap<String, usize> = IndexMap::new();

    for setting in base.iter().chain(overlay.iter()) {
        let (key, _) = parse_var(setting);
        match positions.get(key) {
            Some(&index) => merged[index] = setting.clone(),
            None => {
                positions.insert(key.to_string(), merged.len());
                merged.push(setting.clone());
            }
        }
    }

    Some(merged)
}

/// Collects settings into an ordered map of key to value; later keys win.
pub fn settings_to_map(settings: &[String]) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    for setting in settings {
        let (key, value) = parse_var(setting);
        if key.is_empty() {
            continue;
        }
        map.insert(key.to_string(), value.to_string());
    }
    map
}
