//! Component sections: the settings and named arrays configuring one
//! builder, provisioner or post-processor, plus the rules for layering them.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::settings::merge_settings;

/// Value of a named array, decided when the configuration is decoded.
///
/// Variant order matters for decoding: the first shape that fits wins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArrayValue {
    /// A single string
    String(String),
    /// An ordered list, e.g. `scripts`, `except`, `vm_settings`
    List(Vec<String>),
    /// A list of token lists, e.g. block device mappings
    Nested(Vec<Vec<String>>),
    /// A flat string map, e.g. `tags`, `vmx_data`
    Map(IndexMap<String, String>),
    /// Per-target customization keyed by builder id
    Override(IndexMap<String, ComponentSection>),
}

impl ArrayValue {
    /// True when the value carries no entries.
    pub fn is_empty(&self) -> bool {
        match self {
            ArrayValue::String(s) => s.is_empty(),
            ArrayValue::List(list) => list.is_empty(),
            ArrayValue::Nested(list) => list.is_empty(),
            ArrayValue::Map(map) => map.is_empty(),
            ArrayValue::Override(map) => map.is_empty(),
        }
    }
}

/// Configuration of one component instance.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentSection {
    /// Packer type; filled from the id when the configuration omits it
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub settings: Vec<String>,
    pub arrays: IndexMap<String, ArrayValue>,
}

impl ComponentSection {
    /// Layers `overlay` on top of `self` and returns the result.
    ///
    /// Settings merge by key. A non-empty overlay array replaces the base
    /// array of the same name, except `override`, which is merged per
    /// target. An empty overlay array leaves the base untouched.
    pub fn merge(&self, overlay: &ComponentSection) -> ComponentSection {
        let type_name = match &overlay.type_name {
            Some(t) if !t.is_empty() => Some(t.clone()),
            _ => self.type_name.clone(),
        };

        let settings = merge_settings(&self.settings, &overlay.settings).unwrap_or_default();

        let mut arrays = self.arrays.clone();
        for (name, value) in &overlay.arrays {
            if value.is_empty() {
                continue;
            }
            let merged = match (arrays.get(name), value) {
                (Some(ArrayValue::Override(base)), ArrayValue::Override(over)) => {
                    ArrayValue::Override(merge_overrides(base, over))
                }
                _ => value.clone(),
            };
            arrays.insert(name.clone(), merged);
        }

        ComponentSection {
            type_name,
            settings,
            arrays,
        }
    }

    /// Returns the named array, if configured.
    pub fn array(&self, name: &str) -> Option<&ArrayValue> {
        self.arrays.get(name)
    }
}

/// Deep-merges two override maps target by target.
fn merge_overrides(
    base: &IndexMap<String, ComponentSection>,
    overlay: &IndexMap<String, ComponentSection>,
) -> IndexMap<String, ComponentSection> {
    let mut merged = base.clone();
    for (target, section) in overlay {
        let value = match base.get(target) {
            Some(existing) => existing.merge(section),
            None => section.clone(),
        };
        merged.insert(target.clone(), value);
    }
    merged
}

/// Merges two id-keyed component maps; ids present on one side survive.
pub fn merge_sections(
    base: &IndexMap<String, ComponentSection>,
    overlay: &IndexMap<String, ComponentSection>,
) -> IndexMap<String, ComponentSection> {
    merge_overrides(base, overlay)
}

/// Strips trailing instance digits from a component id, e.g. `openstack2`.
pub fn type_from_id(id: &str) -> &str {
    id.trim_end_matches(|c: char| c.is_ascii_digit())
}
