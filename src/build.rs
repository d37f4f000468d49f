//! Build definitions: one layer of the defaults hierarchy and the rules for
//! stacking a more specific layer on top of a less specific one.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::section::{merge_sections, type_from_id, ComponentSection};

/// Normalizes a directory to end in exactly one `/`; empty stays empty.
pub fn append_slash(dir: &str) -> String {
    if dir.is_empty() {
        return String::new();
    }
    format!("{}/", dir.trim_end_matches('/'))
}

fn pick(base: &str, overlay: &str) -> String {
    if overlay.is_empty() {
        base.to_string()
    } else {
        overlay.to_string()
    }
}

fn pick_dir(base: &str, overlay: &str) -> String {
    if overlay.is_empty() {
        base.to_string()
    } else {
        append_slash(overlay)
    }
}

/// Packer-level template information.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PackerInf {
    pub min_packer_version: String,
    pub description: String,
}

impl PackerInf {
    pub fn update(&self, overlay: &PackerInf) -> PackerInf {
        PackerInf {
            min_packer_version: pick(&self.min_packer_version, &overlay.min_packer_version),
            description: pick(&self.description, &overlay.description),
        }
    }
}

/// Identity of the build being generated.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildInf {
    /// Template name; may reference variables
    pub name: String,
    pub build_name: String,
    pub base_url: String,
    /// Prefix resource paths with the owning component id
    pub include_component_string: Option<bool>,
}

impl BuildInf {
    pub fn update(&self, overlay: &BuildInf) -> BuildInf {
        BuildInf {
            name: pick(&self.name, &overlay.name),
            build_name: pick(&self.build_name, &overlay.build_name),
            base_url: pick_dir(&self.base_url, &overlay.base_url),
            include_component_string: overlay
                .include_component_string
                .or(self.include_component_string),
        }
    }

    pub fn includes_component_string(&self) -> bool {
        self.include_component_string.unwrap_or(false)
    }
}

/// Source and output directory layout.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IODirInf {
    pub commands_src_dir: String,
    pub http_dir: String,
    pub http_src_dir: String,
    pub out_dir: String,
    pub scripts_dir: String,
    pub scripts_src_dir: String,
    pub src_dir: String,
}

impl IODirInf {
    pub fn update(&self, overlay: &IODirInf) -> IODirInf {
        IODirInf {
            commands_src_dir: pick_dir(&self.commands_src_dir, &overlay.commands_src_dir),
            http_dir: pick_dir(&self.http_dir, &overlay.http_dir),
            http_src_dir: pick_dir(&self.http_src_dir, &overlay.http_src_dir),
            out_dir: pick_dir(&self.out_dir, &overlay.out_dir),
            scripts_dir: pick_dir(&self.scripts_dir, &overlay.scripts_dir),
            scripts_src_dir: pick_dir(&self.scripts_src_dir, &overlay.scripts_src_dir),
            src_dir: pick_dir(&self.src_dir, &overlay.src_dir),
        }
    }
}

/// One layer of build configuration: application defaults, a distro's
/// defaults or a user build.
///
/// Component maps may configure more ids than the id lists emit; only listed
/// ids reach the generated template.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildDefinition {
    pub packer_info: PackerInf,
    pub build_info: BuildInf,
    pub io_dirs: IODirInf,
    pub builder_ids: Vec<String>,
    pub provisioner_ids: Vec<String>,
    pub post_processor_ids: Vec<String>,
    pub builders: IndexMap<String, ComponentSection>,
    pub provisioners: IndexMap<String, ComponentSection>,
    pub post_processors: IndexMap<String, ComponentSection>,
    /// User variables emitted in the template's `variables` section
    pub variables: IndexMap<String, String>,
}

impl BuildDefinition {
    /// Stacks `overlay` on top of `self` and returns the effective layer.
    ///
    /// A non-empty id list in the overlay replaces the base list. Ids that
    /// reference no configuration are reported when the template is
    /// generated, not here.
    pub fn merge(&self, overlay: &BuildDefinition) -> BuildDefinition {
        let mut variables = self.variables.clone();
        for (name, value) in &overlay.variables {
            variables.insert(name.clone(), value.clone());
        }

        BuildDefinition {
            packer_info: self.packer_info.update(&overlay.packer_info),
            build_info: self.build_info.update(&overlay.build_info),
            io_dirs: self.io_dirs.update(&overlay.io_dirs),
            builder_ids: replace_ids(&self.builder_ids, &overlay.builder_ids),
            provisioner_ids: replace_ids(&self.provisioner_ids, &overlay.provisioner_ids),
            post_processor_ids: replace_ids(&self.post_processor_ids, &overlay.post_processor_ids),
            builders: merge_sections(&self.builders, &overlay.builders),
            provisioners: merge_sections(&self.provisioners, &overlay.provisioners),
            post_processors: merge_sections(&self.post_processors, &overlay.post_processors),
            variables,
        }
    }

    /// Fills in the type of every section that does not name one, using its
    /// id without trailing instance digits. Directory fields are normalized.
    pub fn normalize(mut self) -> BuildDefinition {
        for map in [
            &mut self.builders,
            &mut self.provisioners,
            &mut self.post_processors,
        ] {
            for (id, section) in map.iter_mut() {
                if section.type_name.as_deref().map_or(true, str::is_empty) {
                    section.type_name = Some(type_from_id(id).to_string());
                }
            }
        }
        self.io_dirs = IODirInf::default().update(&self.io_dirs);
        self.build_info = BuildInf::default().update(&self.build_info);
        self
    }
}

fn replace_ids(base: &[String], overlay: &[String]) -> Vec<String> {
    if overlay.is_empty() {
        base.to_vec()
    } else {
        overlay.to_vec()
    }
}
