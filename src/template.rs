//! Raw templates: the resolved state of one build and its translation into
//! a Packer template.

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::OnceLock;

use crate::build::BuildDefinition;
use crate::builders::create_builder;
use crate::constants::{COMMON_BUILDER, DEFAULT_DELIMITER};
use crate::error::{PacksmithError, PacksmithResult, Section};
use crate::iso::{lookup_checksum, Distro, IsoChecksums, ReleaseIso};
use crate::post_processors::create_post_processor;
use crate::provisioners::create_provisioner;
use crate::section::{type_from_id, ComponentSection};
use crate::settings::merge_settings;
use crate::source::SourceFinder;
use crate::variables::VariableResolver;

/// A Packer template ready for JSON serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackerTemplate {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub min_packer_version: String,
    pub builders: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provisioners: Vec<Map<String, Value>>,
    #[serde(rename = "post-processors", skip_serializing_if = "Vec::is_empty")]
    pub post_processors: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, String>,
}

/// The state of one build: distro identity, layered configuration and the
/// resolved variables.
///
/// Distro defaults are long-lived values; each build works on its own copy.
#[derive(Debug, Clone)]
pub struct RawTemplate {
    pub distro: Distro,
    pub arch: String,
    pub image: String,
    pub release: String,
    /// Generation date, `YYYY-MM-DD`
    pub date: String,
    pub delim: String,
    pub build: BuildDefinition,
    /// ISO checksums from the distro's configuration
    pub iso_checksums: IsoChecksums,
    vars: VariableResolver,
    release_iso: OnceLock<ReleaseIso>,
}

impl RawTemplate {
    /// Creates an empty template for `distro` dated today.
    pub fn new(distro: Distro) -> Self {
        Self::with_delimiter(distro, DEFAULT_DELIMITER)
    }

    pub fn with_delimiter(distro: Distro, delim: &str) -> Self {
        Self {
            distro,
            arch: String::new(),
            image: String::new(),
            release: String::new(),
            date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            delim: delim.to_string(),
            build: BuildDefinition::default(),
            iso_checksums: IsoChecksums::new(),
            vars: VariableResolver::new(delim),
            release_iso: OnceLock::new(),
        }
    }

    /// Returns a copy with the non-empty parts of the identity replaced.
    pub fn with_identity(&self, arch: &str, image: &str, release: &str) -> RawTemplate {
        let mut copy = self.clone();
        if !arch.is_empty() {
            copy.arch = arch.to_string();
        }
        if !image.is_empty() {
            copy.image = image.to_string();
        }
        if !release.is_empty() {
            copy.release = release.to_string();
        }
        copy.release_iso = OnceLock::new();
        copy
    }

    /// Layers a more specific build definition on top of this template.
    pub fn update_build_settings(&self, overlay: &BuildDefinition) -> RawTemplate {
        let mut copy = self.clone();
        copy.build = self.build.merge(overlay);
        copy.vars = VariableResolver::new(self.delim.as_str());
        copy.release_iso = OnceLock::new();
        copy
    }

    pub fn build_name(&self) -> &str {
        &self.build.build_info.build_name
    }

    /// Template name, falling back to the build name.
    pub fn name(&self) -> &str {
        if self.build.build_info.name.is_empty() {
            self.build_name()
        } else {
            &self.build.build_info.name
        }
    }

    pub fn src_dir(&self) -> &str {
        &self.build.io_dirs.src_dir
    }

    pub fn out_dir(&self) -> &str {
        &self.build.io_dirs.out_dir
    }

    pub fn variables(&self) -> &VariableResolver {
        &self.vars
    }

    /// Resolves the template variables.
    ///
    /// The name is resolved first from the identity variables, then the
    /// source and output directories, which may reference the name.
    pub fn merge_variables(&mut self) {
        let mut vars = VariableResolver::new(self.delim.as_str());
        vars.insert("distro", self.distro.as_str());
        vars.insert("release", self.release.as_str());
        vars.insert("arch", self.arch.as_str());
        vars.insert("image", self.image.as_str());
        vars.insert("date", self.date.as_str());
        vars.insert("build_name", self.build_name());

        let name = vars.replace(self.name());
        vars.insert("name", name.as_str());
        self.build.build_info.name = name;

        let src_dir = vars.merge_string(&self.build.io_dirs.src_dir, "");
        let out_dir = vars.merge_string(&self.build.io_dirs.out_dir, "");
        vars.insert("out_dir", out_dir.as_str());
        vars.insert("src_dir", src_dir.as_str());
        self.build.io_dirs.src_dir = src_dir;
        self.build.io_dirs.out_dir = out_dir;

        self.vars = vars;
    }

    pub fn replace_variables(&self, s: &str) -> String {
        self.vars.replace(s)
    }

    pub fn source_finder(&self) -> SourceFinder {
        SourceFinder::new(
            self.src_dir(),
            self.distro.as_str(),
            self.release.as_str(),
            self.arch.as_str(),
            self.build_name(),
        )
    }

    /// ISO descriptor of this template's release, computed on first use.
    pub fn release_iso(&self) -> PacksmithResult<&ReleaseIso> {
        if let Some(iso) = self.release_iso.get() {
            return Ok(iso);
        }
        let iso = ReleaseIso::new(
            self.distro,
            &self.build.build_info.base_url,
            &self.release,
            &self.arch,
            &self.image,
        )?;
        debug!("ISO for {} {}: {}", self.distro, self.release, iso.url);
        Ok(self.release_iso.get_or_init(|| iso))
    }

    /// Checksum of the ISO file `file` for `checksum_type`, if the distro's
    /// table lists it.
    pub fn iso_checksum(&self, checksum_type: &str, file: &str) -> Option<&str> {
        lookup_checksum(&self.iso_checksums, checksum_type, file)
    }

    /// Path of `p` as referenced from the template.
    pub fn build_template_resource_path(&self, component: &str, p: &str) -> String {
        if self.build.build_info.includes_component_string() && !component.is_empty() {
            Path::new(component).join(p).to_string_lossy().into_owned()
        } else {
            p.to_string()
        }
    }

    /// Resolves the variables and creates the Packer template.
    ///
    /// # Errors
    /// * The first component failure; no partial template is returned
    pub fn create_packer_template(&mut self) -> PacksmithResult<PackerTemplate> {
        self.merge_variables();

        let builders = self.create_builders()?;
        let provisioners = self.create_provisioners()?;
        let post_processors = self.create_post_processors()?;

        let variables = self
            .build
            .variables
            .iter()
            .map(|(k, v)| (k.clone(), self.replace_variables(v)))
            .collect();

        Ok(PackerTemplate {
            description: self.replace_variables(&self.build.packer_info.description),
            min_packer_version: self.build.packer_info.min_packer_version.clone(),
            builders,
            provisioners,
            post_processors,
            variables,
        })
    }

    /// Creates the builder sections; the common builder's settings are the
    /// base of every concrete builder and it is never emitted itself.
    pub fn create_builders(&self) -> PacksmithResult<Vec<Map<String, Value>>> {
        if self.build.builder_ids.is_empty() {
            return Err(PacksmithError::NoComponents {
                section: Section::Builder,
            });
        }
        let common = self.build.builders.get(COMMON_BUILDER);

        let mut builders = Vec::new();
        for id in &self.build.builder_ids {
            if id == COMMON_BUILDER {
                continue;
            }
            let section = self
                .build
                .builders
                .get(id)
                .ok_or_else(|| PacksmithError::ComponentNotFound {
                    section: Section::Builder,
                    id: id.clone(),
                })?;
            let merged = match common {
                Some(common) => ComponentSection {
                    type_name: section.type_name.clone(),
                    settings: merge_settings(&common.settings, &section.settings)
                        .unwrap_or_default(),
                    arrays: section.arrays.clone(),
                },
                None => section.clone(),
            };
            let type_name = resolved_type(id, &merged);
            if let Some(builder) = create_builder(self, id, type_name, &merged)? {
                builders.push(builder);
            }
        }
        Ok(builders)
    }

    pub fn create_provisioners(&self) -> PacksmithResult<Vec<Map<String, Value>>> {
        let mut provisioners = Vec::new();
        for id in &self.build.provisioner_ids {
            let section = self.build.provisioners.get(id).ok_or_else(|| {
                PacksmithError::ComponentNotFound {
                    section: Section::Provisioner,
                    id: id.clone(),
                }
            })?;
            provisioners.push(create_provisioner(
                self,
                id,
                resolved_type(id, section),
                section,
            )?);
        }
        Ok(provisioners)
    }

    pub fn create_post_processors(&self) -> PacksmithResult<Vec<Map<String, Value>>> {
        let mut post_processors = Vec::new();
        for id in &self.build.post_processor_ids {
            let section = self.build.post_processors.get(id).ok_or_else(|| {
                PacksmithError::ComponentNotFound {
                    section: Section::PostProcessor,
                    id: id.clone(),
                }
            })?;
            post_processors.push(create_post_processor(
                self,
                id,
                resolved_type(id, section),
                section,
            )?);
        }
        Ok(post_processors)
    }
}

fn resolved_type<'a>(id: &'a str, section: &'a ComponentSection) -> &'a str {
    match section.type_name.as_deref() {
        Some(t) if !t.is_empty() => t,
        _ => type_from_id(id),
    }
}
