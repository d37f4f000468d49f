//! Distro defaults: one base template per supported distro, computed once
//! from the application defaults and the distro's own settings.

use indexmap::IndexMap;
use log::debug;

use crate::build::BuildDefinition;
use crate::config::Supported;
use crate::error::{PacksmithError, PacksmithResult};
use crate::iso::Distro;
use crate::template::RawTemplate;

/// Immutable snapshot of every supported distro's default template.
///
/// Builds receive copies; the snapshot itself is never modified.
#[derive(Debug, Clone)]
pub struct DistroDefaults {
    templates: IndexMap<Distro, RawTemplate>,
}

impl DistroDefaults {
    /// Builds the default template of each supported distro.
    ///
    /// # Arguments
    /// * `defaults` - Application defaults layer
    /// * `supported` - Supported distros and their settings
    /// * `delim` - Variable delimiter
    ///
    /// # Errors
    /// * `PacksmithError::UnsupportedDistro` for an unknown distro name
    /// * `PacksmithError::ConfigError` if a distro that needs one has no `base_url`
    pub fn new(
        defaults: &BuildDefinition,
        supported: &Supported,
        delim: &str,
    ) -> PacksmithResult<Self> {
        let defaults = defaults.clone().normalize();
        let mut templates = IndexMap::new();

        for (name, config) in &supported.distro {
            let distro: Distro = name.parse()?;
            let definition = config.definition.clone().normalize();

            let mut template = RawTemplate::with_delimiter(distro, delim);
            template.build = defaults.merge(&definition);
            if distro.requires_base_url() && template.build.build_info.base_url.is_empty() {
                return Err(PacksmithError::ConfigError(format!(
                    "{}: base_url is required",
                    distro
                )));
            }

            let image = config.default_image();
            template.arch = image.arch;
            template.image = image.image;
            template.release = image.release;
            template.iso_checksums = config.iso_checksums.clone();

            debug!(
                "{} defaults: {} {} {}",
                distro, template.release, template.arch, template.image
            );
            templates.insert(distro, template);
        }

        Ok(Self { templates })
    }

    /// Returns a copy of the distro's default template.
    pub fn get(&self, distro: Distro) -> PacksmithResult<RawTemplate> {
        self.templates
            .get(&distro)
            .cloned()
            .ok_or_else(|| PacksmithError::UnsupportedDistro(distro.to_string()))
    }

    pub fn distros(&self) -> impl Iterator<Item = Distro> + '_ {
        self.templates.keys().copied()
    }
}
