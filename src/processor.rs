//! Per-build pipeline: pick the distro's defaults, layer the build on top,
//! generate the Packer template and write it out.

use log::{debug, error, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::Archiver;
use crate::config::{Builds, Supported};
use crate::error::{PacksmithError, PacksmithResult};
use crate::iso::Distro;
use crate::registry::DistroDefaults;
use crate::template::{PackerTemplate, RawTemplate};

/// A request to generate one template.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildRequest {
    /// A build from the builds file
    Named(String),
    /// A distro's default template, optionally with another identity
    Distro {
        distro: Distro,
        arch: String,
        image: String,
        release: String,
    },
}

impl BuildRequest {
    /// Name used when reporting on the request.
    pub fn label(&self) -> String {
        match self {
            BuildRequest::Named(name) => name.clone(),
            BuildRequest::Distro { distro, .. } => distro.to_string(),
        }
    }
}

/// Outcome of a batch of builds.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<PacksmithError>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Generates templates for build requests against a distro defaults
/// snapshot.
pub struct Processor<'a> {
    defaults: &'a DistroDefaults,
    supported: &'a Supported,
    builds: &'a Builds,
    archiver: Option<&'a dyn Archiver>,
}

impl<'a> Processor<'a> {
    pub fn new(defaults: &'a DistroDefaults, supported: &'a Supported, builds: &'a Builds) -> Self {
        Self {
            defaults,
            supported,
            builds,
            archiver: None,
        }
    }

    /// Archive each build's prior output with `archiver` before writing.
    pub fn with_archiver(mut self, archiver: Option<&'a dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    /// Resolves a request into the raw template it generates.
    ///
    /// # Errors
    /// * `PacksmithError::ConfigError` if a named build is not defined or its
    ///   identity is not supported by its distro
    /// * `PacksmithError::UnsupportedDistro` for an unknown distro
    pub fn raw_template(&self, request: &BuildRequest) -> PacksmithResult<RawTemplate> {
        match request {
            BuildRequest::Named(name) => {
                let build = self.builds.build.get(name).ok_or_else(|| {
                    PacksmithError::ConfigError(format!("build '{}' is not defined", name))
                })?;
                let distro: Distro = build.distro.parse()?;
                self.validate(distro, &build.arch, &build.image, &build.release)?;

                let mut definition = build.definition.clone().normalize();
                definition.build_info.build_name = name.clone();

                let base = self
                    .defaults
                    .get(distro)?
                    .with_identity(&build.arch, &build.image, &build.release);
                Ok(base.update_build_settings(&definition))
            }
            BuildRequest::Distro {
                distro,
                arch,
                image,
                release,
            } => {
                self.validate(*distro, arch, image, release)?;
                let mut template = self
                    .defaults
                    .get(*distro)?
                    .with_identity(arch, image, release);
                template.build.build_info.build_name = format!(
                    "{}-{}-{}-{}",
                    distro, template.release, template.arch, template.image
                );
                Ok(template)
            }
        }
    }

    fn validate(
        &self,
        distro: Distro,
        arch: &str,
        image: &str,
        release: &str,
    ) -> PacksmithResult<()> {
        match self.supported.get(distro.as_str()) {
            Some(config) => config.validate(distro.as_str(), arch, image, release),
            None => Err(PacksmithError::UnsupportedDistro(distro.to_string())),
        }
    }

    /// Generates the template of one request without writing it.
    pub fn generate(
        &self,
        request: &BuildRequest,
    ) -> PacksmithResult<(RawTemplate, PackerTemplate)> {
        let mut template = self.raw_template(request)?;
        let packer = template.create_packer_template()?;
        Ok((template, packer))
    }

    /// Generates one template and writes it to `<out_dir>/<name>.json`.
    pub fn process(&self, request: &BuildRequest) -> PacksmithResult<PathBuf> {
        let (template, packer) = self.generate(request)?;

        // An empty out_dir means the working directory; it is never archived.
        let out_dir = PathBuf::from(template.out_dir());
        let archiver = self.archiver.filter(|_| !template.out_dir().is_empty());
        if let Some(archiver) = archiver {
            if let Some(archive) = archiver.archive(&out_dir)? {
                info!("Archived prior build to {}", archive.display());
            }
        }

        let target = out_dir.join(format!("{}.json", template.name()));
        write_template(&target, &packer)?;
        Ok(target)
    }

    /// Processes every request; a failed build is logged and the rest still
    /// run.
    pub fn process_all(&self, requests: &[BuildRequest]) -> BatchReport {
        let mut report = BatchReport::default();
        for request in requests {
            let label = request.label();
            debug!("Processing build '{}'", label);
            match self.process(request) {
                Ok(path) => report.written.push(path),
                Err(e) => {
                    let e = e.in_build(label);
                    error!("{}", e);
                    report.failed.push(e);
                }
            }
        }
        report
    }
}

fn write_template(target: &Path, template: &PackerTemplate) -> PacksmithResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(PacksmithError::IoError)?;
    }
    let json = serde_json::to_string_pretty(template)?;
    fs::write(target, json).map_err(PacksmithError::IoError)
}
