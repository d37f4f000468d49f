//! Lookup of source files (scripts, command files, cookbooks) inside the
//! configured source directory, honouring distro, release, arch and build
//! specific overrides.

use log::trace;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::constants::{COMMANDS_DIR, COMMAND_FILE_SUFFIX};
use crate::error::{PacksmithError, PacksmithResult};

/// Returns true when `value` names a command file, e.g. `shutdown.command`.
pub fn is_command_filename(value: &str) -> bool {
    match value.strip_suffix(COMMAND_FILE_SUFFIX) {
        Some(stem) => !stem.is_empty(),
        None => false,
    }
}

/// Builds a single command from command file lines.
///
/// Lines are trimmed; a line ending in `\` continues onto the next one and
/// the first line without it ends the command. Parts are joined with one
/// space.
pub fn command_from_slice(lines: &[String]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for line in lines {
        let line = line.trim();
        match line.strip_suffix('\\') {
            Some(continued) => {
                let continued = continued.trim();
                if !continued.is_empty() {
                    parts.push(continued.to_string());
                }
            }
            None => {
                if !line.is_empty() {
                    parts.push(line.to_string());
                }
                break;
            }
        }
    }
    parts.join(" ")
}

/// Locates files for one build within its source directory.
#[derive(Debug, Clone)]
pub struct SourceFinder {
    src_dir: PathBuf,
    distro: String,
    release: String,
    arch: String,
    build_name: String,
}

impl SourceFinder {
    pub fn new(
        src_dir: impl Into<PathBuf>,
        distro: impl Into<String>,
        release: impl Into<String>,
        arch: impl Into<String>,
        build_name: impl Into<String>,
    ) -> Self {
        Self {
            src_dir: src_dir.into(),
            distro: distro.into(),
            release: release.into(),
            arch: arch.into(),
            build_name: build_name.into(),
        }
    }

    /// Candidate locations of `p`, most specific first.
    ///
    /// A release such as `14.04` is also tried as `1404` and as its base
    /// `14`.
    pub fn candidates(&self, p: &str) -> Vec<PathBuf> {
        let src = self.src_dir.as_path();
        let distro = src.join(&self.distro);

        let mut releases: Vec<String> = Vec::new();
        if !self.release.is_empty() {
            releases.push(self.release.clone());
            let no_dots = self.release.replace('.', "");
            if no_dots != self.release {
                releases.push(no_dots);
            }
            if let Some((base, _)) = self.release.split_once('.') {
                if !base.is_empty() && !releases.iter().any(|r| r == base) {
                    releases.push(base.to_string());
                }
            }
        }

        let mut dirs: Vec<PathBuf> = Vec::new();
        if !self.build_name.is_empty() {
            for release in &releases {
                dirs.push(distro.join(release).join(&self.build_name));
            }
            dirs.push(distro.join(&self.build_name));
            dirs.push(src.join(&self.build_name));
        }
        if !self.arch.is_empty() {
            for release in &releases {
                dirs.push(distro.join(release).join(&self.arch));
            }
        }
        for release in &releases {
            dirs.push(distro.join(release));
        }
        if !self.arch.is_empty() {
            dirs.push(distro.join(&self.arch));
        }
        dirs.push(distro.clone());
        dirs.push(src.to_path_buf());

        dirs.into_iter().map(|dir| dir.join(p)).collect()
    }

    /// Finds `p` using the source directory precedence.
    ///
    /// # Returns
    /// * `Ok(None)` if no candidate exists
    ///
    /// # Errors
    /// * `PacksmithError::ConfigError` if `p` is empty
    /// * `PacksmithError::IoError` for failures other than a missing path
    pub fn find_source(&self, p: &str) -> PacksmithResult<Option<PathBuf>> {
        if p.is_empty() {
            return Err(PacksmithError::ConfigError(
                "cannot find source, no path received".to_string(),
            ));
        }
        for candidate in self.candidates(p) {
            if exists(&candidate)? {
                trace!("find_source: {} found", candidate.display());
                return Ok(Some(candidate));
            }
            trace!("find_source: {} not found", candidate.display());
        }
        Ok(None)
    }

    /// Finds `p` for a component, trying `component/p`, then
    /// `component-base/p` (the id up to its first `-`) and finally `p`.
    pub fn find_component_source(
        &self,
        component: &str,
        p: &str,
    ) -> PacksmithResult<Option<PathBuf>> {
        if !component.is_empty() {
            if let Some(found) = self.find_source(&join(component, p))? {
                return Ok(Some(found));
            }
            if let Some((base, _)) = component.split_once('-') {
                if let Some(found) = self.find_source(&join(base, p))? {
                    return Ok(Some(found));
                }
            }
        }
        self.find_source(p)
    }

    /// Finds a command file, preferring the `commands` subdirectory.
    pub fn find_command_file(
        &self,
        component: &str,
        name: &str,
    ) -> PacksmithResult<Option<PathBuf>> {
        if name.is_empty() {
            return Err(PacksmithError::CommandFile {
                id: component.to_string(),
                name: String::new(),
                reason: "the command file name is empty".to_string(),
            });
        }
        if let Some(found) = self.find_component_source(component, &join(COMMANDS_DIR, name))? {
            return Ok(Some(found));
        }
        self.find_component_source(component, name)
    }

    /// Returns the lines of a command file.
    ///
    /// # Errors
    /// * `PacksmithError::CommandFile` if the file cannot be found
    pub fn commands_from_file(&self, component: &str, name: &str) -> PacksmithResult<Vec<String>> {
        let path = self
            .find_command_file(component, name)?
            .ok_or_else(|| PacksmithError::CommandFile {
                id: component.to_string(),
                name: name.to_string(),
                reason: "not found".to_string(),
            })?;
        let content = fs::read_to_string(&path)?;
        Ok(content.lines().map(str::to_string).collect())
    }
}

fn join(dir: &str, p: &str) -> String {
    Path::new(dir).join(p).to_string_lossy().into_owned()
}

fn exists(path: &Path) -> PacksmithResult<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PacksmithError::IoError(e)),
    }
}
