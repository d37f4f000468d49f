//! Configuration handling for packsmith.
//! Loads the application settings and the TOML layer files: application
//! defaults, supported distros, user builds and build lists.

use indexmap::IndexMap;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::build::BuildDefinition;
use crate::constants::{
    APP_CONFIG_FILE, DEFAULT_BUILDS_FILE, DEFAULT_BUILD_LISTS_FILE, DEFAULT_CONF_DIR,
    DEFAULT_DEFAULTS_FILE, DEFAULT_DELIMITER, DEFAULT_SUPPORTED_FILE,
};
use crate::error::{PacksmithError, PacksmithResult};
use crate::iso::IsoChecksums;
use crate::settings::parse_var;

/// Application settings, read from `packsmith.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the layer files; relative to the config file
    pub conf_dir: PathBuf,
    pub defaults_file: String,
    pub supported_file: String,
    pub builds_file: String,
    pub build_lists_file: String,
    /// Marker starting a template variable
    pub delimiter: String,
    /// Archive the previous contents of a build's output directory
    pub archive_prior_build: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            conf_dir: PathBuf::from(DEFAULT_CONF_DIR),
            defaults_file: DEFAULT_DEFAULTS_FILE.to_string(),
            supported_file: DEFAULT_SUPPORTED_FILE.to_string(),
            builds_file: DEFAULT_BUILDS_FILE.to_string(),
            build_lists_file: DEFAULT_BUILD_LISTS_FILE.to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            archive_prior_build: true,
        }
    }
}

impl AppConfig {
    /// Loads the application settings.
    ///
    /// # Arguments
    /// * `path` - Explicit config file; when `None`, `packsmith.toml` in the
    ///   current directory is used if present
    ///
    /// # Returns
    /// * `PacksmithResult<AppConfig>` - Loaded settings, or defaults when no file exists
    ///
    /// # Errors
    /// * `PacksmithError::ConfigError` if an explicit file does not exist
    /// * `PacksmithError::TomlError` if the file cannot be decoded
    pub fn load(path: Option<&Path>) -> PacksmithResult<AppConfig> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(APP_CONFIG_FILE), false),
        };

        if !path.exists() {
            if explicit {
                return Err(PacksmithError::ConfigError(format!(
                    "configuration file '{}' does not exist",
                    path.display()
                )));
            }
            debug!("No {} found, using default settings", APP_CONFIG_FILE);
            return Ok(AppConfig::default());
        }

        let mut config: AppConfig = load_toml(&path)?;
        if config.conf_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.conf_dir = parent.join(&config.conf_dir);
            }
        }
        if config.delimiter.is_empty() {
            return Err(PacksmithError::ConfigError("delimiter must not be empty".to_string()));
        }
        Ok(config)
    }

    pub fn defaults_path(&self) -> PathBuf {
        self.conf_dir.join(&self.defaults_file)
    }

    pub fn supported_path(&self) -> PathBuf {
        self.conf_dir.join(&self.supported_file)
    }

    pub fn builds_path(&self) -> PathBuf {
        self.conf_dir.join(&self.builds_file)
    }

    pub fn build_lists_path(&self) -> PathBuf {
        self.conf_dir.join(&self.build_lists_file)
    }
}

/// Reads and decodes a TOML document.
///
/// # Errors
/// * `PacksmithError::IoError` if the file cannot be read
/// * `PacksmithError::TomlError` if it cannot be decoded into `T`
pub fn load_toml<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> PacksmithResult<T> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(PacksmithError::IoError)?;
    toml::from_str(&content).map_err(|source| PacksmithError::TomlError {
        path: path.to_path_buf(),
        source,
    })
}

/// Like `load_toml`, but a missing file yields the default value.
pub fn load_optional_toml<T: DeserializeOwned + Default, P: AsRef<Path>>(
    path: P,
) -> PacksmithResult<T> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("{} not found, nothing loaded", path.display());
        return Ok(T::default());
    }
    load_toml(path)
}

/// Settings of one supported distro.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DistroConfig {
    /// Supported architectures, images and releases
    pub arch: Vec<String>,
    pub image: Vec<String>,
    pub release: Vec<String>,
    /// Identity used when a build does not choose one, e.g. `["arch=amd64"]`
    pub default_image: Vec<String>,
    /// Checksum type to ISO file name to checksum, e.g.
    /// `[distro.ubuntu.iso_checksums.sha256]`
    pub iso_checksums: IsoChecksums,
    #[serde(flatten)]
    pub definition: BuildDefinition,
}

/// Default arch, image and release of a distro.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultImage {
    pub arch: String,
    pub image: String,
    pub release: String,
}

impl DistroConfig {
    pub fn default_image(&self) -> DefaultImage {
        let mut image = DefaultImage::default();
        for entry in &self.default_image {
            match parse_var(entry) {
                ("arch", value) => image.arch = value.to_string(),
                ("image", value) => image.image = value.to_string(),
                ("release", value) => image.release = value.to_string(),
                (key, _) => debug!("default_image: unknown key '{}' ignored", key),
            }
        }
        image
    }

    /// Checks a build's identity against the distro's vocabulary. Empty
    /// values and empty vocabularies are not checked.
    pub fn validate(
        &self,
        distro: &str,
        arch: &str,
        image: &str,
        release: &str,
    ) -> PacksmithResult<()> {
        for (field, value, allowed) in [
            ("arch", arch, &self.arch),
            ("image", image, &self.image),
            ("release", release, &self.release),
        ] {
            if value.is_empty() || allowed.is_empty() || allowed.iter().any(|a| a == value) {
                continue;
            }
            return Err(PacksmithError::ConfigError(format!(
                "{} '{}' is not supported for {} (supported: {})",
                field,
                value,
                distro,
                allowed.join(", ")
            )));
        }
        Ok(())
    }
}

/// The supported distros file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Supported {
    pub distro: IndexMap<String, DistroConfig>,
}

impl Supported {
    /// Looks up a distro by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&DistroConfig> {
        self.distro
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, config)| config)
    }
}

/// One user build.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub distro: String,
    pub arch: String,
    pub image: String,
    pub release: String,
    #[serde(flatten)]
    pub definition: BuildDefinition,
}

/// The builds file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Builds {
    pub build: IndexMap<String, BuildConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildList {
    pub builds: Vec<String>,
}

/// The build lists file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildLists {
    pub list: IndexMap<String, BuildList>,
}

impl BuildLists {
    /// Expands list names into their builds, in order and without repeats.
    ///
    /// # Errors
    /// * `PacksmithError::ConfigError` if a list is not defined
    pub fn expand(&self, names: &[String]) -> PacksmithResult<Vec<String>> {
        let mut builds: Vec<String> = Vec::new();
        for name in names {
            let list = self.list.get(name).ok_or_else(|| {
                PacksmithError::ConfigError(format!("build list '{}' is not defined", name))
            })?;
            for build in &list.builds {
                if !builds.contains(build) {
                    builds.push(build.clone());
                }
            }
        }
        Ok(builds)
    }
}
