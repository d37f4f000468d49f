//! Error handling for packsmith.
//! Defines the error taxonomy shared by the merge engine, the component
//! factories and the thin I/O layers around them.

use std::fmt;
use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

/// The kind of Packer component an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Builder,
    Provisioner,
    PostProcessor,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Builder => write!(f, "builder"),
            Section::Provisioner => write!(f, "provisioner"),
            Section::PostProcessor => write!(f, "post-processor"),
        }
    }
}

/// Custom error types for packsmith operations.
///
/// Configuration and coercion failures carry the component section, the
/// component id and the offending key so a batch report can name them.
#[derive(Error, Debug)]
pub enum PacksmithError {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Represents errors raised while serializing the generated template
    #[error("JSON error: {0}.")]
    JsonError(#[from] serde_json::Error),

    /// A TOML configuration document could not be decoded
    #[error("Failed to parse '{path}': {source}.")]
    TomlError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Represents errors that occur during configuration parsing or processing
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    #[error("Unsupported distro: '{0}'.")]
    UnsupportedDistro(String),

    #[error("{section} '{id}': unsupported type '{type_name}'.")]
    UnsupportedComponent {
        section: Section,
        id: String,
        type_name: String,
    },

    /// An id was listed for output but no configuration exists for it
    #[error("{section} not found: '{id}'.")]
    ComponentNotFound { section: Section, id: String },

    #[error("No {section} ids are configured.")]
    NoComponents { section: Section },

    #[error("{section} '{id}': required setting '{key}' is missing.")]
    RequiredSettingMissing {
        section: Section,
        id: String,
        key: String,
    },

    #[error("{section} '{id}': setting '{key}' expects an integer, got '{value}': {source}.")]
    InvalidInteger {
        section: Section,
        id: String,
        key: String,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("{section} '{id}': setting '{key}' is invalid: {reason}.")]
    InvalidSetting {
        section: Section,
        id: String,
        key: String,
        reason: String,
    },

    /// A command file could not be resolved to a command
    #[error("'{id}': command file '{name}': {reason}.")]
    CommandFile {
        id: String,
        name: String,
        reason: String,
    },

    /// The ISO descriptor for a release could not be computed
    #[error("ISO error: {0}.")]
    IsoError(String),

    #[error("Archive error: {0}.")]
    ArchiveError(String),

    /// One or more builds of a batch failed
    #[error("{failed} of {total} builds failed.")]
    BatchError { failed: usize, total: usize },

    /// Wraps a failure with the name of the build it aborted
    #[error("Build '{build}' failed: {source}")]
    BuildError {
        build: String,
        #[source]
        source: Box<PacksmithError>,
    },
}

/// Convenience type alias for Results with `PacksmithError` as the error type.
///
/// # Type Parameters
/// * `T` - The type of the success value
pub type PacksmithResult<T> = std::result::Result<T, PacksmithError>;

impl PacksmithError {
    /// Attaches the build name to an error produced while generating it.
    pub fn in_build(self, build: impl Into<String>) -> PacksmithError {
        PacksmithError::BuildError {
            build: build.into(),
            source: Box::new(self),
        }
    }
}

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The PacksmithError to handle
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: PacksmithError) {
    eprintln!("{}", err);
    std::process::exit(1);
}
