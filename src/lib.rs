//! packsmith generates Packer templates from layered TOML configuration.
//! Application defaults, per-distro defaults and user builds are merged into
//! one resolved template per build, which is then translated into Packer's
//! builder, provisioner and post-processor sections.

/// Archiving of a build's prior output
pub mod archive;

/// Build definitions and the layering of one definition onto another
pub mod build;

/// Builder factories
pub mod builders;

/// Command-line interface module for the packsmith application
pub mod cli;

/// Shared factory machinery: settings coercion and array passthrough
pub mod component;

/// Application settings and TOML layer files
pub mod config;

pub mod constants;

/// Error types and handling for the packsmith application
pub mod error;

/// Supported distros and release ISO descriptors
pub mod iso;

pub mod logger;

/// Post-processor factories
pub mod post_processors;

/// Per-build pipeline and batch processing
pub mod processor;

/// Provisioner factories
pub mod provisioners;

/// Default templates of the supported distros
pub mod registry;

/// Component sections and their merge rules
pub mod section;

/// `key=value` settings parsing and merging
pub mod settings;

/// Source file and command file lookup
pub mod source;

/// Raw templates and the generated Packer template
pub mod template;

/// Template variable resolution
pub mod variables;
