//! Common constants used throughout packsmith.

/// Default marker that starts a template variable, e.g. `:distro`.
pub const DEFAULT_DELIMITER: &str = ":";

/// Suffix identifying a setting value as a command file name.
pub const COMMAND_FILE_SUFFIX: &str = ".command";

/// Subdirectory searched first for command files.
pub const COMMANDS_DIR: &str = "commands";

/// Id of the pseudo-builder whose settings seed every concrete builder.
pub const COMMON_BUILDER: &str = "common";

/// Default application configuration file name
pub const APP_CONFIG_FILE: &str = "packsmith.toml";

pub const DEFAULT_CONF_DIR: &str = "conf";
pub const DEFAULT_DEFAULTS_FILE: &str = "defaults.toml";
pub const DEFAULT_SUPPORTED_FILE: &str = "supported.toml";
pub const DEFAULT_BUILDS_FILE: &str = "builds.toml";
pub const DEFAULT_BUILD_LISTS_FILE: &str = "build_list.toml";

/// Extension of archives holding a prior build's output.
pub const ARCHIVE_EXTENSION: &str = "tar.zst";
