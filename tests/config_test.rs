use packsmith::build::BuildDefinition;
use packsmith::config::{load_optional_toml, load_toml, AppConfig, BuildLists, Builds, Supported};
use packsmith::error::PacksmithError;
use packsmith::iso::Distro;
use packsmith::registry::DistroDefaults;
use packsmith::section::ArrayValue;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SUPPORTED: &str = r#"
[distro.ubuntu]
arch = ["amd64", "i386"]
image = ["server", "desktop"]
release = ["14.04", "16.04"]
default_image = ["arch=amd64", "image=server", "release=14.04"]

[distro.ubuntu.build_info]
base_url = "http://releases.ubuntu.com/"

[distro.ubuntu.iso_checksums.sha256]
"ubuntu-14.04-server-amd64.iso" = "abc123"

[distro.ubuntu.builders.virtualbox-iso]
settings = ["disk_size = 20000"]

[distro.centos]
arch = ["x86_64"]
image = ["minimal"]
release = ["6", "7"]
default_image = ["arch=x86_64", "image=minimal", "release=7"]
"#;

const DEFAULTS: &str = r#"
builder_ids = ["virtualbox-iso"]

[build_info]
name = ":build_name"

[io_dirs]
out_dir = "out/:build_name"

[builders.common]
settings = ["ssh_username = vagrant"]

[builders.virtualbox-iso]
settings = ["headless = true", "disk_size = 10000"]
[builders.virtualbox-iso.arrays]
vm_settings = ["cpus=1", "memory=1024"]
"#;

#[test]
fn test_app_config_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.delimiter, ":");
    assert!(config.archive_prior_build);
    assert_eq!(config.defaults_path(), PathBuf::from("conf/defaults.toml"));
}

#[test]
fn test_app_config_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("packsmith.toml");
    fs::write(
        &path,
        "conf_dir = \"settings\"\ndelimiter = \"%\"\narchive_prior_build = false\n",
    )
    .unwrap();

    let config = AppConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(config.conf_dir, temp_dir.path().join("settings"));
    assert_eq!(config.delimiter, "%");
    assert!(!config.archive_prior_build);
    assert_eq!(
        config.supported_path(),
        temp_dir.path().join("settings/supported.toml")
    );
}

#[test]
fn test_app_config_errors() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.toml");
    assert!(matches!(
        AppConfig::load(Some(missing.as_path())),
        Err(PacksmithError::ConfigError(_))
    ));

    let path = temp_dir.path().join("packsmith.toml");
    fs::write(&path, "delimiter = \"\"\n").unwrap();
    assert!(matches!(
        AppConfig::load(Some(path.as_path())),
        Err(PacksmithError::ConfigError(_))
    ));

    fs::write(&path, "delimiter = [\n").unwrap();
    assert!(matches!(
        AppConfig::load(Some(path.as_path())),
        Err(PacksmithError::TomlError { .. })
    ));
}

#[test]
fn test_load_optional_toml() {
    let temp_dir = TempDir::new().unwrap();
    let lists: BuildLists = load_optional_toml(temp_dir.path().join("lists.toml")).unwrap();
    assert!(lists.list.is_empty());
}

#[test]
fn test_supported_distros() {
    let supported: Supported = toml::from_str(SUPPORTED).unwrap();
    let ubuntu = supported.get("Ubuntu").unwrap();
    let image = ubuntu.default_image();
    assert_eq!(image.arch, "amd64");
    assert_eq!(image.image, "server");
    assert_eq!(image.release, "14.04");
    assert_eq!(
        ubuntu.definition.build_info.base_url,
        "http://releases.ubuntu.com/"
    );
    assert!(ubuntu.validate("ubuntu", "i386", "desktop", "16.04").is_ok());
    assert!(matches!(
        ubuntu.validate("ubuntu", "arm64", "", ""),
        Err(PacksmithError::ConfigError(_))
    ));
}

#[test]
fn test_builds_and_lists() {
    let builds: Builds = toml::from_str(
        r#"
[build.web]
distro = "ubuntu"
release = "16.04"
provisioner_ids = ["shell"]

[build.web.provisioners.shell.arrays]
scripts = ["web.sh"]
"#,
    )
    .unwrap();
    let web = &builds.build["web"];
    assert_eq!(web.distro, "ubuntu");
    assert_eq!(web.release, "16.04");
    assert_eq!(web.definition.provisioner_ids, vec!["shell"]);
    assert_eq!(
        web.definition.provisioners["shell"].array("scripts"),
        Some(&ArrayValue::List(vec!["web.sh".to_string()]))
    );

    let lists: BuildLists = toml::from_str(
        r#"
[list.nightly]
builds = ["web", "db"]

[list.weekly]
builds = ["db", "cache"]
"#,
    )
    .unwrap();
    assert_eq!(
        lists
            .expand(&["nightly".to_string(), "weekly".to_string()])
            .unwrap(),
        vec!["web", "db", "cache"]
    );
    assert!(matches!(
        lists.expand(&["monthly".to_string()]),
        Err(PacksmithError::ConfigError(_))
    ));
}

#[test]
fn test_distro_defaults() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("defaults.toml"), DEFAULTS).unwrap();
    fs::write(temp_dir.path().join("supported.toml"), SUPPORTED).unwrap();
    let defaults: BuildDefinition = load_toml(temp_dir.path().join("defaults.toml")).unwrap();
    let supported: Supported = load_toml(temp_dir.path().join("supported.toml")).unwrap();

    let registry = DistroDefaults::new(&defaults, &supported, ":").unwrap();
    assert_eq!(
        registry.distros().collect::<Vec<_>>(),
        vec![Distro::Ubuntu, Distro::CentOS]
    );

    let ubuntu = registry.get(Distro::Ubuntu).unwrap();
    assert_eq!(ubuntu.release, "14.04");
    assert_eq!(ubuntu.arch, "amd64");
    assert_eq!(ubuntu.out_dir(), "out/:build_name/");
    assert_eq!(
        ubuntu.iso_checksum("sha256", "ubuntu-14.04-server-amd64.iso"),
        Some("abc123")
    );
    let virtualbox = &ubuntu.build.builders["virtualbox-iso"];
    assert_eq!(virtualbox.type_name.as_deref(), Some("virtualbox-iso"));
    assert_eq!(
        virtualbox.settings,
        vec!["headless = true", "disk_size = 20000"]
    );
    assert!(virtualbox.array("vm_settings").is_some());

    let centos = registry.get(Distro::CentOS).unwrap();
    assert_eq!(centos.release, "7");
    assert!(centos.build.build_info.base_url.is_empty());

    // lookups hand out copies
    let mut copy = registry.get(Distro::Ubuntu).unwrap();
    copy.release = "16.04".to_string();
    assert_eq!(registry.get(Distro::Ubuntu).unwrap().release, "14.04");

    assert!(matches!(
        registry.get(Distro::Debian),
        Err(PacksmithError::UnsupportedDistro(_))
    ));
}

#[test]
fn test_distro_defaults_require_base_url() {
    let supported: Supported = toml::from_str(
        r#"
[distro.debian]
default_image = ["arch=amd64", "image=netinst", "release=8.2.0"]
"#,
    )
    .unwrap();
    let result = DistroDefaults::new(&BuildDefinition::default(), &supported, ":");
    assert!(matches!(result, Err(PacksmithError::ConfigError(_))));
}

#[test]
fn test_distro_defaults_unknown_distro() {
    let supported: Supported = toml::from_str("[distro.slackware]\n").unwrap();
    let result = DistroDefaults::new(&BuildDefinition::default(), &supported, ":");
    assert!(matches!(result, Err(PacksmithError::UnsupportedDistro(_))));
}
