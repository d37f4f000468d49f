use packsmith::archive::TarArchiver;
use packsmith::build::BuildDefinition;
use packsmith::config::{Builds, Supported};
use packsmith::error::PacksmithError;
use packsmith::iso::Distro;
use packsmith::processor::{BuildRequest, Processor};
use packsmith::registry::DistroDefaults;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn defaults(root: &Path) -> BuildDefinition {
    toml::from_str(&format!(
        r#"
builder_ids = ["virtualbox-iso"]
provisioner_ids = ["shell"]
post_processor_ids = ["vagrant"]

[packer_info]
min_packer_version = "0.8.0"
description = "Test :distro template"

[build_info]
name = ":build_name"

[io_dirs]
src_dir = "{root}/src"
out_dir = "{root}/out/:build_name"

[builders.common]
settings = ["ssh_username = vagrant", "ssh_port = 22", "boot_wait = 5s"]

[builders.virtualbox-iso]
settings = ["headless = true"]
[builders.virtualbox-iso.arrays]
vm_settings = ["cpus=1", "memory=1024"]

[provisioners.shell]
settings = ["execute_command = sudo -S sh '{{{{.Path}}}}'"]
[provisioners.shell.arrays]
scripts = ["setup.sh"]

[post_processors.vagrant]
settings = ["output = :out_dir/:build_name.box", "compression_level = 6"]
"#,
        root = root.display()
    ))
    .unwrap()
}

const SUPPORTED: &str = r#"
[distro.ubuntu]
arch = ["amd64", "i386"]
image = ["server"]
release = ["14.04", "16.04"]
default_image = ["arch=amd64", "image=server", "release=14.04"]

[distro.ubuntu.build_info]
base_url = "http://releases.ubuntu.com/"

[distro.ubuntu.iso_checksums.sha256]
"ubuntu-14.04-server-amd64.iso" = "abc123"
"ubuntu-16.04-server-amd64.iso" = "def456"
"ubuntu-16.04-server-i386.iso" = "789abc"
"#;

const BUILDS: &str = r#"
[build.web]
distro = "ubuntu"
release = "16.04"

[build.web.variables]
aws_region = "us-east-1"

[build.web.provisioners.shell.arrays]
scripts = ["web.sh"]

[build.bad]
distro = "ubuntu"
builder_ids = ["vmware-iso"]

[build.arm]
distro = "ubuntu"
arch = "arm64"
"#;

struct Fixture {
    _temp_dir: TempDir,
    root: std::path::PathBuf,
    defaults: DistroDefaults,
    supported: Supported,
    builds: Builds,
}

fn fixture() -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();
    let supported: Supported = toml::from_str(SUPPORTED).unwrap();
    let builds: Builds = toml::from_str(BUILDS).unwrap();
    let defaults = DistroDefaults::new(&defaults(&root), &supported, ":").unwrap();
    Fixture {
        _temp_dir: temp_dir,
        root,
        defaults,
        supported,
        builds,
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_process_named_build() {
    let f = fixture();
    let processor = Processor::new(&f.defaults, &f.supported, &f.builds);

    let path = processor
        .process(&BuildRequest::Named("web".to_string()))
        .unwrap();
    assert_eq!(path, f.root.join("out/web/web.json"));

    let template = read_json(&path);
    assert_eq!(template["description"], "Test ubuntu template");
    assert_eq!(template["min_packer_version"], "0.8.0");
    assert_eq!(template["variables"]["aws_region"], "us-east-1");

    let builder = &template["builders"][0];
    assert_eq!(builder["type"], "virtualbox-iso");
    assert_eq!(builder["ssh_username"], "vagrant");
    assert_eq!(builder["ssh_port"], 22);
    assert_eq!(builder["headless"], true);
    assert_eq!(
        builder["iso_url"],
        "http://releases.ubuntu.com/16.04/ubuntu-16.04-server-amd64.iso"
    );
    assert_eq!(builder["iso_checksum"], "def456");
    assert_eq!(builder["guest_os_type"], "Ubuntu_64");

    let shell = &template["provisioners"][0];
    assert_eq!(shell["scripts"], serde_json::json!(["web.sh"]));
    assert_eq!(shell["execute_command"], "sudo -S sh '{{.Path}}'");

    let vagrant = &template["post-processors"][0];
    assert_eq!(vagrant["compression_level"], 6);
    assert_eq!(
        vagrant["output"],
        Value::String(format!("{}/out/web/web.box", f.root.display()))
    );
}

#[test]
fn test_process_distro_request() {
    let f = fixture();
    let processor = Processor::new(&f.defaults, &f.supported, &f.builds);
    let request = BuildRequest::Distro {
        distro: Distro::Ubuntu,
        arch: "i386".to_string(),
        image: String::new(),
        release: "16.04".to_string(),
    };

    let (raw, packer) = processor.generate(&request).unwrap();
    assert_eq!(raw.build_name(), "ubuntu-16.04-i386-server");
    assert_eq!(raw.name(), "ubuntu-16.04-i386-server");
    assert_eq!(packer.builders[0]["guest_os_type"], "Ubuntu");
    assert_eq!(packer.builders[0]["iso_checksum"], "789abc");
    assert!(packer.variables.is_empty());
}

#[test]
fn test_unsupported_identity() {
    let f = fixture();
    let processor = Processor::new(&f.defaults, &f.supported, &f.builds);
    let result = processor.raw_template(&BuildRequest::Named("arm".to_string()));
    assert!(matches!(result, Err(PacksmithError::ConfigError(_))));

    let result = processor.raw_template(&BuildRequest::Named("missing".to_string()));
    assert!(matches!(result, Err(PacksmithError::ConfigError(_))));
}

#[test]
fn test_defaults_are_not_modified_by_builds() {
    let f = fixture();
    let processor = Processor::new(&f.defaults, &f.supported, &f.builds);
    processor
        .generate(&BuildRequest::Named("web".to_string()))
        .unwrap();

    let ubuntu = f.defaults.get(Distro::Ubuntu).unwrap();
    assert_eq!(ubuntu.release, "14.04");
    assert_eq!(ubuntu.build.build_info.build_name, "");
    assert_eq!(
        ubuntu.build.provisioners["shell"].array("scripts"),
        Some(&packsmith::section::ArrayValue::List(vec![
            "setup.sh".to_string()
        ]))
    );
}

#[test]
fn test_process_all_continues_after_failure() {
    let f = fixture();
    let processor = Processor::new(&f.defaults, &f.supported, &f.builds);
    let report = processor.process_all(&[
        BuildRequest::Named("bad".to_string()),
        BuildRequest::Named("web".to_string()),
    ]);

    assert!(!report.is_success());
    assert_eq!(report.written, vec![f.root.join("out/web/web.json")]);
    assert_eq!(report.failed.len(), 1);
    match &report.failed[0] {
        PacksmithError::BuildError { build, source } => {
            assert_eq!(build, "bad");
            assert!(matches!(**source, PacksmithError::ComponentNotFound { .. }));
        }
        other => panic!("Expected BuildError, got {:?}", other),
    }
    assert!(!f.root.join("out/bad").exists());
}

#[test]
fn test_prior_build_is_archived() {
    let f = fixture();
    let archiver = TarArchiver::new();
    let processor =
        Processor::new(&f.defaults, &f.supported, &f.builds).with_archiver(Some(&archiver));
    let request = BuildRequest::Named("web".to_string());

    processor.process(&request).unwrap();
    fs::write(f.root.join("out/web/extra.txt"), "stale").unwrap();
    processor.process(&request).unwrap();

    let out_dir = f.root.join("out/web");
    assert!(out_dir.join("web.json").exists());
    assert!(!out_dir.join("extra.txt").exists());
    let archives: Vec<_> = fs::read_dir(f.root.join("out"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tar.zst"))
        .collect();
    assert_eq!(archives.len(), 1);
    assert!(archives[0].starts_with("web-"));
}
