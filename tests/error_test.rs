use packsmith::error::{PacksmithError, PacksmithResult, Section};
use std::io;

#[test]
fn test_error_display() {
    let error = PacksmithError::ConfigError("invalid config".to_string());
    assert_eq!(error.to_string(), "Configuration error: invalid config.");

    let error = PacksmithError::UnsupportedDistro("slackware".to_string());
    assert_eq!(error.to_string(), "Unsupported distro: 'slackware'.");

    let error = PacksmithError::ComponentNotFound {
        section: Section::Builder,
        id: "vmware-iso".to_string(),
    };
    assert_eq!(error.to_string(), "builder not found: 'vmware-iso'.");

    let error = PacksmithError::RequiredSettingMissing {
        section: Section::PostProcessor,
        id: "vagrant-cloud".to_string(),
        key: "version".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "post-processor 'vagrant-cloud': required setting 'version' is missing."
    );

    let error = PacksmithError::BatchError { failed: 1, total: 3 };
    assert_eq!(error.to_string(), "1 of 3 builds failed.");
}

#[test]
fn test_io_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let error: PacksmithError = io_error.into();
    assert!(matches!(error, PacksmithError::IoError(_)));
}

#[test]
fn test_invalid_integer_source() {
    let source = "abc".parse::<i64>().unwrap_err();
    let error = PacksmithError::InvalidInteger {
        section: Section::Builder,
        id: "qemu".to_string(),
        key: "disk_size".to_string(),
        value: "abc".to_string(),
        source,
    };
    assert!(error
        .to_string()
        .starts_with("builder 'qemu': setting 'disk_size' expects an integer, got 'abc'"));
    assert!(std::error::Error::source(&error).is_some());
}

#[test]
fn test_in_build() {
    let error = PacksmithError::NoComponents {
        section: Section::Builder,
    }
    .in_build("web");
    assert_eq!(
        error.to_string(),
        "Build 'web' failed: No builder ids are configured."
    );
    match error {
        PacksmithError::BuildError { build, source } => {
            assert_eq!(build, "web");
            assert!(matches!(*source, PacksmithError::NoComponents { .. }));
        }
        other => panic!("Expected BuildError, got {:?}", other),
    }
}

#[test]
fn test_result_alias() {
    fn load(found: bool) -> PacksmithResult<&'static str> {
        if found {
            Ok("ubuntu")
        } else {
            Err(PacksmithError::UnsupportedDistro("arch".to_string()))
        }
    }
    assert_eq!(load(true).unwrap(), "ubuntu");
    assert!(matches!(load(false), Err(PacksmithError::UnsupportedDistro(_))));
}
