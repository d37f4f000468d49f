use indexmap::IndexMap;
use packsmith::error::{PacksmithError, Section};
use packsmith::iso::Distro;
use packsmith::provisioners::create_provisioner;
use packsmith::section::{ArrayValue, ComponentSection};
use packsmith::template::RawTemplate;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn section(settings: &[&str], arrays: &[(&str, ArrayValue)]) -> ComponentSection {
    ComponentSection {
        type_name: None,
        settings: strings(settings),
        arrays: arrays
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
    }
}

fn template(src_dir: &str, include_component_string: bool) -> RawTemplate {
    let mut template = RawTemplate::new(Distro::CentOS);
    template.arch = "x86_64".to_string();
    template.image = "minimal".to_string();
    template.release = "6".to_string();
    template.build.build_info.build_name = "centos-test".to_string();
    template.build.build_info.include_component_string = Some(include_component_string);
    template.build.io_dirs.src_dir = src_dir.to_string();
    template.merge_variables();
    template
}

fn provision(template: &RawTemplate, id: &str, type_name: &str, config: &ComponentSection) -> Value {
    Value::Object(create_provisioner(template, id, type_name, config).unwrap())
}

#[test]
fn test_shell_with_component_string() {
    let template = template("src", true);
    let mut overrides = IndexMap::new();
    overrides.insert(
        "vmware-iso".to_string(),
        section(
            &["execute_command = echo vmware"],
            &[("scripts", ArrayValue::List(strings(&["vmware_test.sh"])))],
        ),
    );
    let config = section(
        &["execute_command = echo 'vagrant'|sudo -S sh '{{.Path}}'"],
        &[
            ("scripts", ArrayValue::List(strings(&["setup_test.sh", "cleanup_test.sh"]))),
            ("except", ArrayValue::List(strings(&["docker"]))),
            ("override", ArrayValue::Override(overrides)),
        ],
    );

    let shell = provision(&template, "shell", "shell", &config);
    assert_eq!(
        shell,
        json!({
            "type": "shell",
            "execute_command": "echo 'vagrant'|sudo -S sh '{{.Path}}'",
            "scripts": ["shell/setup_test.sh", "shell/cleanup_test.sh"],
            "except": ["docker"],
            "override": {
                "vmware-iso": {
                    "execute_command": "echo vmware",
                    "scripts": ["vmware_test.sh"]
                }
            }
        })
    );
}

#[test]
fn test_override_settings_are_typed() {
    let template = template("src", false);
    let mut overrides = IndexMap::new();
    overrides.insert(
        "virtualbox-iso".to_string(),
        section(
            &[
                "expect_disconnect = true",
                "ssh_port = 2222",
                "pause_before = 10s",
                "remote_path = /tmp/:release.sh",
            ],
            &[],
        ),
    );
    let config = section(
        &[],
        &[
            ("inline", ArrayValue::List(strings(&["reboot"]))),
            ("override", ArrayValue::Override(overrides)),
        ],
    );

    let shell = provision(&template, "shell", "shell", &config);
    assert_eq!(
        shell["override"],
        json!({
            "virtualbox-iso": {
                "expect_disconnect": true,
                "ssh_port": 2222,
                "pause_before": "10s",
                "remote_path": "/tmp/6.sh"
            }
        })
    );
}

#[test]
fn test_override_invalid_integer() {
    let template = template("src", false);
    let mut overrides = IndexMap::new();
    overrides.insert("qemu".to_string(), section(&["ssh_port = twenty"], &[]));
    let config = section(
        &[],
        &[
            ("inline", ArrayValue::List(strings(&["reboot"]))),
            ("override", ArrayValue::Override(overrides)),
        ],
    );
    let result = create_provisioner(&template, "shell", "shell", &config);
    assert!(matches!(
        result,
        Err(PacksmithError::InvalidInteger { ref key, .. }) if key == "qemu.ssh_port"
    ));
}

#[test]
fn test_shell_without_component_string() {
    let template = template("src", false);
    let config = section(
        &[],
        &[("scripts", ArrayValue::List(strings(&["setup_:release.sh"])))],
    );
    let shell = provision(&template, "shell", "shell", &config);
    assert_eq!(shell["scripts"], json!(["setup_6.sh"]));
}

#[test]
fn test_shell_requires_something_to_run() {
    let template = template("src", false);
    let config = section(&["execute_command = sh '{{.Path}}'"], &[]);
    match create_provisioner(&template, "shell", "shell", &config) {
        Err(PacksmithError::RequiredSettingMissing { section, key, .. }) => {
            assert_eq!(section, Section::Provisioner);
            assert_eq!(key, "script");
        }
        other => panic!("Expected RequiredSettingMissing, got {:?}", other),
    }

    let config = section(&[], &[("inline", ArrayValue::List(strings(&["uptime"])))]);
    let shell = provision(&template, "shell", "shell", &config);
    assert_eq!(shell, json!({"type": "shell", "inline": ["uptime"]}));
}

#[test]
fn test_shell_execute_command_file() {
    let temp_dir = TempDir::new().unwrap();
    let commands = temp_dir.path().join("shell/commands");
    fs::create_dir_all(&commands).unwrap();
    fs::write(
        commands.join("execute_test.command"),
        "echo 'vagrant' | \\\n  sudo -S sh '{{.Path}}'\n",
    )
    .unwrap();

    let template = template(temp_dir.path().to_str().unwrap(), false);
    let config = section(
        &["execute_command = execute_test.command"],
        &[("scripts", ArrayValue::List(strings(&["setup.sh"])))],
    );
    let shell = provision(&template, "shell", "shell", &config);
    assert_eq!(
        shell["execute_command"],
        "echo 'vagrant' | sudo -S sh '{{.Path}}'"
    );
}

#[test]
fn test_file_provisioner() {
    let template = template("src", true);
    let config = section(&["source = app.tar.gz", "destination = /tmp/app.tar.gz"], &[]);
    let file = provision(&template, "file", "file", &config);
    assert_eq!(
        file,
        json!({
            "type": "file",
            "source": "file/app.tar.gz",
            "destination": "/tmp/app.tar.gz"
        })
    );

    let config = section(&["source = app.tar.gz"], &[]);
    let result = create_provisioner(&template, "file", "file", &config);
    assert!(matches!(
        result,
        Err(PacksmithError::RequiredSettingMissing { ref key, .. }) if key == "destination"
    ));
}

#[test]
fn test_chef_solo() {
    let template = template("src", true);
    let config = section(
        &["prevent_sudo = false", "skip_install = true"],
        &[
            ("cookbook_paths", ArrayValue::List(strings(&["cookbooks"]))),
            ("run_list", ArrayValue::List(strings(&["recipe[base]"]))),
        ],
    );
    let chef = provision(&template, "chef-solo", "chef-solo", &config);
    assert_eq!(
        chef,
        json!({
            "type": "chef-solo",
            "prevent_sudo": false,
            "skip_install": true,
            "cookbook_paths": ["chef-solo/cookbooks"],
            "run_list": ["recipe[base]"]
        })
    );
}

#[test]
fn test_chef_client_requires_server_url() {
    let template = template("src", false);
    let config = section(&["node_name = test"], &[]);
    let result = create_provisioner(&template, "chef-client", "chef-client", &config);
    assert!(matches!(
        result,
        Err(PacksmithError::RequiredSettingMissing { ref key, .. }) if key == "server_url"
    ));
}

#[test]
fn test_ansible_local() {
    let template = template("src", true);
    let config = section(&["playbook_file = site.yml"], &[]);
    let ansible = provision(&template, "ansible-local", "ansible-local", &config);
    assert_eq!(ansible["playbook_file"], "ansible-local/site.yml");
}

#[test]
fn test_unsupported_provisioner() {
    let template = template("src", false);
    let config = section(&[], &[]);
    let result = create_provisioner(&template, "powershell", "powershell", &config);
    assert!(matches!(result, Err(PacksmithError::UnsupportedComponent { .. })));
}

#[test]
fn test_create_provisioners_in_id_order() {
    let mut template = template("src", false);
    template.build.provisioner_ids = strings(&["shell2", "file"]);
    template.build.provisioners.insert(
        "file".to_string(),
        section(&["source = a", "destination = /b"], &[]),
    );
    template.build.provisioners.insert(
        "shell2".to_string(),
        section(&[], &[("inline", ArrayValue::List(strings(&["true"])))]),
    );

    let provisioners = template.create_provisioners().unwrap();
    assert_eq!(provisioners.len(), 2);
    assert_eq!(provisioners[0]["type"], "shell");
    assert_eq!(provisioners[1]["type"], "file");
}
