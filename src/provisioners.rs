//! Provisioner factories.

use serde_json::{Map, Value};

use crate::component::KeyKind::{Bool, Command, Path, Str};
use crate::component::{Component, Schema};
use crate::error::{PacksmithError, PacksmithResult, Section};
use crate::section::ComponentSection;
use crate::template::RawTemplate;

/// Provisioner types packsmith can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionerKind {
    AnsibleLocal,
    ChefClient,
    ChefSolo,
    File,
    PuppetMasterless,
    PuppetServer,
    SaltMasterless,
    Shell,
}

impl ProvisionerKind {
    pub fn from_type(type_name: &str) -> Option<ProvisionerKind> {
        let kind = match type_name {
            "ansible-local" => ProvisionerKind::AnsibleLocal,
            "chef-client" => ProvisionerKind::ChefClient,
            "chef-solo" => ProvisionerKind::ChefSolo,
            "file" => ProvisionerKind::File,
            "puppet-masterless" => ProvisionerKind::PuppetMasterless,
            "puppet-server" => ProvisionerKind::PuppetServer,
            "salt-masterless" => ProvisionerKind::SaltMasterless,
            "shell" => ProvisionerKind::Shell,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionerKind::AnsibleLocal => "ansible-local",
            ProvisionerKind::ChefClient => "chef-client",
            ProvisionerKind::ChefSolo => "chef-solo",
            ProvisionerKind::File => "file",
            ProvisionerKind::PuppetMasterless => "puppet-masterless",
            ProvisionerKind::PuppetServer => "puppet-server",
            ProvisionerKind::SaltMasterless => "salt-masterless",
            ProvisionerKind::Shell => "shell",
        }
    }
}

/// Creates the Packer map of one provisioner.
///
/// # Errors
/// * `PacksmithError::UnsupportedComponent` for an unknown type
/// * `PacksmithError::RequiredSettingMissing` if a required key is unset
pub fn create_provisioner(
    template: &RawTemplate,
    id: &str,
    type_name: &str,
    section: &ComponentSection,
) -> PacksmithResult<Map<String, Value>> {
    let kind =
        ProvisionerKind::from_type(type_name).ok_or_else(|| PacksmithError::UnsupportedComponent {
            section: Section::Provisioner,
            id: id.to_string(),
            type_name: type_name.to_string(),
        })?;
    let c = Component::new(template, Section::Provisioner, id, kind.as_str(), section);

    match kind {
        ProvisionerKind::AnsibleLocal => c.emit(&ANSIBLE_LOCAL),
        ProvisionerKind::ChefClient => c.emit(&CHEF_CLIENT),
        ProvisionerKind::ChefSolo => c.emit(&CHEF_SOLO),
        ProvisionerKind::File => c.emit(&FILE),
        ProvisionerKind::PuppetMasterless => c.emit(&PUPPET_MASTERLESS),
        ProvisionerKind::PuppetServer => c.emit(&PUPPET_SERVER),
        ProvisionerKind::SaltMasterless => c.emit(&SALT_MASTERLESS),
        ProvisionerKind::Shell => create_shell(c),
    }
}

const ANSIBLE_LOCAL: Schema = Schema {
    required: &["playbook_file"],
    keys: &[
        ("command", Str),
        ("group_vars", Path),
        ("host_vars", Path),
        ("inventory_file", Path),
        ("inventory_groups", Str),
        ("pause_before", Str),
        ("playbook_dir", Path),
        ("playbook_file", Path),
        ("staging_directory", Str),
    ],
    arrays: &["except", "extra_arguments", "only", "override"],
    path_arrays: &["playbook_paths", "role_paths"],
    communicator: false,
};

const CHEF_CLIENT: Schema = Schema {
    required: &["server_url"],
    keys: &[
        ("chef_environment", Str),
        ("client_key", Path),
        ("config_template", Path),
        ("execute_command", Command),
        ("install_command", Command),
        ("node_name", Str),
        ("pause_before", Str),
        ("prevent_sudo", Bool),
        ("server_url", Str),
        ("skip_clean_client", Bool),
        ("skip_clean_node", Bool),
        ("skip_install", Bool),
        ("ssl_verify_mode", Str),
        ("staging_directory", Str),
        ("validation_client_name", Str),
        ("validation_key_path", Path),
    ],
    arrays: &["except", "only", "override", "run_list"],
    path_arrays: &[],
    communicator: false,
};

const CHEF_SOLO: Schema = Schema {
    required: &[],
    keys: &[
        ("chef_environment", Str),
        ("config_template", Path),
        ("data_bags_path", Path),
        ("encrypted_data_bag_secret_path", Path),
        ("environments_path", Path),
        ("execute_command", Command),
        ("install_command", Command),
        ("pause_before", Str),
        ("prevent_sudo", Bool),
        ("roles_path", Path),
        ("skip_install", Bool),
        ("staging_directory", Str),
    ],
    arrays: &["except", "only", "override", "remote_cookbook_paths", "run_list"],
    path_arrays: &["cookbook_paths"],
    communicator: false,
};

const FILE: Schema = Schema {
    required: &["source", "destination"],
    keys: &[
        ("destination", Str),
        ("direction", Str),
        ("pause_before", Str),
        ("source", Path),
    ],
    arrays: &["except", "only", "override"],
    path_arrays: &[],
    communicator: false,
};

const PUPPET_MASTERLESS: Schema = Schema {
    required: &["manifest_file"],
    keys: &[
        ("execute_command", Command),
        ("hiera_config_path", Path),
        ("manifest_dir", Path),
        ("manifest_file", Path),
        ("pause_before", Str),
        ("prevent_sudo", Bool),
        ("staging_directory", Str),
        ("working_directory", Str),
    ],
    arrays: &["except", "extra_arguments", "facter", "only", "override"],
    path_arrays: &["module_paths"],
    communicator: false,
};

const PUPPET_SERVER: Schema = Schema {
    required: &[],
    keys: &[
        ("client_cert_path", Path),
        ("client_private_key_path", Path),
        ("options", Str),
        ("pause_before", Str),
        ("prevent_sudo", Bool),
        ("puppet_node", Str),
        ("puppet_server", Str),
        ("staging_directory", Str),
    ],
    arrays: &["except", "facter", "only", "override"],
    path_arrays: &[],
    communicator: false,
};

const SALT_MASTERLESS: Schema = Schema {
    required: &["local_state_tree"],
    keys: &[
        ("bootstrap_args", Str),
        ("disable_sudo", Bool),
        ("local_pillar_roots", Path),
        ("local_state_tree", Path),
        ("minion_config", Path),
        ("pause_before", Str),
        ("remote_pillar_roots", Str),
        ("remote_state_tree", Str),
        ("skip_bootstrap", Bool),
        ("temp_config_dir", Str),
    ],
    arrays: &["except", "only", "override"],
    path_arrays: &[],
    communicator: false,
};

const SHELL: Schema = Schema {
    required: &[],
    keys: &[
        ("binary", Bool),
        ("execute_command", Command),
        ("expect_disconnect", Bool),
        ("inline_shebang", Str),
        ("pause_before", Str),
        ("remote_file", Str),
        ("remote_folder", Str),
        ("remote_path", Str),
        ("script", Path),
        ("skip_clean", Bool),
        ("start_retry_timeout", Str),
    ],
    arrays: &["environment_vars", "except", "inline", "only", "override"],
    path_arrays: &["scripts"],
    communicator: false,
};

fn create_shell(c: Component) -> PacksmithResult<Map<String, Value>> {
    if c.peek("script").is_none() && !c.has_array("scripts") && !c.has_array("inline") {
        return Err(c.missing("script"));
    }
    c.emit(&SHELL)
}
