//! Builder factories: translate a builder's merged settings and arrays into
//! the map Packer expects for its type.

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::component::{Component, Schema};
use crate::error::{PacksmithError, PacksmithResult, Section};
use crate::iso::{guest_os_type, GuestFamily};
use crate::section::{ArrayValue, ComponentSection};
use crate::settings::parse_var;
use crate::template::RawTemplate;

use crate::component::KeyKind::{Bool, Command, CommandList, Int, Path, Str};

/// Builder types packsmith can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderKind {
    /// Settings shared by all builders of a build; never emitted
    Common,
    AmazonChroot,
    AmazonEbs,
    AmazonInstance,
    DigitalOcean,
    Docker,
    GoogleCompute,
    Null,
    Openstack,
    ParallelsIso,
    ParallelsPvm,
    Qemu,
    VirtualBoxIso,
    VirtualBoxOvf,
    VmwareIso,
    VmwareVmx,
}

impl BuilderKind {
    pub fn from_type(type_name: &str) -> Option<BuilderKind> {
        let kind = match type_name {
            "common" => BuilderKind::Common,
            "amazon-chroot" => BuilderKind::AmazonChroot,
            "amazon-ebs" => BuilderKind::AmazonEbs,
            "amazon-instance" => BuilderKind::AmazonInstance,
            "digitalocean" => BuilderKind::DigitalOcean,
            "docker" => BuilderKind::Docker,
            "googlecompute" => BuilderKind::GoogleCompute,
            "null" => BuilderKind::Null,
            "openstack" => BuilderKind::Openstack,
            "parallels-iso" => BuilderKind::ParallelsIso,
            "parallels-pvm" => BuilderKind::ParallelsPvm,
            "qemu" => BuilderKind::Qemu,
            "virtualbox-iso" => BuilderKind::VirtualBoxIso,
            "virtualbox-ovf" => BuilderKind::VirtualBoxOvf,
            "vmware-iso" => BuilderKind::VmwareIso,
            "vmware-vmx" => BuilderKind::VmwareVmx,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuilderKind::Common => "common",
            BuilderKind::AmazonChroot => "amazon-chroot",
            BuilderKind::AmazonEbs => "amazon-ebs",
            BuilderKind::AmazonInstance => "amazon-instance",
            BuilderKind::DigitalOcean => "digitalocean",
            BuilderKind::Docker => "docker",
            BuilderKind::GoogleCompute => "googlecompute",
            BuilderKind::Null => "null",
            BuilderKind::Openstack => "openstack",
            BuilderKind::ParallelsIso => "parallels-iso",
            BuilderKind::ParallelsPvm => "parallels-pvm",
            BuilderKind::Qemu => "qemu",
            BuilderKind::VirtualBoxIso => "virtualbox-iso",
            BuilderKind::VirtualBoxOvf => "virtualbox-ovf",
            BuilderKind::VmwareIso => "vmware-iso",
            BuilderKind::VmwareVmx => "vmware-vmx",
        }
    }
}

/// Creates the Packer map of one builder.
///
/// # Arguments
/// * `template` - Template with resolved variables
/// * `id` - Builder id, used in messages and source lookups
/// * `type_name` - Packer builder type
/// * `section` - Builder configuration, already merged with the common builder
///
/// # Returns
/// * `Ok(None)` for the common pseudo-builder, which is never emitted
///
/// # Errors
/// * `PacksmithError::UnsupportedComponent` for an unknown type
/// * Any error of the type's factory
pub fn create_builder(
    template: &RawTemplate,
    id: &str,
    type_name: &str,
    section: &ComponentSection,
) -> PacksmithResult<Option<Map<String, Value>>> {
    let kind = BuilderKind::from_type(type_name).ok_or_else(|| {
        PacksmithError::UnsupportedComponent {
            section: Section::Builder,
            id: id.to_string(),
            type_name: type_name.to_string(),
        }
    })?;
    let c = Component::new(template, Section::Builder, id, kind.as_str(), section);

    let builder = match kind {
        BuilderKind::Common => {
            debug!("builder '{}': common settings are not emitted", id);
            return Ok(None);
        }
        BuilderKind::AmazonChroot => c.emit(&AMAZON_CHROOT)?,
        BuilderKind::AmazonEbs => create_amazon(c, &AMAZON_EBS)?,
        BuilderKind::AmazonInstance => create_amazon(c, &AMAZON_INSTANCE)?,
        BuilderKind::DigitalOcean => c.emit(&DIGITALOCEAN)?,
        BuilderKind::Docker => create_docker(c)?,
        BuilderKind::GoogleCompute => c.emit(&GOOGLECOMPUTE)?,
        BuilderKind::Null => c.emit(&NULL)?,
        BuilderKind::Openstack => c.emit(&OPENSTACK)?,
        BuilderKind::ParallelsIso => create_parallels_iso(c)?,
        BuilderKind::ParallelsPvm => create_parallels_pvm(c)?,
        BuilderKind::Qemu => create_qemu(c)?,
        BuilderKind::VirtualBoxIso => create_virtualbox_iso(c)?,
        BuilderKind::VirtualBoxOvf => create_virtualbox_ovf(c)?,
        BuilderKind::VmwareIso => create_vmware_iso(c)?,
        BuilderKind::VmwareVmx => create_vmware_vmx(c)?,
    };
    Ok(Some(builder))
}

const AMAZON_CHROOT: Schema = Schema {
    required: &["access_key", "ami_name", "secret_key", "source_ami"],
    keys: &[
        ("access_key", Str),
        ("ami_description", Str),
        ("ami_name", Str),
        ("ami_virtualization_type", Str),
        ("command_wrapper", Str),
        ("device_path", Str),
        ("enhanced_networking", Bool),
        ("force_deregister", Bool),
        ("mount_path", Str),
        ("root_volume_size", Int),
        ("secret_key", Str),
        ("source_ami", Str),
        ("token", Str),
    ],
    arrays: &[
        "ami_groups",
        "ami_product_codes",
        "ami_regions",
        "ami_users",
        "chroot_mounts",
        "copy_files",
        "tags",
    ],
    path_arrays: &[],
    communicator: false,
};

const AMAZON_EBS: Schema = Schema {
    required: &[
        "access_key",
        "ami_name",
        "instance_type",
        "region",
        "secret_key",
        "source_ami",
    ],
    keys: &[
        ("access_key", Str),
        ("ami_description", Str),
        ("ami_name", Str),
        ("ami_virtualization_type", Str),
        ("associate_public_ip_address", Bool),
        ("availability_zone", Str),
        ("ebs_optimized", Bool),
        ("enhanced_networking", Bool),
        ("force_deregister", Bool),
        ("iam_instance_profile", Str),
        ("instance_type", Str),
        ("region", Str),
        ("secret_key", Str),
        ("security_group_id", Str),
        ("shutdown_behavior", Str),
        ("source_ami", Str),
        ("spot_price", Str),
        ("spot_price_auto_product", Str),
        ("ssh_keypair_name", Str),
        ("ssh_private_ip", Bool),
        ("subnet_id", Str),
        ("temporary_key_pair_name", Str),
        ("token", Str),
        ("user_data", Str),
        ("user_data_file", Path),
        ("vpc_id", Str),
        ("windows_password_timeout", Str),
    ],
    arrays: &[
        "ami_groups",
        "ami_product_codes",
        "ami_regions",
        "ami_users",
        "run_tags",
        "security_group_ids",
        "tags",
    ],
    path_arrays: &[],
    communicator: true,
};

const BLOCK_DEVICE_MAPPINGS: [&str; 2] = [
    "ami_block_device_mappings",
    "launch_block_device_mappings",
];

const AMAZON_INSTANCE: Schema = Schema {
    required: &[
        "access_key",
        "account_id",
        "ami_name",
        "instance_type",
        "region",
        "s3_bucket",
        "secret_key",
        "source_ami",
        "x509_cert_path",
        "x509_key_path",
    ],
    keys: &[
        ("access_key", Str),
        ("account_id", Str),
        ("ami_description", Str),
        ("ami_name", Str),
        ("ami_virtualization_type", Str),
        ("associate_public_ip_address", Bool),
        ("availability_zone", Str),
        ("bundle_destination", Str),
        ("bundle_prefix", Str),
        ("bundle_upload_command", Command),
        ("bundle_vol_command", Command),
        ("ebs_optimized", Bool),
        ("enhanced_networking", Bool),
        ("force_deregister", Bool),
        ("iam_instance_profile", Str),
        ("instance_type", Str),
        ("region", Str),
        ("s3_bucket", Str),
        ("secret_key", Str),
        ("security_group_id", Str),
        ("source_ami", Str),
        ("spot_price", Str),
        ("spot_price_auto_product", Str),
        ("ssh_keypair_name", Str),
        ("ssh_private_ip", Bool),
        ("subnet_id", Str),
        ("temporary_key_pair_name", Str),
        ("user_data", Str),
        ("user_data_file", Path),
        ("vpc_id", Str),
        ("windows_password_timeout", Str),
        ("x509_cert_path", Str),
        ("x509_key_path", Str),
        ("x509_upload_path", Str),
    ],
    arrays: &[
        "ami_groups",
        "ami_product_codes",
        "ami_regions",
        "ami_users",
        "run_tags",
        "security_group_ids",
        "tags",
    ],
    path_arrays: &[],
    communicator: true,
};

/// amazon-ebs and amazon-instance: block device mappings become typed
/// objects, the rest follows the schema.
fn create_amazon(mut c: Component, schema: &Schema) -> PacksmithResult<Map<String, Value>> {
    for name in BLOCK_DEVICE_MAPPINGS {
        if let Some(value) = c.take_array(name) {
            let mappings = block_device_mappings(&c, name, value)?;
            c.set(name, mappings);
        }
    }
    c.emit(schema)
}

/// Converts `[["device_name=/dev/sdb", "volume_size=20"], ...]` into a list
/// of objects with typed values.
fn block_device_mappings(c: &Component, name: &str, value: &ArrayValue) -> PacksmithResult<Value> {
    let devices = match value {
        ArrayValue::Nested(devices) => devices.clone(),
        ArrayValue::List(device) => vec![device.clone()],
        _ => return Err(c.invalid(name, "expected a list of key=value lists")),
    };

    let mut mappings = Vec::with_capacity(devices.len());
    for device in &devices {
        let mut mapping = Map::new();
        for entry in device {
            let (key, raw) = parse_var(entry);
            if key.is_empty() {
                continue;
            }
            let value = c.template().replace_variables(raw);
            let json = match key {
                "iops" | "volume_size" => {
                    Value::from(c.parse_int(&format!("{}.{}", name, key), &value)?)
                }
                "delete_on_termination" | "encrypted" | "no_device" => Value::Bool(value == "true"),
                _ => Value::String(value),
            };
            mapping.insert(key.to_string(), json);
        }
        mappings.push(Value::Object(mapping));
    }
    Ok(Value::Array(mappings))
}

const DIGITALOCEAN: Schema = Schema {
    required: &["api_token", "image", "region", "size"],
    keys: &[
        ("api_token", Str),
        ("api_url", Str),
        ("droplet_name", Str),
        ("image", Str),
        ("private_networking", Bool),
        ("region", Str),
        ("size", Str),
        ("snapshot_name", Str),
        ("state_timeout", Str),
        ("user_data", Str),
    ],
    arrays: &[],
    path_arrays: &[],
    communicator: true,
};

const DOCKER: Schema = Schema {
    required: &["image"],
    keys: &[
        ("commit", Bool),
        ("discard", Bool),
        ("export_path", Str),
        ("image", Str),
        ("login", Bool),
        ("login_email", Str),
        ("login_password", Str),
        ("login_server", Str),
        ("login_username", Str),
        ("pull", Bool),
        ("run_command", CommandList),
    ],
    arrays: &["changes", "run_command", "volumes"],
    path_arrays: &[],
    communicator: false,
};

fn create_docker(c: Component) -> PacksmithResult<Map<String, Value>> {
    let enabled = |key: &str| c.peek(key) == Some("true");
    if c.peek("export_path").is_none() && !enabled("commit") && !enabled("discard") {
        return Err(c.invalid(
            "export_path",
            "one of export_path, commit or discard must be set",
        ));
    }
    c.emit(&DOCKER)
}

const GOOGLECOMPUTE: Schema = Schema {
    required: &["project_id", "source_image", "zone"],
    keys: &[
        ("account_file", Str),
        ("address", Str),
        ("disk_size", Int),
        ("disk_type", Str),
        ("image_description", Str),
        ("image_name", Str),
        ("instance_name", Str),
        ("machine_type", Str),
        ("network", Str),
        ("preemptible", Bool),
        ("project_id", Str),
        ("region", Str),
        ("source_image", Str),
        ("state_timeout", Str),
        ("subnetwork", Str),
        ("use_internal_ip", Bool),
        ("zone", Str),
    ],
    arrays: &["metadata", "tags"],
    path_arrays: &[],
    communicator: true,
};

const NULL: Schema = Schema {
    required: &[],
    keys: &[],
    arrays: &[],
    path_arrays: &[],
    communicator: true,
};

const OPENSTACK: Schema = Schema {
    required: &["flavor", "image_name", "source_image"],
    keys: &[
        ("api_key", Str),
        ("availability_zone", Str),
        ("config_drive", Bool),
        ("domain_name", Str),
        ("endpoint_type", Str),
        ("flavor", Str),
        ("floating_ip", Str),
        ("floating_ip_pool", Str),
        ("identity_endpoint", Str),
        ("image_name", Str),
        ("insecure", Bool),
        ("password", Str),
        ("rackconnect_wait", Bool),
        ("region", Str),
        ("source_image", Str),
        ("ssh_interface", Str),
        ("tenant_id", Str),
        ("tenant_name", Str),
        ("use_floating_ip", Bool),
        ("username", Str),
    ],
    arrays: &["metadata", "networks", "security_groups"],
    path_arrays: &[],
    communicator: true,
};

const PARALLELS_ISO: Schema = Schema {
    required: &["parallels_tools_flavor"],
    keys: &[
        ("boot_command", CommandList),
        ("boot_wait", Str),
        ("disk_size", Int),
        ("hard_drive_interface", Str),
        ("host_interfaces", Str),
        ("http_directory", Str),
        ("http_port_max", Int),
        ("http_port_min", Int),
        ("iso_target_path", Str),
        ("output_directory", Str),
        ("parallels_tools_flavor", Str),
        ("parallels_tools_guest_path", Str),
        ("parallels_tools_mode", Str),
        ("prlctl_version_file", Str),
        ("shutdown_command", Command),
        ("shutdown_timeout", Str),
        ("skip_compaction", Bool),
        ("vm_name", Str),
    ],
    arrays: &["boot_command", "floppy_files", "iso_urls"],
    path_arrays: &[],
    communicator: true,
};

fn create_parallels_iso(mut c: Component) -> PacksmithResult<Map<String, Value>> {
    guest_os(&mut c, GuestFamily::Parallels);
    iso_settings(&mut c)?;
    let settings = vm_settings(&mut c)?;
    vm_commands(&mut c, "prlctl", "set", settings)?;
    vm_commands(&mut c, "prlctl_post", "set", Vec::new())?;
    c.emit(&PARALLELS_ISO)
}

const PARALLELS_PVM: Schema = Schema {
    required: &["parallels_tools_flavor", "source_path"],
    keys: &[
        ("boot_command", CommandList),
        ("boot_wait", Str),
        ("output_directory", Str),
        ("parallels_tools_flavor", Str),
        ("parallels_tools_guest_path", Str),
        ("parallels_tools_mode", Str),
        ("parallels_tools_path", Str),
        ("prlctl_version_file", Str),
        ("reassign_mac", Bool),
        ("shutdown_command", Command),
        ("shutdown_timeout", Str),
        ("skip_compaction", Bool),
        ("source_path", Path),
        ("vm_name", Str),
    ],
    arrays: &["boot_command", "floppy_files"],
    path_arrays: &[],
    communicator: true,
};

fn create_parallels_pvm(mut c: Component) -> PacksmithResult<Map<String, Value>> {
    let settings = vm_settings(&mut c)?;
    vm_commands(&mut c, "prlctl", "set", settings)?;
    vm_commands(&mut c, "prlctl_post", "set", Vec::new())?;
    c.emit(&PARALLELS_PVM)
}

const QEMU: Schema = Schema {
    required: &[],
    keys: &[
        ("accelerator", Str),
        ("boot_command", CommandList),
        ("boot_wait", Str),
        ("disk_cache", Str),
        ("disk_compression", Bool),
        ("disk_discard", Str),
        ("disk_image", Bool),
        ("disk_interface", Str),
        ("disk_size", Int),
        ("format", Str),
        ("headless", Bool),
        ("http_directory", Str),
        ("http_port_max", Int),
        ("http_port_min", Int),
        ("machine_type", Str),
        ("net_device", Str),
        ("output_directory", Str),
        ("qemu_binary", Str),
        ("shutdown_command", Command),
        ("shutdown_timeout", Str),
        ("skip_compaction", Bool),
        ("ssh_host_port_max", Int),
        ("ssh_host_port_min", Int),
        ("vm_name", Str),
        ("vnc_port_max", Int),
        ("vnc_port_min", Int),
    ],
    arrays: &["boot_command", "floppy_files", "iso_urls", "qemuargs"],
    path_arrays: &[],
    communicator: true,
};

fn create_qemu(mut c: Component) -> PacksmithResult<Map<String, Value>> {
    iso_settings(&mut c)?;
    c.emit(&QEMU)
}

const VIRTUALBOX_ISO: Schema = Schema {
    required: &[],
    keys: &[
        ("boot_command", CommandList),
        ("boot_wait", Str),
        ("disk_size", Int),
        ("format", Str),
        ("guest_additions_mode", Str),
        ("guest_additions_path", Str),
        ("guest_additions_sha256", Str),
        ("guest_additions_url", Str),
        ("hard_drive_interface", Str),
        ("headless", Bool),
        ("http_directory", Str),
        ("http_port_max", Int),
        ("http_port_min", Int),
        ("iso_interface", Str),
        ("output_directory", Str),
        ("shutdown_command", Command),
        ("shutdown_timeout", Str),
        ("ssh_host_port_max", Int),
        ("ssh_host_port_min", Int),
        ("ssh_skip_nat_mapping", Bool),
        ("virtualbox_version_file", Str),
        ("vm_name", Str),
    ],
    arrays: &["boot_command", "export_opts", "floppy_files", "iso_urls"],
    path_arrays: &[],
    communicator: true,
};

fn create_virtualbox_iso(mut c: Component) -> PacksmithResult<Map<String, Value>> {
    guest_os(&mut c, GuestFamily::VirtualBox);
    iso_settings(&mut c)?;
    vboxmanage(&mut c)?;
    c.emit(&VIRTUALBOX_ISO)
}

const VIRTUALBOX_OVF: Schema = Schema {
    required: &["source_path"],
    keys: &[
        ("boot_command", CommandList),
        ("boot_wait", Str),
        ("format", Str),
        ("guest_additions_mode", Str),
        ("guest_additions_path", Str),
        ("guest_additions_sha256", Str),
        ("guest_additions_url", Str),
        ("headless", Bool),
        ("http_directory", Str),
        ("http_port_max", Int),
        ("http_port_min", Int),
        ("import_opts", Str),
        ("output_directory", Str),
        ("shutdown_command", Command),
        ("shutdown_timeout", Str),
        ("skip_export", Bool),
        ("source_path", Str),
        ("ssh_host_port_max", Int),
        ("ssh_host_port_min", Int),
        ("ssh_skip_nat_mapping", Bool),
        ("virtualbox_version_file", Str),
        ("vm_name", Str),
    ],
    arrays: &["boot_command", "export_opts", "floppy_files", "import_flags"],
    path_arrays: &[],
    communicator: true,
};

fn create_virtualbox_ovf(mut c: Component) -> PacksmithResult<Map<String, Value>> {
    vboxmanage(&mut c)?;
    c.emit(&VIRTUALBOX_OVF)
}

const VMWARE_ISO: Schema = Schema {
    required: &[],
    keys: &[
        ("boot_command", CommandList),
        ("boot_wait", Str),
        ("disk_size", Int),
        ("disk_type_id", Str),
        ("fusion_app_path", Str),
        ("headless", Bool),
        ("http_directory", Str),
        ("http_port_max", Int),
        ("http_port_min", Int),
        ("output_directory", Str),
        ("remote_cache_datastore", Str),
        ("remote_cache_directory", Str),
        ("remote_datastore", Str),
        ("remote_host", Str),
        ("remote_password", Str),
        ("remote_type", Str),
        ("remote_username", Str),
        ("shutdown_command", Command),
        ("shutdown_timeout", Str),
        ("skip_compaction", Bool),
        ("tools_upload_flavor", Str),
        ("tools_upload_path", Str),
        ("version", Str),
        ("vm_name", Str),
        ("vmdk_name", Str),
        ("vmx_template_path", Path),
        ("vnc_port_max", Int),
        ("vnc_port_min", Int),
    ],
    arrays: &[
        "boot_command",
        "disk_additional_size",
        "floppy_files",
        "iso_urls",
        "vmx_data_post",
    ],
    path_arrays: &[],
    communicator: true,
};

fn create_vmware_iso(mut c: Component) -> PacksmithResult<Map<String, Value>> {
    guest_os(&mut c, GuestFamily::Vmware);
    iso_settings(&mut c)?;
    vmx_data(&mut c)?;
    c.emit(&VMWARE_ISO)
}

const VMWARE_VMX: Schema = Schema {
    required: &["source_path"],
    keys: &[
        ("boot_command", CommandList),
        ("boot_wait", Str),
        ("fusion_app_path", Str),
        ("headless", Bool),
        ("http_directory", Str),
        ("http_port_max", Int),
        ("http_port_min", Int),
        ("output_directory", Str),
        ("shutdown_command", Command),
        ("shutdown_timeout", Str),
        ("skip_compaction", Bool),
        ("source_path", Str),
        ("vm_name", Str),
        ("vnc_port_max", Int),
        ("vnc_port_min", Int),
    ],
    arrays: &["boot_command", "floppy_files", "vmx_data_post"],
    path_arrays: &[],
    communicator: true,
};

fn create_vmware_vmx(mut c: Component) -> PacksmithResult<Map<String, Value>> {
    vmx_data(&mut c)?;
    c.emit(&VMWARE_VMX)
}

/// Sets `guest_os_type`, generating it from the distro and arch when the
/// builder leaves it unset.
fn guest_os(c: &mut Component, family: GuestFamily) {
    let template = c.template();
    let os_type = c
        .take("guest_os_type")
        .unwrap_or_else(|| guest_os_type(template.distro, &template.arch, family));
    c.set("guest_os_type", Value::String(os_type));
}

/// Sets the ISO location and checksum.
///
/// An `iso_urls` array replaces `iso_url`; otherwise an explicit `iso_url`
/// wins over the release's ISO descriptor. The checksum is the explicit
/// `iso_checksum`, or the distro table's entry for the checksum type and the
/// ISO file name.
fn iso_settings(c: &mut Component) -> PacksmithResult<()> {
    let template = c.template();
    let checksum_type = c
        .take("iso_checksum_type")
        .unwrap_or_else(|| "sha256".to_string());
    let explicit_url = c.take("iso_url");
    let explicit_checksum = c.take("iso_checksum");

    let mirrors = match c.peek_array("iso_urls") {
        Some(ArrayValue::String(url)) => vec![url.clone()],
        Some(ArrayValue::List(urls)) => urls.clone(),
        _ => Vec::new(),
    };
    let file = match mirrors.first() {
        Some(first) => {
            if explicit_url.is_some() {
                warn!("builder '{}': iso_url ignored, iso_urls is set", c.id());
            }
            iso_file_name(&template.replace_variables(first)).to_string()
        }
        None => {
            let url = match explicit_url {
                Some(url) => url,
                None => template.release_iso()?.url.clone(),
            };
            let file = iso_file_name(&url).to_string();
            c.set("iso_url", Value::String(url));
            file
        }
    };

    c.set("iso_checksum_type", Value::String(checksum_type.clone()));
    let checksum = explicit_checksum.or_else(|| {
        template
            .iso_checksum(&checksum_type, &file)
            .map(str::to_string)
    });
    match checksum {
        Some(checksum) => c.set("iso_checksum", Value::String(checksum)),
        None if checksum_type == "none" => {}
        None => {
            return Err(PacksmithError::IsoError(format!(
                "builder '{}': no {} checksum for {}",
                c.id(),
                checksum_type,
                file
            )))
        }
    }
    Ok(())
}

fn iso_file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Reads `key=value` entries from a string or list array.
fn key_values(
    c: &Component,
    name: &str,
    value: &ArrayValue,
) -> PacksmithResult<Vec<(String, String)>> {
    let entries = match value {
        ArrayValue::String(s) => std::slice::from_ref(s),
        ArrayValue::List(list) => list.as_slice(),
        _ => return Err(c.invalid(name, "expected a list of key=value entries")),
    };
    let template = c.template();
    Ok(entries
        .iter()
        .map(|entry| parse_var(entry))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), template.replace_variables(value)))
        .collect())
}

fn vm_settings(c: &mut Component) -> PacksmithResult<Vec<(String, String)>> {
    match c.take_array("vm_settings") {
        Some(value) => key_values(c, "vm_settings", value),
        None => Ok(Vec::new()),
    }
}

/// Sets a hypervisor command array such as `vboxmanage` or `prlctl`.
///
/// Nested lists are commands and pass through. `key=value` entries, then
/// `extra`, become `<verb> {{.Name}} --key value`; a leading `--` on the key
/// is optional.
fn vm_commands(
    c: &mut Component,
    name: &str,
    verb: &str,
    extra: Vec<(String, String)>,
) -> PacksmithResult<()> {
    let mut commands: Vec<Value> = Vec::new();
    if let Some(value) = c.take_array(name) {
        match value {
            ArrayValue::Nested(_) => {
                if let Value::Array(items) = c.array_to_json(value) {
                    commands.extend(items);
                }
            }
            ArrayValue::String(_) | ArrayValue::List(_) => {
                let settings = key_values(c, name, value)?;
                commands.extend(settings.into_iter().map(|kv| vm_command(verb, kv)));
            }
            _ => {
                return Err(c.invalid(
                    name,
                    "expected a list of commands or key=value entries",
                ))
            }
        }
    }
    commands.extend(extra.into_iter().map(|kv| vm_command(verb, kv)));
    if !commands.is_empty() {
        c.set(name, Value::Array(commands));
    }
    Ok(())
}

fn vm_command(verb: &str, (key, value): (String, String)) -> Value {
    let key = key.strip_prefix("--").unwrap_or(&key);
    Value::from(vec![
        verb.to_string(),
        "{{.Name}}".to_string(),
        format!("--{}", key),
        value,
    ])
}

/// `vboxmanage` takes the `vm_settings` entries after its own commands.
fn vboxmanage(c: &mut Component) -> PacksmithResult<()> {
    let settings = vm_settings(c)?;
    vm_commands(c, "vboxmanage", "modifyvm", settings)?;
    vm_commands(c, "vboxmanage_post", "modifyvm", Vec::new())
}

/// Builds `vmx_data` from the explicit map overlaid with `vm_settings`.
fn vmx_data(c: &mut Component) -> PacksmithResult<()> {
    let mut data = Map::new();
    if let Some(explicit) = c.take_array("vmx_data") {
        match c.array_to_json(explicit) {
            Value::Object(map) => data.extend(map),
            _ => return Err(c.invalid("vmx_data", "expected a map")),
        }
    }
    for (key, value) in vm_settings(c)? {
        data.insert(key, Value::String(value));
    }
    if !data.is_empty() {
        c.set("vmx_data", Value::Object(data));
    }
    Ok(())
}
