//! Post-processor factories.

use serde_json::{Map, Value};

use crate::component::KeyKind::{Bool, Int, Path, Str};
use crate::component::{Component, Schema};
use crate::error::{PacksmithError, PacksmithResult, Section};
use crate::section::ComponentSection;
use crate::template::RawTemplate;

/// Post-processor types packsmith can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcessorKind {
    Atlas,
    Compress,
    DockerImport,
    DockerPush,
    DockerSave,
    DockerTag,
    Vagrant,
    VagrantCloud,
    VSphere,
}

impl PostProcessorKind {
    pub fn from_type(type_name: &str) -> Option<PostProcessorKind> {
        let kind = match type_name {
            "atlas" => PostProcessorKind::Atlas,
            "compress" => PostProcessorKind::Compress,
            "docker-import" => PostProcessorKind::DockerImport,
            "docker-push" => PostProcessorKind::DockerPush,
            "docker-save" => PostProcessorKind::DockerSave,
            "docker-tag" => PostProcessorKind::DockerTag,
            "vagrant" => PostProcessorKind::Vagrant,
            "vagrant-cloud" => PostProcessorKind::VagrantCloud,
            "vsphere" => PostProcessorKind::VSphere,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostProcessorKind::Atlas => "atlas",
            PostProcessorKind::Compress => "compress",
            PostProcessorKind::DockerImport => "docker-import",
            PostProcessorKind::DockerPush => "docker-push",
            PostProcessorKind::DockerSave => "docker-save",
            PostProcessorKind::DockerTag => "docker-tag",
            PostProcessorKind::Vagrant => "vagrant",
            PostProcessorKind::VagrantCloud => "vagrant-cloud",
            PostProcessorKind::VSphere => "vsphere",
        }
    }

    fn schema(&self) -> &'static Schema {
        match self {
            PostProcessorKind::Atlas => &ATLAS,
            PostProcessorKind::Compress => &COMPRESS,
            PostProcessorKind::DockerImport => &DOCKER_IMPORT,
            PostProcessorKind::DockerPush => &DOCKER_PUSH,
            PostProcessorKind::DockerSave => &DOCKER_SAVE,
            PostProcessorKind::DockerTag => &DOCKER_TAG,
            PostProcessorKind::Vagrant => &VAGRANT,
            PostProcessorKind::VagrantCloud => &VAGRANT_CLOUD,
            PostProcessorKind::VSphere => &VSPHERE,
        }
    }
}

/// Creates the Packer map of one post-processor.
pub fn create_post_processor(
    template: &RawTemplate,
    id: &str,
    type_name: &str,
    section: &ComponentSection,
) -> PacksmithResult<Map<String, Value>> {
    let kind =
        PostProcessorKind::from_type(type_name).ok_or_else(|| PacksmithError::UnsupportedComponent {
            section: Section::PostProcessor,
            id: id.to_string(),
            type_name: type_name.to_string(),
        })?;
    Component::new(template, Section::PostProcessor, id, kind.as_str(), section)
        .emit(kind.schema())
}

const ATLAS: Schema = Schema {
    required: &["artifact", "artifact_type"],
    keys: &[
        ("artifact", Str),
        ("artifact_type", Str),
        ("atlas_url", Str),
        ("keep_input_artifact", Bool),
        ("token", Str),
    ],
    arrays: &["except", "metadata", "only"],
    path_arrays: &[],
    communicator: false,
};

const COMPRESS: Schema = Schema {
    required: &["output"],
    keys: &[
        ("compression_level", Int),
        ("format", Str),
        ("keep_input_artifact", Bool),
        ("output", Str),
    ],
    arrays: &["except", "only"],
    path_arrays: &[],
    communicator: false,
};

const DOCKER_IMPORT: Schema = Schema {
    required: &["repository"],
    keys: &[
        ("keep_input_artifact", Bool),
        ("repository", Str),
        ("tag", Str),
    ],
    arrays: &["except", "only"],
    path_arrays: &[],
    communicator: false,
};

const DOCKER_PUSH: Schema = Schema {
    required: &[],
    keys: &[
        ("login", Bool),
        ("login_email", Str),
        ("login_password", Str),
        ("login_server", Str),
        ("login_username", Str),
    ],
    arrays: &["except", "only"],
    path_arrays: &[],
    communicator: false,
};

const DOCKER_SAVE: Schema = Schema {
    required: &["path"],
    keys: &[("keep_input_artifact", Bool), ("path", Str)],
    arrays: &["except", "only"],
    path_arrays: &[],
    communicator: false,
};

const DOCKER_TAG: Schema = Schema {
    required: &["repository"],
    keys: &[("force", Bool), ("repository", Str), ("tag", Str)],
    arrays: &["except", "only"],
    path_arrays: &[],
    communicator: false,
};

const VAGRANT: Schema = Schema {
    required: &[],
    keys: &[
        ("compression_level", Int),
        ("keep_input_artifact", Bool),
        ("output", Str),
        ("vagrantfile_template", Path),
    ],
    arrays: &["except", "only", "override"],
    path_arrays: &["include"],
    communicator: false,
};

const VAGRANT_CLOUD: Schema = Schema {
    required: &["access_token", "box_tag", "version"],
    keys: &[
        ("access_token", Str),
        ("box_download_url", Str),
        ("box_tag", Str),
        ("no_release", Str),
        ("vagrant_cloud_url", Str),
        ("version", Str),
        ("version_description", Str),
    ],
    arrays: &["except", "only"],
    path_arrays: &[],
    communicator: false,
};

const VSPHERE: Schema = Schema {
    required: &[
        "cluster",
        "datacenter",
        "datastore",
        "host",
        "password",
        "username",
        "vm_name",
    ],
    keys: &[
        ("cluster", Str),
        ("datacenter", Str),
        ("datastore", Str),
        ("disk_mode", Str),
        ("host", Str),
        ("insecure", Bool),
        ("password", Str),
        ("resource_pool", Str),
        ("username", Str),
        ("vm_folder", Str),
        ("vm_name", Str),
        ("vm_network", Str),
    ],
    arrays: &["except", "only"],
    path_arrays: &[],
    communicator: false,
};
