//! Supported distributions and their release ISO descriptors.

use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{PacksmithError, PacksmithResult};

/// Supported operating system distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distro {
    CentOS,
    Debian,
    Ubuntu,
}

impl Distro {
    pub const ALL: [Distro; 3] = [Distro::CentOS, Distro::Debian, Distro::Ubuntu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Distro::CentOS => "centos",
            Distro::Debian => "debian",
            Distro::Ubuntu => "ubuntu",
        }
    }

    /// Whether a `base_url` must be configured for this distro.
    pub fn requires_base_url(&self) -> bool {
        !matches!(self, Distro::CentOS)
    }
}

impl fmt::Display for Distro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distro {
    type Err = PacksmithError;

    fn from_str(s: &str) -> PacksmithResult<Self> {
        let name = s.trim();
        Distro::ALL
            .into_iter()
            .find(|distro| distro.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| PacksmithError::UnsupportedDistro(s.to_string()))
    }
}

/// Hypervisor family whose guest OS naming a builder follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestFamily {
    Parallels,
    VirtualBox,
    Vmware,
}

/// ISO checksums keyed by checksum type, then by ISO file name.
pub type IsoChecksums = IndexMap<String, IndexMap<String, String>>;

/// Looks up the checksum of `file` for `checksum_type`.
pub fn lookup_checksum<'a>(
    checksums: &'a IsoChecksums,
    checksum_type: &str,
    file: &str,
) -> Option<&'a str> {
    checksums
        .get(checksum_type)
        .and_then(|files| files.get(file))
        .map(String::as_str)
}

/// Location of the install ISO for one release.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseIso {
    /// ISO file name, the key of the checksum tables
    pub name: String,
    pub url: String,
}

impl ReleaseIso {
    /// Computes the ISO descriptor for a distro release.
    ///
    /// # Arguments
    /// * `distro` - Distribution
    /// * `base_url` - Mirror base, normalized to end in `/`
    /// * `release`, `arch`, `image` - Release identity
    ///
    /// # Errors
    /// * `PacksmithError::IsoError` if a required part of the identity is empty
    pub fn new(
        distro: Distro,
        base_url: &str,
        release: &str,
        arch: &str,
        image: &str,
    ) -> PacksmithResult<Self> {
        for (field, value) in [("release", release), ("arch", arch), ("image", image)] {
            if value.is_empty() {
                return Err(PacksmithError::IsoError(format!(
                    "cannot locate the {} ISO without a {}",
                    distro, field
                )));
            }
        }

        let base = if base_url.is_empty() {
            default_base_url(distro)?
        } else {
            base_url.to_string()
        };
        let base = format!("{}/", base.trim_end_matches('/'));

        let (name, dir) = match distro {
            Distro::Ubuntu => (
                format!("ubuntu-{}-{}-{}.iso", release, image, arch),
                format!("{}{}/", base, release),
            ),
            Distro::CentOS => (
                format!("CentOS-{}-{}-{}.iso", release, arch, image),
                format!("{}{}/isos/{}/", base, release, arch),
            ),
            Distro::Debian => (
                format!("debian-{}-{}-{}.iso", release, arch, image),
                format!("{}{}/{}/iso-cd/", base, release, arch),
            ),
        };

        Ok(ReleaseIso {
            url: format!("{}{}", dir, name),
            name,
        })
    }
}

fn default_base_url(distro: Distro) -> PacksmithResult<String> {
    match distro {
        Distro::CentOS => Ok("http://mirror.centos.org/centos/".to_string()),
        _ => Err(PacksmithError::IsoError(format!("no base_url configured for {}", distro))),
    }
}

fn is_64_bit(arch: &str) -> bool {
    matches!(arch, "amd64" | "x86_64")
}

/// Returns the guest OS type a hypervisor expects for the distro and arch.
pub fn guest_os_type(distro: Distro, arch: &str, family: GuestFamily) -> String {
    let wide = is_64_bit(arch);
    match family {
        GuestFamily::Parallels => match distro {
            Distro::Ubuntu => "ubuntu",
            Distro::CentOS => "centos",
            Distro::Debian => "debian",
        }
        .to_string(),
        GuestFamily::VirtualBox => {
            let base = match distro {
                Distro::Ubuntu => "Ubuntu",
                Distro::CentOS => "RedHat",
                Distro::Debian => "Debian",
            };
            if wide {
                format!("{}_64", base)
            } else {
                base.to_string()
            }
        }
        GuestFamily::Vmware => {
            let base = match distro {
                Distro::Ubuntu => "ubuntu",
                Distro::CentOS => "centos",
                Distro::Debian => "debian",
            };
            if wide {
                format!("{}-64", base)
            } else {
                base.to_string()
            }
        }
    }
}
