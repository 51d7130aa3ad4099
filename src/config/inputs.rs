//! Resolved deployment inputs.
//!
//! [`DeployInputs`] is the validated, fully-resolved view of the
//! configuration that the provisioning steps consume: required values are
//! present, blank optionals are dropped and the SSH key file has been read.

use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{ConfigError, Result, RonzzError};

use super::parser::expand_path;
use super::spec::{non_blank, DeployConfig};

/// Maximum length of an OCI DNS label.
const DNS_LABEL_MAX: usize = 15;

/// Catalog filter used to find boot images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageFilter {
    /// Operating system name (e.g. `Canonical Ubuntu`).
    pub operating_system: String,
    /// Operating system version (e.g. `24.04`).
    pub operating_system_version: String,
    /// Shape the image must be compatible with.
    pub shape: String,
}

/// Layout of a newly created network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkLayout {
    /// VCN CIDR block.
    pub vcn_cidr: String,
    /// Subnet CIDR block.
    pub subnet_cidr: String,
    /// Source CIDR for ingress rules.
    pub ingress_source: String,
    /// TCP ports opened in addition to SSH.
    pub extra_tcp_ports: Vec<u16>,
}

/// Shape and sizing of the compute instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSizing {
    /// Compute shape.
    pub shape: String,
    /// OCPU count, sent only for flexible shapes.
    pub ocpus: f32,
    /// Memory in GB, sent only for flexible shapes.
    pub memory_in_gbs: f32,
    /// Whether the primary VNIC gets a public IP.
    pub assign_public_ip: bool,
}

/// How long to wait for resources to reach a lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Overall timeout.
    pub timeout: Duration,
    /// Interval between polls.
    pub poll_interval: Duration,
}

/// Validated deployment inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployInputs {
    /// Project name used as display-name prefix.
    pub project: String,
    /// OCI region the deployment targets.
    pub region: String,
    /// Compartment OCID.
    pub compartment_id: String,
    /// Availability domain for the instance.
    pub availability_domain: String,
    /// SSH public key installed on the instance.
    pub ssh_public_key: String,
    /// Existing VCN to reuse.
    pub vcn_id: Option<String>,
    /// Existing subnet to reuse.
    pub subnet_id: Option<String>,
    /// Image OCID or display name requested by the user.
    pub image: Option<String>,
    /// Catalog filter for image lookups.
    pub image_filter: ImageFilter,
    /// Number of images scanned by the display-name fallback.
    pub image_search_limit: u32,
    /// Network layout for created resources.
    pub network: NetworkLayout,
    /// Instance shape and sizing.
    pub instance: InstanceSizing,
    /// Lifecycle wait policy.
    #[serde(skip)]
    pub wait: WaitPolicy,
}

impl DeployInputs {
    /// Resolves inputs from a parsed configuration.
    ///
    /// `default_region` is used when the configuration does not name a region.
    /// Relative key file paths are resolved against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if a required value is missing or the SSH key file
    /// cannot be read.
    pub fn resolve(config: &DeployConfig, default_region: &str, base_dir: &Path) -> Result<Self> {
        let compartment_id = non_blank(config.oci.compartment_id.as_ref())
            .ok_or_else(|| ConfigError::missing("compartment_id"))?;
        let availability_domain = non_blank(config.oci.availability_domain.as_ref())
            .ok_or_else(|| ConfigError::missing("availability_domain"))?;
        let ssh_public_key = Self::resolve_ssh_key(config, base_dir)?;

        let region = non_blank(config.project.region.as_ref())
            .or_else(|| Some(default_region.trim()).filter(|r| !r.is_empty()))
            .ok_or_else(|| ConfigError::missing("project.region"))?;

        Ok(Self {
            project: config.project.name.clone(),
            region: region.to_string(),
            compartment_id: compartment_id.to_string(),
            availability_domain: availability_domain.to_string(),
            ssh_public_key,
            vcn_id: non_blank(config.network.vcn_id.as_ref()).map(String::from),
            subnet_id: non_blank(config.network.subnet_id.as_ref()).map(String::from),
            image: non_blank(config.image.id.as_ref()).map(String::from),
            image_filter: ImageFilter {
                operating_system: config.image.operating_system.clone(),
                operating_system_version: config.image.operating_system_version.clone(),
                shape: config.instance.shape.clone(),
            },
            image_search_limit: config.image.search_limit,
            network: NetworkLayout {
                vcn_cidr: config.network.vcn_cidr.clone(),
                subnet_cidr: config.network.subnet_cidr.clone(),
                ingress_source: config.network.ingress_source.clone(),
                extra_tcp_ports: config.network.extra_tcp_ports.clone(),
            },
            instance: InstanceSizing {
                shape: config.instance.shape.clone(),
                ocpus: config.instance.ocpus,
                memory_in_gbs: config.instance.memory_in_gbs,
                assign_public_ip: config.instance.assign_public_ip,
            },
            wait: WaitPolicy {
                timeout: Duration::from_secs(config.instance.wait_timeout_secs),
                poll_interval: Duration::from_secs(config.instance.poll_interval_secs),
            },
        })
    }

    /// Reads the SSH key from the inline value or the key file.
    fn resolve_ssh_key(config: &DeployConfig, base_dir: &Path) -> Result<String> {
        if let Some(key) = non_blank(config.oci.ssh_public_key.as_ref()) {
            return Ok(key.to_string());
        }

        let Some(file) = non_blank(config.oci.ssh_public_key_file.as_ref()) else {
            return Err(ConfigError::missing("ssh_public_key").into());
        };

        let path = expand_path(file, base_dir);
        debug!("Reading SSH public key from: {}", path.display());

        let content = std::fs::read_to_string(&path).map_err(|e| {
            RonzzError::Config(ConfigError::validation(
                format!("Cannot read SSH public key file {}: {e}", path.display()),
                "oci.ssh_public_key_file",
            ))
        })?;

        let key = content.trim();
        if key.is_empty() {
            return Err(ConfigError::validation(
                format!("SSH public key file {} is empty", path.display()),
                "oci.ssh_public_key_file",
            )
            .into());
        }

        Ok(key.to_string())
    }

    /// Returns true if the shape takes an explicit OCPU/memory configuration.
    #[must_use]
    pub fn is_flexible_shape(&self) -> bool {
        self.instance.shape.ends_with(".Flex")
    }

    /// Returns the display name for a resource suffix, e.g. `ronzz-vcn`.
    #[must_use]
    pub fn display_name(&self, suffix: &str) -> String {
        format!("{}-{suffix}", self.project)
    }

    /// DNS label for the VCN: the project name reduced to lowercase alphanumerics.
    #[must_use]
    pub fn vcn_dns_label(&self) -> String {
        dns_label(&self.project, "")
    }

    /// DNS label for the subnet.
    #[must_use]
    pub fn subnet_dns_label(&self) -> String {
        dns_label(&self.project, "subnet")
    }
}

/// Builds a DNS label: starts with a letter, alphanumeric only, at most 15 characters.
fn dns_label(base: &str, suffix: &str) -> String {
    let mut label: String = base
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .skip_while(char::is_ascii_digit)
        .collect();

    if label.is_empty() {
        label.push('n');
    }

    let budget = DNS_LABEL_MAX.saturating_sub(suffix.len());
    label.truncate(budget.max(1));
    label.push_str(suffix);
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_required() -> DeployConfig {
        let mut config = DeployConfig::default();
        config.oci.compartment_id = Some(String::from("ocid1.compartment.x"));
        config.oci.availability_domain = Some(String::from("AD-1"));
        config.oci.ssh_public_key = Some(String::from("ssh-rsa AAAA..."));
        config
    }

    #[test]
    fn test_resolve_required_values() {
        let inputs =
            DeployInputs::resolve(&config_with_required(), "eu-frankfurt-1", Path::new(".")).unwrap();

        assert_eq!(inputs.compartment_id, "ocid1.compartment.x");
        assert_eq!(inputs.availability_domain, "AD-1");
        assert_eq!(inputs.ssh_public_key, "ssh-rsa AAAA...");
        assert_eq!(inputs.region, "eu-frankfurt-1");
        assert!(inputs.subnet_id.is_none());
        assert!(inputs.is_flexible_shape());
        assert_eq!(inputs.wait.timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_missing_compartment_names_key() {
        let mut config = config_with_required();
        config.oci.compartment_id = Some(String::from("  "));

        let err = DeployInputs::resolve(&config, "r", Path::new(".")).unwrap_err();
        assert!(matches!(
            err,
            RonzzError::Config(ConfigError::MissingValue { ref key }) if key == "compartment_id"
        ));
    }

    #[test]
    fn test_missing_ssh_key() {
        let mut config = config_with_required();
        config.oci.ssh_public_key = None;

        let err = DeployInputs::resolve(&config, "r", Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("ssh_public_key"));
    }

    #[test]
    fn test_ssh_key_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("id.pub"), "ssh-ed25519 AAAAC3 me@box\n").unwrap();

        let mut config = config_with_required();
        config.oci.ssh_public_key = None;
        config.oci.ssh_public_key_file = Some(String::from("id.pub"));

        let inputs = DeployInputs::resolve(&config, "r", dir.path()).unwrap();
        assert_eq!(inputs.ssh_public_key, "ssh-ed25519 AAAAC3 me@box");
    }

    #[test]
    fn test_region_override() {
        let mut config = config_with_required();
        config.project.region = Some(String::from("us-ashburn-1"));

        let inputs = DeployInputs::resolve(&config, "eu-frankfurt-1", Path::new(".")).unwrap();
        assert_eq!(inputs.region, "us-ashburn-1");
    }

    #[test]
    fn test_blank_region_everywhere_is_missing() {
        let err = DeployInputs::resolve(&config_with_required(), " ", Path::new(".")).unwrap_err();
        assert!(matches!(
            err,
            RonzzError::Config(ConfigError::MissingValue { ref key }) if key == "project.region"
        ));

        let mut config = config_with_required();
        config.project.region = Some(String::from("ap-tokyo-1"));
        let inputs = DeployInputs::resolve(&config, "", Path::new(".")).unwrap();
        assert_eq!(inputs.region, "ap-tokyo-1");
    }

    #[test]
    fn test_names_and_dns_labels() {
        let inputs =
            DeployInputs::resolve(&config_with_required(), "r", Path::new(".")).unwrap();

        assert_eq!(inputs.display_name("vcn"), "ronzz-vcn");
        assert_eq!(inputs.vcn_dns_label(), "ronzz");
        assert_eq!(inputs.subnet_dns_label(), "ronzzsubnet");
    }

    #[test]
    fn test_dns_label_limits() {
        assert_eq!(dns_label("my-very-long-project-name", ""), "myverylongproje");
        assert_eq!(dns_label("my-very-long-project-name", "subnet"), "myverylonsubnet");
        assert_eq!(dns_label("42-web", ""), "web");
        assert_eq!(dns_label("---", ""), "n");
    }
}
