//! Configuration file types for the deployment tool.
//!
//! This module defines the structs that map to the `ronzz.deploy.yaml` file.
//! Required deployment parameters are optional at this level so that
//! environment overrides can fill them in before validation.

use serde::{Deserialize, Serialize};

/// Default project name, used as a prefix for every display name.
pub const DEFAULT_PROJECT_NAME: &str = "ronzz";

/// Default operating system searched in the image catalog.
pub const DEFAULT_OPERATING_SYSTEM: &str = "Canonical Ubuntu";

/// Default operating system version searched in the image catalog.
pub const DEFAULT_OPERATING_SYSTEM_VERSION: &str = "24.04";

/// Default compute shape.
pub const DEFAULT_SHAPE: &str = "VM.Standard.A1.Flex";

/// The root configuration structure for a Ronzz deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeployConfig {
    /// Project-level configuration.
    #[serde(default)]
    pub project: ProjectConfig,
    /// Tenancy placement and access parameters.
    #[serde(default)]
    pub oci: OciConfig,
    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Boot image selection.
    #[serde(default)]
    pub image: ImageConfig,
    /// Compute instance configuration.
    #[serde(default)]
    pub instance: InstanceConfig,
    /// State file configuration.
    #[serde(default)]
    pub state: StateConfig,
}

/// Project-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Name used as the prefix of all display names.
    #[serde(default = "default_project_name")]
    pub name: String,
    /// OCI region override (defaults to the credentials' region).
    #[serde(default)]
    pub region: Option<String>,
}

/// Placement and access parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct OciConfig {
    /// Compartment OCID (required).
    #[serde(default)]
    pub compartment_id: Option<String>,
    /// Availability domain name (required).
    #[serde(default)]
    pub availability_domain: Option<String>,
    /// Inline SSH public key.
    #[serde(default)]
    pub ssh_public_key: Option<String>,
    /// Path to an SSH public key file, used when no inline key is given.
    #[serde(default)]
    pub ssh_public_key_file: Option<String>,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Existing VCN to place new network resources in.
    #[serde(default)]
    pub vcn_id: Option<String>,
    /// Existing subnet; when set, no network resources are created.
    #[serde(default)]
    pub subnet_id: Option<String>,
    /// CIDR block for a newly created VCN.
    #[serde(default = "default_vcn_cidr")]
    pub vcn_cidr: String,
    /// CIDR block for a newly created subnet.
    #[serde(default = "default_subnet_cidr")]
    pub subnet_cidr: String,
    /// Source CIDR allowed by the ingress rules.
    #[serde(default = "default_any_cidr")]
    pub ingress_source: String,
    /// Extra TCP ports opened in addition to SSH.
    #[serde(default)]
    pub extra_tcp_ports: Vec<u16>,
}

/// Boot image selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageConfig {
    /// Image OCID or display name. When absent the newest catalog image is used.
    #[serde(default)]
    pub id: Option<String>,
    /// Operating system to search for.
    #[serde(default = "default_operating_system")]
    pub operating_system: String,
    /// Operating system version to search for.
    #[serde(default = "default_operating_system_version")]
    pub operating_system_version: String,
    /// Number of newest images scanned by the display-name fallback.
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
}

/// Compute instance configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceConfig {
    /// Compute shape.
    #[serde(default = "default_shape")]
    pub shape: String,
    /// OCPU count (flexible shapes only).
    #[serde(default = "default_ocpus")]
    pub ocpus: f32,
    /// Memory in GB (flexible shapes only).
    #[serde(default = "default_memory_in_gbs")]
    pub memory_in_gbs: f32,
    /// Whether the primary VNIC gets a public IP.
    #[serde(default = "default_assign_public_ip")]
    pub assign_public_ip: bool,
    /// Maximum time to wait for a resource to become ready.
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,
    /// Interval between lifecycle polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

/// State file configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StateConfig {
    /// Directory holding the state file (defaults to `.ronzz` next to the config).
    #[serde(default)]
    pub path: Option<String>,
}

// Default value functions

fn default_project_name() -> String {
    String::from(DEFAULT_PROJECT_NAME)
}

fn default_vcn_cidr() -> String {
    String::from("10.0.0.0/16")
}

fn default_subnet_cidr() -> String {
    String::from("10.0.1.0/24")
}

fn default_any_cidr() -> String {
    String::from("0.0.0.0/0")
}

fn default_operating_system() -> String {
    String::from(DEFAULT_OPERATING_SYSTEM)
}

fn default_operating_system_version() -> String {
    String::from(DEFAULT_OPERATING_SYSTEM_VERSION)
}

const fn default_search_limit() -> u32 {
    50
}

fn default_shape() -> String {
    String::from(DEFAULT_SHAPE)
}

const fn default_ocpus() -> f32 {
    1.0
}

const fn default_memory_in_gbs() -> f32 {
    6.0
}

const fn default_assign_public_ip() -> bool {
    true
}

const fn default_wait_timeout() -> u64 {
    600
}

const fn default_poll_interval() -> u64 {
    5
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            region: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            vcn_id: None,
            subnet_id: None,
            vcn_cidr: default_vcn_cidr(),
            subnet_cidr: default_subnet_cidr(),
            ingress_source: default_any_cidr(),
            extra_tcp_ports: Vec::new(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            id: None,
            operating_system: default_operating_system(),
            operating_system_version: default_operating_system_version(),
            search_limit: default_search_limit(),
        }
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            shape: default_shape(),
            ocpus: default_ocpus(),
            memory_in_gbs: default_memory_in_gbs(),
            assign_public_ip: default_assign_public_ip(),
            wait_timeout_secs: default_wait_timeout(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl InstanceConfig {
    /// Returns true if the shape accepts an explicit OCPU/memory configuration.
    #[must_use]
    pub fn is_flexible(&self) -> bool {
        self.shape.ends_with(".Flex")
    }
}

/// Returns the value if it is present and not blank.
#[must_use]
pub fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}
