//! Configuration validation for deployment specs.
//!
//! This module validates a parsed configuration before anything is sent to
//! OCI: required values, OCID shapes, CIDR blocks and instance sizing.

use crate::error::{ConfigError, Result, RonzzError};
use std::net::Ipv4Addr;
use tracing::debug;

use super::spec::{non_blank, DeployConfig, ImageConfig, InstanceConfig, NetworkConfig};

/// Key types accepted in `ssh_authorized_keys`.
const SSH_KEY_TYPES: &[&str] = &[
    "ssh-rsa",
    "ssh-ed25519",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
];

/// Validator for deployment configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a deployment configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate(&self, config: &DeployConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if let Some(first_error) = result.errors.first() {
            return Err(RonzzError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }));
        }

        debug!("Configuration validation passed");
        Ok(result)
    }

    /// Runs every check and collects all errors and warnings.
    #[must_use]
    pub fn check(&self, config: &DeployConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_project(config, &mut result);
        Self::validate_oci(config, &mut result);
        Self::validate_network(&config.network, &mut result);
        Self::validate_image(&config.image, &mut result);
        Self::validate_instance(&config.instance, &mut result);

        result
    }

    /// Validates project configuration.
    fn validate_project(config: &DeployConfig, result: &mut ValidationResult) {
        let name = &config.project.name;
        if name.is_empty() {
            result.error("project.name", "Project name cannot be empty");
        } else if !is_valid_name(name) {
            result.error(
                "project.name",
                format!(
                    "Project name '{name}' is invalid. Must be lowercase alphanumeric with hyphens."
                ),
            );
        }

        if let Some(region) = non_blank(config.project.region.as_ref())
            && !region.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            result.error(
                "project.region",
                format!("Region '{region}' is not a valid OCI region identifier"),
            );
        }
    }

    /// Validates placement and access parameters.
    fn validate_oci(config: &DeployConfig, result: &mut ValidationResult) {
        let oci = &config.oci;

        match non_blank(oci.compartment_id.as_ref()) {
            None => result.error(
                "oci.compartment_id",
                "Missing required configuration value: compartment_id",
            ),
            Some(id) if !has_ocid_kind(id, &["compartment", "tenancy"]) => result.error(
                "oci.compartment_id",
                format!("'{id}' is not a compartment or tenancy OCID"),
            ),
            Some(_) => {}
        }

        if non_blank(oci.availability_domain.as_ref()).is_none() {
            result.error(
                "oci.availability_domain",
                "Missing required configuration value: availability_domain",
            );
        }

        match (
            non_blank(oci.ssh_public_key.as_ref()),
            non_blank(oci.ssh_public_key_file.as_ref()),
        ) {
            (None, None) => result.error(
                "oci.ssh_public_key",
                "Missing required configuration value: ssh_public_key",
            ),
            (Some(key), file) => {
                let key_type = key.split_whitespace().next().unwrap_or_default();
                if !SSH_KEY_TYPES.contains(&key_type) {
                    result.error(
                        "oci.ssh_public_key",
                        format!("Unsupported SSH key type '{key_type}'"),
                    );
                }
                if file.is_some() {
                    result.warn("oci.ssh_public_key_file is ignored because ssh_public_key is set");
                }
            }
            (None, Some(_)) => {}
        }
    }

    /// Validates network configuration.
    fn validate_network(network: &NetworkConfig, result: &mut ValidationResult) {
        let subnet_id = non_blank(network.subnet_id.as_ref());
        let vcn_id = non_blank(network.vcn_id.as_ref());

        if let Some(id) = subnet_id
            && !has_ocid_kind(id, &["subnet"])
        {
            result.error("network.subnet_id", format!("'{id}' is not a subnet OCID"));
        }

        if let Some(id) = vcn_id
            && !has_ocid_kind(id, &["vcn"])
        {
            result.error("network.vcn_id", format!("'{id}' is not a VCN OCID"));
        }

        if subnet_id.is_some() && vcn_id.is_some() {
            result.warn("network.vcn_id is ignored because network.subnet_id is set");
        }

        let vcn = parse_cidr(&network.vcn_cidr);
        let subnet = parse_cidr(&network.subnet_cidr);

        if vcn.is_none() {
            result.error(
                "network.vcn_cidr",
                format!("'{}' is not a valid IPv4 CIDR block", network.vcn_cidr),
            );
        }
        if subnet.is_none() {
            result.error(
                "network.subnet_cidr",
                format!("'{}' is not a valid IPv4 CIDR block", network.subnet_cidr),
            );
        }
        if parse_cidr(&network.ingress_source).is_none() {
            result.error(
                "network.ingress_source",
                format!("'{}' is not a valid IPv4 CIDR block", network.ingress_source),
            );
        }

        // A reused VCN has its own CIDR, so containment is only checked for a new one.
        if vcn_id.is_none()
            && let (Some(vcn), Some(subnet)) = (vcn, subnet)
            && !vcn.contains(&subnet)
        {
            result.error(
                "network.subnet_cidr",
                format!(
                    "Subnet CIDR {} is not inside VCN CIDR {}",
                    network.subnet_cidr, network.vcn_cidr
                ),
            );
        }

        for port in &network.extra_tcp_ports {
            if *port == 0 {
                result.error("network.extra_tcp_ports", "Port 0 is not allowed");
            } else if *port == 22 {
                result.warn("Port 22 is always open; listing it in extra_tcp_ports is redundant");
            }
        }
    }

    /// Validates image selection.
    fn validate_image(image: &ImageConfig, result: &mut ValidationResult) {
        if image.operating_system.trim().is_empty() {
            result.error("image.operating_system", "Operating system cannot be empty");
        }
        if image.operating_system_version.trim().is_empty() {
            result.error(
                "image.operating_system_version",
                "Operating system version cannot be empty",
            );
        }
        if image.search_limit == 0 || image.search_limit > 1000 {
            result.error(
                "image.search_limit",
                format!("Search limit {} must be between 1 and 1000", image.search_limit),
            );
        }
    }

    /// Validates instance sizing.
    fn validate_instance(instance: &InstanceConfig, result: &mut ValidationResult) {
        if instance.shape.trim().is_empty() {
            result.error("instance.shape", "Shape cannot be empty");
        }

        if instance.is_flexible() {
            if instance.ocpus <= 0.0 {
                result.error("instance.ocpus", "OCPU count must be positive");
            }
            if instance.memory_in_gbs <= 0.0 {
                result.error("instance.memory_in_gbs", "Memory must be positive");
            }
        } else {
            result.warn(format!(
                "Shape {} is not flexible; ocpus and memory_in_gbs are ignored",
                instance.shape
            ));
        }

        if instance.poll_interval_secs == 0 {
            result.error("instance.poll_interval_secs", "Poll interval must be at least 1 second");
        }
        if instance.wait_timeout_secs < instance.poll_interval_secs {
            result.error(
                "instance.wait_timeout_secs",
                "Wait timeout must not be shorter than the poll interval",
            );
        }
    }
}

impl ValidationResult {
    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validates that a name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens, starting with a letter.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }

    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return false;
    }

    !name.ends_with('-') && !name.contains("--")
}

/// Checks that `id` looks like `ocid1.<kind>.<realm>...` for one of `kinds`.
fn has_ocid_kind(id: &str, kinds: &[&str]) -> bool {
    let mut parts = id.split('.');
    parts.next() == Some("ocid1")
        && parts.next().is_some_and(|kind| kinds.contains(&kind))
        && parts.next().is_some()
}

/// An IPv4 CIDR block.
#[derive(Debug, Clone, Copy)]
struct Cidr {
    network: u32,
    prefix: u8,
}

impl Cidr {
    const fn mask(self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix)
        }
    }

    const fn contains(&self, other: &Self) -> bool {
        other.prefix >= self.prefix && (other.network & self.mask()) == (self.network & self.mask())
    }
}

fn parse_cidr(value: &str) -> Option<Cidr> {
    let (addr, prefix) = value.split_once('/')?;
    let addr: Ipv4Addr = addr.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    (prefix <= 32).then(|| Cidr {
        network: u32::from(addr),
        prefix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> DeployConfig {
        let mut config = DeployConfig::default();
        config.oci.compartment_id = Some(String::from("ocid1.compartment.oc1..aaaa"));
        config.oci.availability_domain = Some(String::from("Uocm:EU-FRANKFURT-1-AD-1"));
        config.oci.ssh_public_key = Some(String::from("ssh-rsa AAAAB3Nza user@host"));
        config
    }

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("ronzz"));
        assert!(is_valid_name("web-box-2"));
        assert!(is_valid_name("a"));
    }

    #[test]
    fn test_invalid_name() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("Ronzz")); // uppercase
        assert!(!is_valid_name("1box")); // starts with number
        assert!(!is_valid_name("web_box")); // underscore
        assert!(!is_valid_name("box-")); // ends with hyphen
        assert!(!is_valid_name("web--box")); // consecutive hyphens
    }

    #[test]
    fn test_default_config_with_required_values_is_valid() {
        let result = ConfigValidator::new().validate(&valid_config()).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_missing_required_values_all_reported() {
        let result = ConfigValidator::new().check(&DeployConfig::default());
        let fields: Vec<_> = result.errors.iter().map(|e| e.field.as_str()).collect();

        assert!(fields.contains(&"oci.compartment_id"));
        assert!(fields.contains(&"oci.availability_domain"));
        assert!(fields.contains(&"oci.ssh_public_key"));
    }

    #[test]
    fn test_first_error_is_returned() {
        let mut config = valid_config();
        config.network.subnet_id = Some(String::from("ocid1.vcn.oc1..wrong"));

        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(err.to_string().contains("ocid1.vcn.oc1..wrong"));
    }

    #[test]
    fn test_tenancy_ocid_accepted_as_compartment() {
        let mut config = valid_config();
        config.oci.compartment_id = Some(String::from("ocid1.tenancy.oc1..root"));
        assert!(ConfigValidator::new().check(&config).is_valid());
    }

    #[test]
    fn test_subnet_outside_vcn_rejected() {
        let mut config = valid_config();
        config.network.subnet_cidr = String::from("192.168.1.0/24");

        let result = ConfigValidator::new().check(&config);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors[0].field, "network.subnet_cidr");
    }

    #[test]
    fn test_subnet_cidr_not_checked_against_reused_vcn() {
        let mut config = valid_config();
        config.network.vcn_id = Some(String::from("ocid1.vcn.oc1..existing"));
        config.network.subnet_cidr = String::from("192.168.1.0/24");

        assert!(ConfigValidator::new().check(&config).is_valid());
    }

    #[test]
    fn test_unknown_ssh_key_type() {
        let mut config = valid_config();
        config.oci.ssh_public_key = Some(String::from("not-a-key"));

        let result = ConfigValidator::new().check(&config);
        assert_eq!(result.errors[0].field, "oci.ssh_public_key");
    }

    #[test]
    fn test_fixed_shape_warns_about_sizing() {
        let mut config = valid_config();
        config.instance.shape = String::from("VM.Standard.E2.1.Micro");

        let result = ConfigValidator::new().check(&config);
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 1);
    }

    #[test]
    fn test_parse_cidr() {
        let vcn = parse_cidr("10.0.0.0/16").unwrap();
        let inside = parse_cidr("10.0.1.0/24").unwrap();
        let outside = parse_cidr("10.1.0.0/24").unwrap();

        assert!(vcn.contains(&inside));
        assert!(!vcn.contains(&outside));
        assert!(!inside.contains(&vcn));
        assert!(parse_cidr("0.0.0.0/0").is_some());
        assert!(parse_cidr("10.0.0.0/33").is_none());
        assert!(parse_cidr("10.0.0.0").is_none());
    }

    #[test]
    fn test_has_ocid_kind() {
        assert!(has_ocid_kind("ocid1.subnet.oc1.eu-frankfurt-1.aaaa", &["subnet"]));
        assert!(!has_ocid_kind("ocid1.subnet", &["subnet"]));
        assert!(!has_ocid_kind("subnet-123", &["subnet"]));
    }
}
