//! Configuration hashing for change detection.
//!
//! The hash covers every input that shapes a created resource, so a stored
//! hash that no longer matches tells `preview` and `apply` that recorded
//! resources were declared from a different configuration.

use sha2::{Digest, Sha256};

use super::inputs::DeployInputs;

/// Hasher for computing configuration hashes.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new configuration hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of the resolved deployment inputs.
    #[must_use]
    pub fn hash_inputs(&self, inputs: &DeployInputs) -> String {
        let mut hasher = Sha256::new();

        // Placement
        field(&mut hasher, &inputs.project);
        field(&mut hasher, &inputs.region);
        field(&mut hasher, &inputs.compartment_id);
        field(&mut hasher, &inputs.availability_domain);
        field(&mut hasher, &inputs.ssh_public_key);

        // Network
        optional(&mut hasher, inputs.vcn_id.as_deref());
        optional(&mut hasher, inputs.subnet_id.as_deref());
        field(&mut hasher, &inputs.network.vcn_cidr);
        field(&mut hasher, &inputs.network.subnet_cidr);
        field(&mut hasher, &inputs.network.ingress_source);

        // Ports (sorted for determinism)
        let mut ports = inputs.network.extra_tcp_ports.clone();
        ports.sort_unstable();
        ports.dedup();
        for port in ports {
            hasher.update(port.to_be_bytes());
        }
        hasher.update([0u8]);

        // Image
        optional(&mut hasher, inputs.image.as_deref());
        field(&mut hasher, &inputs.image_filter.operating_system);
        field(&mut hasher, &inputs.image_filter.operating_system_version);

        // Instance
        field(&mut hasher, &inputs.instance.shape);
        if inputs.is_flexible_shape() {
            hasher.update(inputs.instance.ocpus.to_be_bytes());
            hasher.update(inputs.instance.memory_in_gbs.to_be_bytes());
        }
        hasher.update(if inputs.instance.assign_public_ip { [1u8] } else { [0u8] });

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }

    /// Compares two hashes to determine if they are equal.
    #[must_use]
    pub fn hashes_match(hash1: &str, hash2: &str) -> bool {
        if hash1.len() != hash2.len() {
            return false;
        }

        hash1
            .bytes()
            .zip(hash2.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// Hashes a string followed by a separator so adjacent fields cannot collide.
fn field(hasher: &mut Sha256, value: &str) {
    hasher.update(value.as_bytes());
    hasher.update([0u8]);
}

fn optional(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            field(hasher, v);
        }
        None => hasher.update([0u8]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use std::path::Path;

    fn inputs() -> DeployInputs {
        let mut config = DeployConfig::default();
        config.oci.compartment_id = Some(String::from("ocid1.compartment.x"));
        config.oci.availability_domain = Some(String::from("AD-1"));
        config.oci.ssh_public_key = Some(String::from("ssh-rsa AAAA..."));
        DeployInputs::resolve(&config, "eu-frankfurt-1", Path::new(".")).unwrap()
    }

    #[test]
    fn test_hash_deterministic() {
        let hasher = ConfigHasher::new();
        assert_eq!(hasher.hash_inputs(&inputs()), hasher.hash_inputs(&inputs()));
    }

    #[test]
    fn test_changed_inputs_change_hash() {
        let hasher = ConfigHasher::new();
        let base = inputs();

        let mut other = base.clone();
        other.subnet_id = Some(String::from("ocid1.subnet.x"));
        assert_ne!(hasher.hash_inputs(&base), hasher.hash_inputs(&other));

        let mut other = base.clone();
        other.instance.ocpus = 2.0;
        assert_ne!(hasher.hash_inputs(&base), hasher.hash_inputs(&other));
    }

    #[test]
    fn test_port_order_does_not_matter() {
        let hasher = ConfigHasher::new();
        let mut a = inputs();
        a.network.extra_tcp_ports = vec![80, 443];
        let mut b = inputs();
        b.network.extra_tcp_ports = vec![443, 80];

        assert_eq!(hasher.hash_inputs(&a), hasher.hash_inputs(&b));
    }

    #[test]
    fn test_short_hash() {
        let hasher = ConfigHasher::new();
        let short = hasher.short_hash("abcdef1234567890abcdef1234567890");

        assert_eq!(short, "abcdef12");
    }

    #[test]
    fn test_hashes_match() {
        assert!(ConfigHasher::hashes_match("abc123", "abc123"));
        assert!(!ConfigHasher::hashes_match("abc123", "abc124"));
        assert!(!ConfigHasher::hashes_match("abc123", "abc12"));
    }
}
