//! Configuration parser for loading and merging configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, Result, RonzzError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::DeployConfig;

/// Configuration parser for loading deployment configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(RonzzError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            RonzzError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// An empty document yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<DeployConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(DeployConfig::default());
        }

        let config: DeployConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            RonzzError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Successfully parsed configuration for project: {}", config.project.name);
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Environment variables use the form `RONZZ_<KEY>`, e.g.
    /// `RONZZ_COMPARTMENT_ID` or `RONZZ_SUBNET_ID`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }

    /// Applies environment overrides using the given variable lookup.
    pub fn apply_env_overrides(config: &mut DeployConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("RONZZ_PROJECT_NAME") {
            debug!("Overriding project.name from environment");
            config.project.name = name;
        }

        if let Some(region) = lookup("RONZZ_REGION") {
            debug!("Overriding project.region from environment");
            config.project.region = Some(region);
        }

        if let Some(compartment) = lookup("RONZZ_COMPARTMENT_ID") {
            debug!("Overriding oci.compartment_id from environment");
            config.oci.compartment_id = Some(compartment);
        }

        if let Some(ad) = lookup("RONZZ_AVAILABILITY_DOMAIN") {
            debug!("Overriding oci.availability_domain from environment");
            config.oci.availability_domain = Some(ad);
        }

        if let Some(key) = lookup("RONZZ_SSH_PUBLIC_KEY") {
            debug!("Overriding oci.ssh_public_key from environment");
            config.oci.ssh_public_key = Some(key);
        }

        if let Some(vcn) = lookup("RONZZ_VCN_ID") {
            debug!("Overriding network.vcn_id from environment");
            config.network.vcn_id = Some(vcn);
        }

        if let Some(subnet) = lookup("RONZZ_SUBNET_ID") {
            debug!("Overriding network.subnet_id from environment");
            config.network.subnet_id = Some(subnet);
        }

        if let Some(image) = lookup("RONZZ_IMAGE_ID") {
            debug!("Overriding image.id from environment");
            config.image.id = Some(image);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                RonzzError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Returns the directory that relative paths are resolved against.
    #[must_use]
    pub fn base_dir(&self) -> PathBuf {
        self.base_path.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "ronzz.deploy.yaml",
    "ronzz.deploy.yml",
    "deploy.yaml",
    "deploy.yml",
];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(RonzzError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

/// Expands a leading `~` to the user's home directory and resolves
/// relative paths against `base`.
#[must_use]
pub fn expand_path(path: &str, base: &Path) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }

    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }

    let candidate = PathBuf::from(path);
    if candidate.is_absolute() {
        candidate
    } else {
        base.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
oci:
  compartment_id: ocid1.compartment.oc1..example
  availability_domain: "Uocm:EU-FRANKFURT-1-AD-1"
  ssh_public_key: "ssh-ed25519 AAAAC3Nza user@host"
"#;
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(config.project.name, "ronzz");
        assert_eq!(
            config.oci.compartment_id.as_deref(),
            Some("ocid1.compartment.oc1..example")
        );
        assert!(config.network.subnet_id.is_none());
        assert!(config.image.id.is_none());
        assert_eq!(config.instance.shape, "VM.Standard.A1.Flex");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
project:
  name: webbox
  region: us-ashburn-1

oci:
  compartment_id: ocid1.compartment.oc1..example
  availability_domain: "Uocm:US-ASHBURN-AD-2"
  ssh_public_key_file: ~/.ssh/id_ed25519.pub

network:
  vcn_cidr: 172.16.0.0/16
  subnet_cidr: 172.16.5.0/24
  extra_tcp_ports: [80, 443]

image:
  id: "Oracle-Linux-8.9-aarch64-2024.01.26-0"
  operating_system: Oracle Linux
  operating_system_version: "8"

instance:
  shape: VM.Standard.A1.Flex
  ocpus: 4
  memory_in_gbs: 24
"#;
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(config.project.name, "webbox");
        assert_eq!(config.project.region.as_deref(), Some("us-ashburn-1"));
        assert_eq!(config.network.extra_tcp_ports, vec![80, 443]);
        assert_eq!(config.image.operating_system, "Oracle Linux");
        assert!((config.instance.ocpus - 4.0).abs() < f32::EPSILON);
        assert!((config.instance.memory_in_gbs - 24.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_init_template_parses_to_defaults() {
        let parser = ConfigParser::new();
        let config = parser
            .parse_yaml(include_str!("../../templates/ronzz.deploy.yaml"), None)
            .unwrap();

        assert_eq!(config.network, DeployConfig::default().network);
        assert_eq!(config.image, DeployConfig::default().image);
        assert_eq!(config.instance, DeployConfig::default().instance);
        assert_eq!(config.oci.ssh_public_key_file.as_deref(), Some("~/.ssh/id_rsa.pub"));
    }

    #[test]
    fn test_empty_document_is_default() {
        let parser = ConfigParser::new();
        let config = parser.parse_yaml("   \n", None).unwrap();
        assert_eq!(config, DeployConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let parser = ConfigParser::new();
        let result = parser.parse_yaml("instance: [unclosed", None);
        assert!(matches!(
            result,
            Err(RonzzError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RONZZ_COMPARTMENT_ID", "ocid1.compartment.x"),
            ("RONZZ_AVAILABILITY_DOMAIN", "AD-1"),
            ("RONZZ_SUBNET_ID", "ocid1.subnet.oc1..abc"),
            ("RONZZ_IMAGE_ID", "ocid1.image.oc1..img"),
        ]
        .into_iter()
        .collect();

        let mut config = DeployConfig::default();
        ConfigParser::apply_env_overrides(&mut config, |name| {
            vars.get(name).map(|v| (*v).to_string())
        });

        assert_eq!(config.oci.compartment_id.as_deref(), Some("ocid1.compartment.x"));
        assert_eq!(config.oci.availability_domain.as_deref(), Some("AD-1"));
        assert_eq!(config.network.subnet_id.as_deref(), Some("ocid1.subnet.oc1..abc"));
        assert_eq!(config.image.id.as_deref(), Some("ocid1.image.oc1..img"));
        assert!(config.network.vcn_id.is_none());
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("ronzz.deploy.yaml"), "").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("ronzz.deploy.yaml"));
    }

    #[test]
    fn test_expand_relative_path() {
        let base = Path::new("/srv/deploy");
        assert_eq!(expand_path("keys/id.pub", base), PathBuf::from("/srv/deploy/keys/id.pub"));
        assert_eq!(expand_path("/etc/key.pub", base), PathBuf::from("/etc/key.pub"));
    }
}
