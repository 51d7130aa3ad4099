//! OCI API credentials.
//!
//! Credentials come from a profile in the OCI CLI config file
//! (`~/.oci/config`) and/or environment variables. Environment variables
//! take precedence over profile entries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::expand_path;
use crate::error::{ConfigError, Result, RonzzError};

/// Profile used when `OCI_CLI_PROFILE` is not set.
pub const DEFAULT_PROFILE: &str = "DEFAULT";

/// Profile entries and the environment variables that override them.
const CREDENTIAL_KEYS: &[(&str, &str)] = &[
    ("user", "OCI_USER_OCID"),
    ("fingerprint", "OCI_FINGERPRINT"),
    ("tenancy", "OCI_TENANCY_OCID"),
    ("region", "OCI_REGION"),
    ("key_file", "OCI_PRIVATE_KEY_PATH"),
];

/// Credentials for signing OCI API requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OciCredentials {
    /// User OCID.
    pub user: String,
    /// Fingerprint of the API signing key.
    pub fingerprint: String,
    /// Tenancy OCID.
    pub tenancy: String,
    /// Home region of the profile.
    pub region: String,
    /// Path to the PEM private key.
    pub key_file: PathBuf,
}

impl OciCredentials {
    /// Loads credentials from the process environment and the OCI config file.
    ///
    /// # Errors
    ///
    /// Returns an error if a credential is missing or the config file is unreadable.
    pub fn load() -> Result<Self> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Loads credentials using the given environment lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a credential is missing or the config file is unreadable.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let profile_name = lookup("OCI_CLI_PROFILE").unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        let config_path = lookup("OCI_CONFIG_FILE")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".oci").join("config")));

        let mut profile = HashMap::new();
        if let Some(path) = config_path.as_deref().filter(|p| p.exists()) {
            info!("Loading OCI profile [{profile_name}] from: {}", path.display());
            let content = std::fs::read_to_string(path).map_err(|e| {
                RonzzError::Config(ConfigError::credentials(format!(
                    "Cannot read OCI config file {}: {e}",
                    path.display()
                )))
            })?;
            profile = parse_profile(&content, &profile_name);
        } else {
            debug!("No OCI config file found, using environment only");
        }

        let mut values = HashMap::new();
        for &(key, env) in CREDENTIAL_KEYS {
            let value = lookup(env)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| profile.remove(key))
                .ok_or_else(|| {
                    ConfigError::credentials(format!(
                        "'{key}' is not set: add it to profile [{profile_name}] or set {env}"
                    ))
                })?;
            values.insert(key, value);
        }

        let key_base = config_path
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let mut take = |key: &str| values.remove(key).unwrap_or_default();
        let key_file = expand_path(&take("key_file"), &key_base);

        Ok(Self {
            user: take("user"),
            fingerprint: take("fingerprint"),
            tenancy: take("tenancy"),
            region: take("region"),
            key_file,
        })
    }

    /// Returns the signature key id, `<tenancy>/<user>/<fingerprint>`.
    #[must_use]
    pub fn key_id(&self) -> String {
        format!("{}/{}/{}", self.tenancy, self.user, self.fingerprint)
    }
}

/// Parses one profile of an INI-style OCI config file.
///
/// Entries of the `DEFAULT` section are inherited by every other profile.
fn parse_profile(content: &str, profile: &str) -> HashMap<String, String> {
    let mut defaults = HashMap::new();
    let mut selected = HashMap::new();
    let mut section = String::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = name.trim().to_string();
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let entry = (key.trim().to_string(), value.trim().to_string());

        if section == DEFAULT_PROFILE {
            defaults.insert(entry.0.clone(), entry.1.clone());
        }
        if section == profile {
            selected.insert(entry.0, entry.1);
        }
    }

    defaults.extend(selected);
    defaults
}
