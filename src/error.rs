//! Error types for the Ronzz deployment tool.
//!
//! Every failure in a deployment run is terminal: configuration problems,
//! state file problems, OCI API failures, image resolution failures and
//! provisioning consistency checks all surface as a [`RonzzError`] that
//! aborts the current command.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Ronzz deployment tool.
#[derive(Debug, Error)]
pub enum RonzzError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// OCI API errors.
    #[error("OCI API error: {0}")]
    Oci(#[from] OciError),

    /// Image resolution errors.
    #[error("Image resolution error: {0}")]
    Image(#[from] ImageError),

    /// Provisioning errors.
    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A required configuration value is missing.
    #[error("Missing required configuration value: {key}")]
    MissingValue {
        /// Name of the missing key.
        key: String,
    },

    /// OCI API credentials are unusable.
    #[error("Invalid OCI credentials: {message}")]
    InvalidCredentials {
        /// Description of the problem.
        message: String,
    },
}

/// State management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// The state file could not be written.
    #[error("Failed to write state: {message}")]
    WriteFailed {
        /// Description of the write failure.
        message: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },
}

/// OCI API errors.
#[derive(Debug, Error)]
pub enum OciError {
    /// Authentication failed.
    #[error("OCI authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("OCI API request failed: {status} {code} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// OCI service error code (e.g. `InvalidParameter`).
        code: String,
        /// Error message from the API.
        message: String,
    },

    /// The requested resource does not exist.
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Path of the missing resource.
        resource: String,
    },

    /// Rate limited.
    #[error("OCI API rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("Network error communicating with OCI: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the API.
    #[error("Invalid response from OCI API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// Timeout waiting for a resource to reach a lifecycle state.
    #[error("Timeout waiting for {resource} {id} to reach state {expected_state}")]
    Timeout {
        /// Resource type.
        resource: String,
        /// Resource OCID.
        id: String,
        /// Expected state that was not reached.
        expected_state: String,
    },

    /// A request could not be signed.
    #[error("Failed to sign request: {message}")]
    Signing {
        /// Description of the signing failure.
        message: String,
    },
}

/// Image resolution errors.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The catalog has no image matching the operating system filter.
    #[error(
        "No {operating_system} {operating_system_version} image found for shape {shape}. \
         Please provide image.id in the configuration."
    )]
    NoCatalogImage {
        /// Operating system filter.
        operating_system: String,
        /// Operating system version filter.
        operating_system_version: String,
        /// Shape filter.
        shape: String,
    },

    /// A user-supplied image OCID does not exist in the region.
    #[error("Image {image_id} not found in region {region}")]
    ImageIdNotFound {
        /// The supplied image OCID.
        image_id: String,
        /// Region that was searched.
        region: String,
    },

    /// A user-supplied display name matched no image.
    #[error(
        "No image matches display name '{display_name}' (searched exact name and the newest \
         {operating_system} {operating_system_version} images for {shape})"
    )]
    DisplayNameUnresolved {
        /// The supplied display name.
        display_name: String,
        /// Operating system filter used for the fallback search.
        operating_system: String,
        /// Operating system version filter used for the fallback search.
        operating_system_version: String,
        /// Shape filter used for the fallback search.
        shape: String,
    },
}

/// Provisioning errors.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A supplied subnet lives in a different availability domain.
    #[error(
        "Subnet {subnet_id} is in availability domain {subnet_ad}, \
         but the instance was requested in {requested_ad}"
    )]
    AvailabilityDomainMismatch {
        /// The supplied subnet OCID.
        subnet_id: String,
        /// Availability domain of the subnet.
        subnet_ad: String,
        /// Availability domain requested for the instance.
        requested_ad: String,
    },

    /// A resource entered a lifecycle state it cannot leave.
    #[error("{resource} {id} entered state {state} while waiting for {expected}")]
    UnexpectedLifecycle {
        /// Resource type.
        resource: String,
        /// Resource OCID.
        id: String,
        /// State that was observed.
        state: String,
        /// State that was expected.
        expected: String,
    },

    /// A step ran before a resource it depends on was available.
    #[error("Cannot {action}: {dependency} is not available")]
    MissingDependency {
        /// Action that was attempted.
        action: String,
        /// Resource that was missing.
        dependency: String,
    },
}

/// Result type alias for Ronzz operations.
pub type Result<T> = std::result::Result<T, RonzzError>;

impl RonzzError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Oci(OciError::RateLimited { .. } | OciError::NetworkError { .. })
        )
    }

    /// Returns the delay in seconds the API asked for before a retry, if any.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Oci(OciError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Returns true if this error reports a missing OCI resource.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Oci(OciError::NotFound { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a missing-value error for a configuration key.
    #[must_use]
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingValue { key: key.into() }
    }

    /// Creates an invalid-credentials error.
    #[must_use]
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            message: message.into(),
        }
    }
}

impl StateError {
    /// Creates a write error with the given message.
    #[must_use]
    pub fn write(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl OciError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        let rate_limited = RonzzError::Oci(OciError::RateLimited { retry_after_secs: 7 });
        assert!(rate_limited.is_retryable());
        assert_eq!(rate_limited.retry_delay_secs(), Some(7));

        let network = RonzzError::Oci(OciError::network("connection reset"));
        assert!(network.is_retryable());
        assert_eq!(network.retry_delay_secs(), None);

        let not_found = RonzzError::Oci(OciError::NotFound {
            resource: String::from("/images/ocid1.image.x"),
        });
        assert!(!not_found.is_retryable());
        assert!(not_found.is_not_found());
    }

    #[test]
    fn test_messages_carry_offending_input() {
        let err = RonzzError::from(ImageError::ImageIdNotFound {
            image_id: String::from("ocid1.image.oc1..missing"),
            region: String::from("eu-frankfurt-1"),
        });
        let message = err.to_string();
        assert!(message.contains("ocid1.image.oc1..missing"));
        assert!(message.contains("eu-frankfurt-1"));

        let err = RonzzError::from(ConfigError::missing("compartment_id"));
        assert!(err.to_string().contains("compartment_id"));
    }
}
