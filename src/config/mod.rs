//! Configuration module for the Ronzz deployment tool.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `ronzz.deploy.yaml`
//! - Environment overrides and `.env` loading
//! - Validation of configuration values
//! - Resolving validated [`DeployInputs`]
//! - Computing configuration hashes for change detection

mod spec;
mod parser;
mod validator;
mod inputs;
mod hash;

pub use spec::{
    DeployConfig, ImageConfig, InstanceConfig, NetworkConfig, OciConfig, ProjectConfig,
    StateConfig, DEFAULT_OPERATING_SYSTEM, DEFAULT_OPERATING_SYSTEM_VERSION,
    DEFAULT_PROJECT_NAME, DEFAULT_SHAPE,
};
pub use parser::{expand_path, find_config_file, ConfigParser, DEFAULT_CONFIG_FILES};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
pub use inputs::{DeployInputs, ImageFilter, InstanceSizing, NetworkLayout, WaitPolicy};
pub use hash::ConfigHasher;
