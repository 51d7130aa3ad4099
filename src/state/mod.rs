//! State management module.
//!
//! This module records the OCIDs a deployment owns, the image it booted,
//! its last outputs and a short history of applies and destroys.

mod store;
mod local;
mod types;

pub use store::StateStore;
pub use local::{LocalStateStore, STATE_DIR};
pub use types::{
    DeploymentHistoryEntry, DeploymentOperation, DeploymentState, ResourceState, STATE_VERSION,
};
