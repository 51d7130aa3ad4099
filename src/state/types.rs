//! State types for tracking deployment state.
//!
//! The state records which OCIDs belong to the deployment so that a second
//! apply reuses them and destroy removes exactly those.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::oci::ResourceKind;
use crate::provision::{DeploymentOutputs, ResolvedImage, ResourceIds};

/// Current version of the state format.
pub const STATE_VERSION: &str = "1.0";

/// Number of history entries kept.
const MAX_HISTORY: usize = 100;

/// The complete deployment state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentState {
    /// State format version.
    pub version: String,
    /// Project name.
    pub project: String,
    /// Hash of the last applied inputs.
    pub config_hash: String,
    /// Resources recorded for the deployment.
    #[serde(default)]
    pub resources: BTreeMap<ResourceKind, ResourceState>,
    /// Image the instance was launched from.
    #[serde(default)]
    pub image: Option<ResolvedImage>,
    /// Outputs of the last successful apply or status refresh.
    #[serde(default)]
    pub outputs: Option<DeploymentOutputs>,
    /// When the state was last updated.
    pub last_updated: DateTime<Utc>,
    /// Deployment history (recent entries).
    #[serde(default)]
    pub history: Vec<DeploymentHistoryEntry>,
}

/// A resource recorded in state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceState {
    /// Resource OCID.
    pub id: String,
    /// Display name at creation.
    #[serde(default)]
    pub display_name: Option<String>,
    /// False for resources supplied by the user; those are never deleted.
    pub owned: bool,
    /// When the resource was created or first recorded.
    pub created_at: DateTime<Utc>,
}

/// A single entry in the deployment history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentHistoryEntry {
    /// When the operation ran.
    pub timestamp: DateTime<Utc>,
    /// Type of operation.
    pub operation: DeploymentOperation,
    /// Inputs hash at the time.
    pub config_hash: String,
    /// Resources affected.
    pub resources: Vec<String>,
    /// Host that ran the operation.
    #[serde(default)]
    pub operator: Option<String>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Optional error message.
    #[serde(default)]
    pub error: Option<String>,
}

/// Types of deployment operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentOperation {
    /// Apply.
    Apply,
    /// Destroy.
    Destroy,
}

impl DeploymentState {
    /// Creates a new empty deployment state.
    #[must_use]
    pub fn new(project: &str) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            project: project.to_string(),
            config_hash: String::new(),
            resources: BTreeMap::new(),
            image: None,
            outputs: None,
            last_updated: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Gets a recorded resource.
    #[must_use]
    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourceState> {
        self.resources.get(&kind)
    }

    /// Records a resource.
    pub fn record(&mut self, kind: ResourceKind, resource: ResourceState) {
        self.resources.insert(kind, resource);
        self.last_updated = Utc::now();
    }

    /// Forgets a resource.
    pub fn forget(&mut self, kind: ResourceKind) -> Option<ResourceState> {
        let removed = self.resources.remove(&kind);
        if removed.is_some() {
            self.last_updated = Utc::now();
        }
        removed
    }

    /// OCIDs of all recorded resources.
    #[must_use]
    pub fn resource_ids(&self) -> ResourceIds {
        self.resources
            .iter()
            .map(|(kind, resource)| (*kind, resource.id.clone()))
            .collect()
    }

    /// Returns true if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Returns the number of recorded resources the deployment owns.
    #[must_use]
    pub fn owned_count(&self) -> usize {
        self.resources.values().filter(|r| r.owned).count()
    }

    /// Adds a history entry.
    pub fn add_history(&mut self, entry: DeploymentHistoryEntry) {
        if self.history.len() >= MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(entry);
    }
}

impl ResourceState {
    /// A resource created by this tool.
    #[must_use]
    pub fn created(id: &str, display_name: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            display_name,
            owned: true,
            created_at: Utc::now(),
        }
    }

    /// A resource supplied by the user.
    #[must_use]
    pub fn supplied(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: None,
            owned: false,
            created_at: Utc::now(),
        }
    }
}

impl DeploymentHistoryEntry {
    /// Creates a new history entry.
    #[must_use]
    pub fn new(operation: DeploymentOperation, config_hash: &str, resources: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            config_hash: config_hash.to_string(),
            resources,
            operator: operator(),
            success: true,
            error: None,
        }
    }

    /// Creates a failed history entry.
    #[must_use]
    pub fn failed(
        operation: DeploymentOperation,
        config_hash: &str,
        resources: Vec<String>,
        error: &str,
    ) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::new(operation, config_hash, resources)
        }
    }
}

fn operator() -> Option<String> {
    hostname::get().ok().and_then(|name| name.into_string().ok())
}

impl std::fmt::Display for DeploymentOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            Self::Apply => "apply",
            Self::Destroy => "destroy",
        };
        write!(f, "{op}")
    }
}
