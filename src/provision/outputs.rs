//! Deployment outputs.
//!
//! The instance's addresses are only known once it is running, so the
//! exporter looks them up in two steps: the VNIC attachments of the
//! instance, then the primary VNIC itself.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::oci::{CoreApi, LifecycleState, Vnic};

/// Value published for an address the instance does not have.
pub const UNAVAILABLE: &str = "N/A";

/// Output names, in publication order.
pub const OUTPUT_KEYS: [&str; 6] = [
    "instance_id",
    "instance_name",
    "instance_shape",
    "public_ip",
    "private_ip",
    "instance_state",
];

/// Identifiers and addresses published after a deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentOutputs {
    /// Instance OCID.
    pub instance_id: String,
    /// Instance display name.
    pub instance_name: String,
    /// Instance shape.
    pub instance_shape: String,
    /// Public IP address, or [`UNAVAILABLE`].
    pub public_ip: String,
    /// Private IP address, or [`UNAVAILABLE`].
    pub private_ip: String,
    /// Lifecycle state when the outputs were read.
    pub instance_state: String,
}

impl DeploymentOutputs {
    /// Returns the outputs as `(name, value)` pairs in [`OUTPUT_KEYS`] order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            (OUTPUT_KEYS[0], self.instance_id.as_str()),
            (OUTPUT_KEYS[1], self.instance_name.as_str()),
            (OUTPUT_KEYS[2], self.instance_shape.as_str()),
            (OUTPUT_KEYS[3], self.public_ip.as_str()),
            (OUTPUT_KEYS[4], self.private_ip.as_str()),
            (OUTPUT_KEYS[5], self.instance_state.as_str()),
        ]
    }

    /// Looks up an output by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries()
            .into_iter()
            .find_map(|(name, value)| (name == key).then_some(value))
    }

    /// Returns true if the instance has a public address.
    #[must_use]
    pub fn has_public_ip(&self) -> bool {
        self.public_ip != UNAVAILABLE
    }
}

/// Reads the outputs of a launched instance.
#[derive(Debug, Clone, Copy)]
pub struct OutputExporter;

impl OutputExporter {
    /// Queries the instance and its primary VNIC.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance cannot be read or an API call fails.
    pub async fn export<A>(api: &A, compartment_id: &str, instance_id: &str) -> Result<DeploymentOutputs>
    where
        A: CoreApi + ?Sized,
    {
        let instance = api.get_instance(instance_id).await?;
        let vnic = Self::primary_vnic(api, compartment_id, instance_id).await?;

        let address = |ip: Option<&String>| ip.map_or_else(|| UNAVAILABLE.to_string(), Clone::clone);
        let (public_ip, private_ip) = match &vnic {
            Some(vnic) => (address(vnic.public_ip.as_ref()), address(vnic.private_ip.as_ref())),
            None => (UNAVAILABLE.to_string(), UNAVAILABLE.to_string()),
        };

        Ok(DeploymentOutputs {
            instance_id: instance.id,
            instance_name: instance.display_name.unwrap_or_default(),
            instance_shape: instance.shape,
            public_ip,
            private_ip,
            instance_state: instance.lifecycle_state.to_string(),
        })
    }

    async fn primary_vnic<A>(api: &A, compartment_id: &str, instance_id: &str) -> Result<Option<Vnic>>
    where
        A: CoreApi + ?Sized,
    {
        let attachments = api.list_vnic_attachments(compartment_id, instance_id).await?;

        let mut fallback = None;
        for attachment in attachments
            .iter()
            .filter(|a| a.lifecycle_state == LifecycleState::Attached)
        {
            let Some(vnic_id) = attachment.vnic_id.as_deref() else {
                continue;
            };
            let vnic = api.get_vnic(vnic_id).await?;
            if vnic.is_primary.unwrap_or(false) {
                return Ok(Some(vnic));
            }
            fallback.get_or_insert(vnic);
        }

        if fallback.is_none() {
            warn!("Instance {instance_id} has no attached VNIC");
        } else {
            debug!("No VNIC of {instance_id} is marked primary, using the first attached one");
        }
        Ok(fallback)
    }
}
