//! Compute instance declaration.

use std::collections::BTreeMap;
use tracing::info;

use crate::config::DeployInputs;
use crate::error::Result;
use crate::oci::{
    CoreApi, CreateVnicDetails, InstanceSourceDetails, LaunchInstanceDetails, LaunchShapeConfig,
    ResourceKind,
};

use super::wait_until_ready;

/// Metadata key carrying the authorized SSH public keys.
const SSH_AUTHORIZED_KEYS: &str = "ssh_authorized_keys";

/// Declares the Linux server instance.
#[derive(Debug, Clone, Copy)]
pub struct InstanceDeclarator<'a> {
    inputs: &'a DeployInputs,
}

impl<'a> InstanceDeclarator<'a> {
    /// Creates a declarator for the given inputs.
    #[must_use]
    pub const fn new(inputs: &'a DeployInputs) -> Self {
        Self { inputs }
    }

    /// Launch details for an instance in `subnet_id` booting `image_id`.
    ///
    /// The shape configuration is only sent for flexible shapes.
    #[must_use]
    pub fn launch_details(&self, subnet_id: &str, image_id: &str) -> LaunchInstanceDetails {
        let sizing = &self.inputs.instance;
        let shape_config = self.inputs.is_flexible_shape().then_some(LaunchShapeConfig {
            ocpus: sizing.ocpus,
            memory_in_gbs: sizing.memory_in_gbs,
        });

        LaunchInstanceDetails {
            compartment_id: self.inputs.compartment_id.clone(),
            availability_domain: self.inputs.availability_domain.clone(),
            display_name: self.inputs.display_name(ResourceKind::Instance.name_suffix()),
            shape: sizing.shape.clone(),
            shape_config,
            create_vnic_details: CreateVnicDetails {
                subnet_id: subnet_id.to_string(),
                display_name: self.inputs.display_name("primary-vnic"),
                assign_public_ip: sizing.assign_public_ip,
            },
            source_details: InstanceSourceDetails::Image {
                image_id: image_id.to_string(),
            },
            metadata: BTreeMap::from([(
                SSH_AUTHORIZED_KEYS.to_string(),
                self.inputs.ssh_public_key.clone(),
            )]),
        }
    }

    /// Launches the instance and waits until it is running.
    ///
    /// # Errors
    ///
    /// Returns an error if the launch fails or the instance does not reach `RUNNING`.
    pub async fn launch<A>(&self, api: &A, subnet_id: &str, image_id: &str) -> Result<String>
    where
        A: CoreApi + ?Sized,
    {
        let details = self.launch_details(subnet_id, image_id);
        let instance = api.launch_instance(&details).await?;
        info!("Launched instance {} ({})", details.display_name, instance.id);

        wait_until_ready(api, ResourceKind::Instance, &instance.id, self.inputs.wait).await?;
        Ok(instance.id)
    }
}
