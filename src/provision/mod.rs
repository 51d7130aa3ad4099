//! Provisioning steps for the fixed single-VM topology.
//!
//! Each step builds the create details for one part of the deployment and
//! runs against any [`CoreApi`](crate::oci::CoreApi) implementation:
//! - [`NetworkProvisioner`]: VCN, internet gateway, route table, security list, subnet
//! - [`ImageResolver`]: boot image selection
//! - [`InstanceDeclarator`]: the compute instance
//! - [`OutputExporter`]: instance identifiers and IP addresses

mod image;
mod instance;
mod network;
mod outputs;

pub use image::{pick_by_display_name, ImageResolver, ImageSource, ResolvedImage, IMAGE_OCID_PREFIX};
pub use instance::InstanceDeclarator;
pub use network::NetworkProvisioner;
pub use outputs::{DeploymentOutputs, OutputExporter, OUTPUT_KEYS, UNAVAILABLE};

use std::collections::BTreeMap;
use tokio::time::Instant;
use tracing::debug;

use crate::config::WaitPolicy;
use crate::error::{OciError, ProvisionError, Result};
use crate::oci::{LifecycleApi, LifecycleState, ResourceKind};

/// OCIDs of the resources known to a deployment, by kind.
pub type ResourceIds = BTreeMap<ResourceKind, String>;

/// Polls a resource until it reaches its ready state.
///
/// # Errors
///
/// Returns an error if the resource disappears, enters a terminal state, or
/// does not become ready within the policy's timeout.
pub async fn wait_until_ready<A>(
    api: &A,
    kind: ResourceKind,
    id: &str,
    policy: WaitPolicy,
) -> Result<()>
where
    A: LifecycleApi + ?Sized,
{
    let target = kind.ready_state();
    let deadline = Instant::now() + policy.timeout;

    loop {
        match api.resource_state(kind, id).await? {
            Some(state) if state == target => {
                debug!("{kind} {id} is {state}");
                return Ok(());
            }
            Some(state) if state.is_gone() => {
                return Err(ProvisionError::UnexpectedLifecycle {
                    resource: kind.to_string(),
                    id: id.to_string(),
                    state: state.to_string(),
                    expected: target.to_string(),
                }
                .into());
            }
            Some(state) => debug!("{kind} {id} is {state}, waiting for {target}"),
            None => {
                return Err(OciError::NotFound {
                    resource: format!("{kind} {id}"),
                }
                .into());
            }
        }

        if Instant::now() >= deadline {
            return Err(OciError::Timeout {
                resource: kind.to_string(),
                id: id.to_string(),
                expected_state: target.to_string(),
            }
            .into());
        }

        tokio::time::sleep(policy.poll_interval).await;
    }
}

/// Polls a resource until it no longer exists or reports `TERMINATED`.
///
/// # Errors
///
/// Returns an error if the resource is still present after the timeout.
pub async fn wait_until_deleted<A>(
    api: &A,
    kind: ResourceKind,
    id: &str,
    policy: WaitPolicy,
) -> Result<()>
where
    A: LifecycleApi + ?Sized,
{
    let deadline = Instant::now() + policy.timeout;

    loop {
        match api.resource_state(kind, id).await? {
            None | Some(LifecycleState::Terminated) => return Ok(()),
            Some(state) => debug!("{kind} {id} is {state}, waiting for deletion"),
        }

        if Instant::now() >= deadline {
            return Err(OciError::Timeout {
                resource: kind.to_string(),
                id: id.to_string(),
                expected_state: LifecycleState::Terminated.to_string(),
            }
            .into());
        }

        tokio::time::sleep(policy.poll_interval).await;
    }
}

#[cfg(test)]
pub(crate) fn test_wait_policy() -> WaitPolicy {
    WaitPolicy {
        timeout: std::time::Duration::from_secs(5),
        poll_interval: std::time::Duration::from_millis(1),
    }
}
