//! Deployment plan types and construction.
//!
//! A plan is the ordered list of steps an apply or destroy will take. Apply
//! plans reuse every resource already recorded in state, so running apply
//! twice creates nothing the second time.

use chrono::{DateTime, Utc};

use crate::config::{ConfigHasher, DeployInputs};
use crate::error::{ConfigError, Result};
use crate::oci::ResourceKind;
use crate::provision::NetworkProvisioner;
use crate::state::{DeploymentOperation, DeploymentState};

/// A complete deployment plan.
#[derive(Debug)]
pub struct DeploymentPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Operation the plan performs.
    pub operation: DeploymentOperation,
    /// Inputs hash this plan is based on.
    pub config_hash: String,
    /// Inputs hash recorded by the last apply, if any.
    pub previous_hash: Option<String>,
    /// Planned actions in execution order.
    pub actions: Vec<PlannedAction>,
}

/// A single planned action.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    /// Action type.
    pub action_type: ActionType,
    /// Resource kind, absent for image resolution.
    pub kind: Option<ResourceKind>,
    /// Display name or description of the target.
    pub resource_name: String,
    /// OCID of the target, when already known.
    pub resource_id: Option<String>,
    /// Reason for this action.
    pub reason: String,
}

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// Create a resource.
    Create,
    /// Reuse a resource recorded in state.
    Reuse,
    /// Check a resource supplied in the configuration.
    Verify,
    /// Resolve the boot image.
    ResolveImage,
    /// Delete a resource owned by the deployment.
    Delete,
}

impl DeploymentPlan {
    /// Builds the apply plan for `inputs` given the recorded state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration now supplies a subnet or VCN in
    /// place of one the deployment created, or moves an existing instance to
    /// another network. Those resources must be destroyed first.
    pub fn for_apply(inputs: &DeployInputs, state: Option<&DeploymentState>) -> Result<Self> {
        if let Some(state) = state {
            check_supplied(
                state,
                ResourceKind::Subnet,
                inputs.subnet_id.as_deref(),
                "network.subnet_id",
            )?;
            if inputs.subnet_id.is_none() {
                check_supplied(state, ResourceKind::Vcn, inputs.vcn_id.as_deref(), "network.vcn_id")?;
            }
        }

        let mut actions = Vec::new();
        let recorded = |kind: ResourceKind| {
            state
                .and_then(|s| s.resource(kind))
                .filter(|resource| resource.owned)
                .map(|resource| resource.id.clone())
        };

        let instance_id = recorded(ResourceKind::Instance);
        if instance_id.is_none() {
            actions.push(PlannedAction {
                action_type: ActionType::ResolveImage,
                kind: None,
                resource_name: inputs.image.clone().unwrap_or_else(|| {
                    format!(
                        "latest {} {}",
                        inputs.image_filter.operating_system,
                        inputs.image_filter.operating_system_version
                    )
                }),
                resource_id: None,
                reason: String::from("Boot image for the new instance"),
            });
        }

        if let Some(subnet_id) = &inputs.subnet_id {
            actions.push(match recorded(ResourceKind::Subnet) {
                Some(id) => PlannedAction::create_or_reuse(inputs, ResourceKind::Subnet, Some(id)),
                None => PlannedAction::verify(ResourceKind::Subnet, subnet_id, "Subnet supplied in configuration"),
            });
        } else {
            if let Some(vcn_id) = &inputs.vcn_id {
                actions.push(match recorded(ResourceKind::Vcn) {
                    Some(id) => PlannedAction::create_or_reuse(inputs, ResourceKind::Vcn, Some(id)),
                    None => PlannedAction::verify(ResourceKind::Vcn, vcn_id, "VCN supplied in configuration"),
                });
            }
            for kind in NetworkProvisioner::new(inputs).kinds_to_create() {
                actions.push(PlannedAction::create_or_reuse(inputs, kind, recorded(kind)));
            }
        }

        actions.push(PlannedAction::create_or_reuse(
            inputs,
            ResourceKind::Instance,
            instance_id,
        ));

        Ok(Self {
            created_at: Utc::now(),
            operation: DeploymentOperation::Apply,
            config_hash: ConfigHasher::new().hash_inputs(inputs),
            previous_hash: state
                .map(|s| s.config_hash.clone())
                .filter(|hash| !hash.is_empty()),
            actions,
        })
    }

    /// Builds the destroy plan for the recorded state.
    ///
    /// Resources are deleted instance first and VCN last. Resources the
    /// deployment does not own are left alone.
    #[must_use]
    pub fn for_destroy(state: &DeploymentState) -> Self {
        let actions = ResourceKind::DESTROY_ORDER
            .into_iter()
            .filter_map(|kind| {
                let resource = state.resource(kind).filter(|r| r.owned)?;
                Some(PlannedAction {
                    action_type: ActionType::Delete,
                    kind: Some(kind),
                    resource_name: resource
                        .display_name
                        .clone()
                        .unwrap_or_else(|| kind.to_string()),
                    resource_id: Some(resource.id.clone()),
                    reason: String::from("Owned by this deployment"),
                })
            })
            .collect();

        Self {
            created_at: Utc::now(),
            operation: DeploymentOperation::Destroy,
            config_hash: state.config_hash.clone(),
            previous_hash: None,
            actions,
        }
    }

    /// Returns true if the inputs changed since the last apply.
    ///
    /// Existing resources are never updated in place, so a change only takes
    /// effect after destroy and apply.
    #[must_use]
    pub fn config_changed(&self) -> bool {
        self.previous_hash
            .as_deref()
            .is_some_and(|previous| !ConfigHasher::hashes_match(previous, &self.config_hash))
    }

    /// Returns true if the plan does not create or delete anything.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.create_count() == 0 && self.delete_count() == 0
    }

    /// Returns the number of actions.
    #[must_use]
    pub const fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Returns the number of create actions.
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.count(ActionType::Create)
    }

    /// Returns the number of reuse actions.
    #[must_use]
    pub fn reuse_count(&self) -> usize {
        self.count(ActionType::Reuse)
    }

    /// Returns the number of delete actions.
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.count(ActionType::Delete)
    }

    fn count(&self, action_type: ActionType) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .count()
    }
}

/// Rejects a supplied id that would replace a recorded resource of the same kind.
///
/// A created resource may only be named in the configuration by its own id.
/// A supplied resource may change freely until an instance is launched into it.
fn check_supplied(
    state: &DeploymentState,
    kind: ResourceKind,
    supplied: Option<&str>,
    field: &str,
) -> Result<()> {
    let (Some(supplied), Some(recorded)) = (supplied, state.resource(kind)) else {
        return Ok(());
    };
    if recorded.id == supplied {
        return Ok(());
    }

    let instance_owned = state
        .resource(ResourceKind::Instance)
        .is_some_and(|instance| instance.owned);

    if recorded.owned {
        Err(ConfigError::validation(
            format!(
                "{field} is set to {supplied} but this deployment created {kind} {}; run destroy before switching to a supplied {kind}",
                recorded.id
            ),
            field,
        )
        .into())
    } else if instance_owned {
        Err(ConfigError::validation(
            format!(
                "{field} changed from {} to {supplied} but the instance was launched in the old {kind}; run destroy first",
                recorded.id
            ),
            field,
        )
        .into())
    } else {
        Ok(())
    }
}

impl PlannedAction {
    fn verify(kind: ResourceKind, id: &str, reason: &str) -> Self {
        Self {
            action_type: ActionType::Verify,
            kind: Some(kind),
            resource_name: kind.to_string(),
            resource_id: Some(id.to_string()),
            reason: reason.to_string(),
        }
    }

    fn create_or_reuse(inputs: &DeployInputs, kind: ResourceKind, recorded: Option<String>) -> Self {
        let resource_name = inputs.display_name(kind.name_suffix());
        match recorded {
            Some(id) => Self {
                action_type: ActionType::Reuse,
                kind: Some(kind),
                resource_name,
                resource_id: Some(id),
                reason: String::from("Recorded in state"),
            },
            None => Self {
                action_type: ActionType::Create,
                kind: Some(kind),
                resource_name,
                resource_id: None,
                reason: String::from("Not yet created"),
            },
        }
    }

    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        let kind = self.kind.map_or_else(String::new, |k| format!("{k} "));
        match self.action_type {
            ActionType::Create => format!("Create {kind}'{}'", self.resource_name),
            ActionType::Reuse => format!("Reuse {kind}'{}'", self.resource_name),
            ActionType::Verify => format!("Verify {kind}{}", self.resource_id.as_deref().unwrap_or("")),
            ActionType::ResolveImage => format!("Resolve image '{}'", self.resource_name),
            ActionType::Delete => format!("Delete {kind}'{}'", self.resource_name),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Reuse => "reuse",
            Self::Verify => "verify",
            Self::ResolveImage => "resolve",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for DeploymentPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.actions.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(f, "{} plan ({} actions):", self.operation, self.actions.len())?;
        for (i, action) in self.actions.iter().enumerate() {
            writeln!(f, "  {i}. {action}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::state::ResourceState;
    use std::path::Path;

    fn inputs(configure: impl FnOnce(&mut DeployConfig)) -> DeployInputs {
        let mut config = DeployConfig::default();
        config.oci.compartment_id = Some(String::from("ocid1.compartment.x"));
        config.oci.availability_domain = Some(String::from("AD-1"));
        config.oci.ssh_public_key = Some(String::from("ssh-rsa AAAA..."));
        configure(&mut config);
        DeployInputs::resolve(&config, "eu-frankfurt-1", Path::new(".")).unwrap()
    }

    fn types(plan: &DeploymentPlan) -> Vec<(ActionType, Option<ResourceKind>)> {
        plan.actions.iter().map(|a| (a.action_type, a.kind)).collect()
    }

    #[test]
    fn test_fresh_apply_creates_everything() {
        let plan = DeploymentPlan::for_apply(&inputs(|_| {}), None).unwrap();

        assert_eq!(
            types(&plan),
            vec![
                (ActionType::ResolveImage, None),
                (ActionType::Create, Some(ResourceKind::Vcn)),
                (ActionType::Create, Some(ResourceKind::InternetGateway)),
                (ActionType::Create, Some(ResourceKind::RouteTable)),
                (ActionType::Create, Some(ResourceKind::SecurityList)),
                (ActionType::Create, Some(ResourceKind::Subnet)),
                (ActionType::Create, Some(ResourceKind::Instance)),
            ]
        );
        assert_eq!(plan.create_count(), 6);
        assert!(!plan.config_changed());
        assert_eq!(plan.actions[0].resource_name, "latest Canonical Ubuntu 24.04");
    }

    #[test]
    fn test_supplied_subnet_plans_no_network() {
        let plan = DeploymentPlan::for_apply(
            &inputs(|c| c.network.subnet_id = Some(String::from("ocid1.subnet.oc1..s"))),
            None,
        )
        .unwrap();

        assert_eq!(
            types(&plan),
            vec![
                (ActionType::ResolveImage, None),
                (ActionType::Verify, Some(ResourceKind::Subnet)),
                (ActionType::Create, Some(ResourceKind::Instance)),
            ]
        );
    }

    #[test]
    fn test_supplied_vcn_plans_four_network_resources() {
        let plan = DeploymentPlan::for_apply(
            &inputs(|c| c.network.vcn_id = Some(String::from("ocid1.vcn.oc1..v"))),
            None,
        )
        .unwrap();

        assert_eq!(plan.actions[1].action_type, ActionType::Verify);
        assert_eq!(plan.create_count(), 5);
        assert!(!plan
            .actions
            .iter()
            .any(|a| a.action_type == ActionType::Create && a.kind == Some(ResourceKind::Vcn)));
    }

    #[test]
    fn test_recorded_resources_are_reused() {
        let inputs = inputs(|_| {});
        let mut state = DeploymentState::new("ronzz");
        for kind in ResourceKind::ALL {
            state.record(kind, ResourceState::created(&format!("ocid1.{}.x", kind.name_suffix()), None));
        }
        state.config_hash = ConfigHasher::new().hash_inputs(&inputs);

        let plan = DeploymentPlan::for_apply(&inputs, Some(&state)).unwrap();

        assert_eq!(plan.reuse_count(), 6);
        assert!(plan.is_noop());
        assert!(!plan.config_changed());
        assert!(plan.actions.iter().all(|a| a.action_type != ActionType::ResolveImage));
    }

    #[test]
    fn test_changed_inputs_are_flagged() {
        let mut state = DeploymentState::new("ronzz");
        state.config_hash = String::from("0123");

        let plan = DeploymentPlan::for_apply(&inputs(|_| {}), Some(&state)).unwrap();
        assert!(plan.config_changed());
    }

    #[test]
    fn test_destroy_order_skips_supplied_resources() {
        let mut state = DeploymentState::new("ronzz");
        state.record(ResourceKind::Vcn, ResourceState::supplied("ocid1.vcn.x"));
        state.record(ResourceKind::Subnet, ResourceState::created("ocid1.subnet.x", None));
        state.record(ResourceKind::InternetGateway, ResourceState::created("ocid1.internetgateway.x", None));
        state.record(
            ResourceKind::Instance,
            ResourceState::created("ocid1.instance.x", Some(String::from("ronzz-linux-server"))),
        );

        let plan = DeploymentPlan::for_destroy(&state);

        assert_eq!(
            types(&plan),
            vec![
                (ActionType::Delete, Some(ResourceKind::Instance)),
                (ActionType::Delete, Some(ResourceKind::Subnet)),
                (ActionType::Delete, Some(ResourceKind::InternetGateway)),
            ]
        );
        assert_eq!(plan.actions[0].resource_name, "ronzz-linux-server");
        assert_eq!(plan.delete_count(), 3);
    }

    #[test]
    fn test_plan_display() {
        let plan = DeploymentPlan::for_destroy(&DeploymentState::new("ronzz"));
        assert_eq!(plan.to_string(), "No changes required");

        let plan = DeploymentPlan::for_apply(&inputs(|_| {}), None).unwrap();
        let text = plan.to_string();
        assert!(text.starts_with("apply plan (7 actions):"));
        assert!(text.contains("Create VCN 'ronzz-vcn' (Not yet created)"));
    }
}
