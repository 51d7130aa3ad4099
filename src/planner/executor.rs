//! Plan executor for applying deployment plans.
//!
//! Actions run one at a time. Every resource is recorded in the state as
//! soon as it exists, so a failed apply leaves a state that destroy can
//! clean up. The caller saves the state whether or not the plan succeeded.

use tracing::{error, info, warn};

use crate::config::DeployInputs;
use crate::error::{ProvisionError, Result, RonzzError};
use crate::oci::{CoreApi, ResourceKind};
use crate::provision::{
    wait_until_deleted, wait_until_ready, DeploymentOutputs, ImageResolver, InstanceDeclarator,
    NetworkProvisioner, OutputExporter, ResourceIds,
};
use crate::state::{
    DeploymentHistoryEntry, DeploymentOperation, DeploymentState, ResourceState,
};

use super::plan::{ActionType, DeploymentPlan, PlannedAction};

/// Executor for deployment plans.
pub struct PlanExecutor<'a, A: ?Sized> {
    /// Core Services API.
    api: &'a A,
    /// Deployment inputs.
    inputs: &'a DeployInputs,
}

/// Result of executing a single action.
#[derive(Debug)]
pub struct ActionResult {
    /// Action index.
    pub index: usize,
    /// Action that was executed.
    pub action: PlannedAction,
    /// Whether the action succeeded.
    pub success: bool,
    /// OCID the action produced or touched.
    pub resource_id: Option<String>,
    /// Error message (if failed).
    pub error: Option<String>,
}

/// Result of executing the entire plan.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Individual action results.
    pub results: Vec<ActionResult>,
    /// Total actions executed.
    pub total_executed: usize,
    /// Number of successful actions.
    pub successful: usize,
    /// Number of failed actions.
    pub failed: usize,
    /// Number of actions not run after a failure.
    pub skipped: usize,
    /// Whether the entire plan succeeded.
    pub success: bool,
    /// Outputs read after a successful apply.
    pub outputs: Option<DeploymentOutputs>,
}

/// Values produced by earlier actions of the same run.
#[derive(Debug, Default)]
struct RunContext {
    ids: ResourceIds,
    image_id: Option<String>,
}

impl<'a, A> PlanExecutor<'a, A>
where
    A: CoreApi + ?Sized,
{
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(api: &'a A, inputs: &'a DeployInputs) -> Self {
        Self { api, inputs }
    }

    /// Executes a deployment plan, updating `state` as resources appear or go.
    ///
    /// Execution stops at the first failed action; the failure is reported in
    /// the returned [`ExecutionResult`] and in the state history.
    ///
    /// # Errors
    ///
    /// Returns an error only if the outputs of a completed apply cannot be read.
    pub async fn execute(
        &self,
        plan: &DeploymentPlan,
        state: &mut DeploymentState,
    ) -> Result<ExecutionResult> {
        info!(
            "Executing {} plan with {} actions",
            plan.operation,
            plan.actions.len()
        );

        let mut context = RunContext {
            ids: state.resource_ids(),
            image_id: state.image.as_ref().map(|image| image.id.clone()),
        };
        let mut results = Vec::new();

        for (idx, action) in plan.actions.iter().enumerate() {
            info!("Executing action {}: {}", idx, action.description());

            let result = match self.execute_action(action, state, &mut context).await {
                Ok(resource_id) => ActionResult {
                    index: idx,
                    action: action.clone(),
                    success: true,
                    resource_id,
                    error: None,
                },
                Err(e) => {
                    error!("{} failed: {e}", action.description());
                    ActionResult {
                        index: idx,
                        action: action.clone(),
                        success: false,
                        resource_id: action.resource_id.clone(),
                        error: Some(e.to_string()),
                    }
                }
            };

            let failed = !result.success;
            results.push(result);
            if failed {
                break;
            }
        }

        let successful = results.iter().filter(|r| r.success).count();
        let failed = results.len() - successful;
        let skipped = plan.actions.len() - results.len();

        let mut execution_result = ExecutionResult {
            total_executed: results.len(),
            successful,
            failed,
            skipped,
            success: failed == 0,
            outputs: None,
            results,
        };

        let affected: Vec<String> = execution_result
            .results
            .iter()
            .filter_map(|r| r.resource_id.clone())
            .collect();

        if execution_result.success {
            self.finish(plan, state, &context, &mut execution_result).await?;
            state.add_history(DeploymentHistoryEntry::new(
                plan.operation,
                &plan.config_hash,
                affected,
            ));
        } else {
            let message = execution_result
                .results
                .iter()
                .find_map(|r| r.error.clone())
                .unwrap_or_default();
            state.add_history(DeploymentHistoryEntry::failed(
                plan.operation,
                &plan.config_hash,
                affected,
                &message,
            ));
        }

        Ok(execution_result)
    }

    async fn finish(
        &self,
        plan: &DeploymentPlan,
        state: &mut DeploymentState,
        context: &RunContext,
        execution_result: &mut ExecutionResult,
    ) -> Result<()> {
        match plan.operation {
            DeploymentOperation::Apply => {
                let instance_id = Self::need(&context.ids, ResourceKind::Instance, "export outputs")?;
                let outputs =
                    OutputExporter::export(self.api, &self.inputs.compartment_id, instance_id).await?;
                state.outputs = Some(outputs.clone());
                state.config_hash.clone_from(&plan.config_hash);
                execution_result.outputs = Some(outputs);
            }
            DeploymentOperation::Destroy => {
                state.image = None;
                state.outputs = None;
            }
        }
        Ok(())
    }

    async fn execute_action(
        &self,
        action: &PlannedAction,
        state: &mut DeploymentState,
        context: &mut RunContext,
    ) -> Result<Option<String>> {
        let network = NetworkProvisioner::new(self.inputs);

        match (action.action_type, action.kind) {
            (ActionType::ResolveImage, _) => {
                let image = ImageResolver::new(self.api, self.inputs).resolve().await?;
                let id = image.id.clone();
                context.image_id = Some(id.clone());
                state.image = Some(image);
                Ok(Some(id))
            }
            (ActionType::Verify, Some(kind)) => {
                let id = Self::target(action)?;
                match kind {
                    ResourceKind::Subnet => {
                        network.verify_subnet(self.api, id).await?;
                    }
                    _ => network.verify_vcn(self.api, id).await?,
                }
                context.ids.insert(kind, id.to_string());
                state.record(kind, ResourceState::supplied(id));
                Ok(Some(id.to_string()))
            }
            (ActionType::Reuse, Some(kind)) => {
                let id = Self::target(action)?;
                wait_until_ready(self.api, kind, id, self.inputs.wait).await?;
                info!("Reusing {kind} {id}");
                context.ids.insert(kind, id.to_string());
                Ok(Some(id.to_string()))
            }
            (ActionType::Create, Some(ResourceKind::Instance)) => {
                let subnet_id = Self::need(&context.ids, ResourceKind::Subnet, "launch instance")?;
                let image_id = context.image_id.as_deref().ok_or_else(|| {
                    ProvisionError::MissingDependency {
                        action: String::from("launch instance"),
                        dependency: String::from("image"),
                    }
                })?;
                let id = InstanceDeclarator::new(self.inputs)
                    .launch(self.api, subnet_id, image_id)
                    .await?;
                self.record_created(state, context, ResourceKind::Instance, &id);
                Ok(Some(id))
            }
            (ActionType::Create, Some(kind)) => {
                let id = network.create(self.api, kind, &context.ids).await?;
                self.record_created(state, context, kind, &id);
                Ok(Some(id))
            }
            (ActionType::Delete, Some(kind)) => {
                let id = Self::target(action)?.to_string();
                match self.api.delete_resource(kind, &id).await {
                    Ok(()) => wait_until_deleted(self.api, kind, &id, self.inputs.wait).await?,
                    Err(e) if e.is_not_found() => warn!("{kind} {id} was already deleted"),
                    Err(e) => return Err(e),
                }
                info!("Deleted {kind} {id}");
                state.forget(kind);
                context.ids.remove(&kind);
                Ok(Some(id))
            }
            (action_type, None) => Err(RonzzError::internal(format!(
                "{action_type} action without a resource kind"
            ))),
        }
    }

    fn record_created(
        &self,
        state: &mut DeploymentState,
        context: &mut RunContext,
        kind: ResourceKind,
        id: &str,
    ) {
        let display_name = self.inputs.display_name(kind.name_suffix());
        state.record(kind, ResourceState::created(id, Some(display_name)));
        context.ids.insert(kind, id.to_string());
    }

    fn target(action: &PlannedAction) -> Result<&str> {
        action.resource_id.as_deref().ok_or_else(|| {
            RonzzError::internal(format!("{} has no resource id", action.description()))
        })
    }

    fn need<'i>(ids: &'i ResourceIds, kind: ResourceKind, action: &str) -> Result<&'i str> {
        ids.get(&kind).map(String::as_str).ok_or_else(|| {
            ProvisionError::MissingDependency {
                action: action.to_string(),
                dependency: kind.to_string(),
            }
            .into()
        })
    }
}

impl ExecutionResult {
    /// Returns true if all actions succeeded.
    #[must_use]
    pub const fn all_successful(&self) -> bool {
        self.success && self.failed == 0 && self.skipped == 0
    }

    /// Returns the first error message, if any action failed.
    #[must_use]
    pub fn first_error(&self) -> Option<&str> {
        self.results.iter().find_map(|r| r.error.as_deref())
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Executed {} actions: {} successful, {} failed, {} skipped",
            self.total_executed, self.successful, self.failed, self.skipped
        )
    }
}
