//! Planning module for deployment operations.
//!
//! This module turns the inputs and the recorded state into an ordered plan
//! and executes it against the OCI API.

mod plan;
mod executor;

pub use plan::{DeploymentPlan, PlannedAction, ActionType};
pub use executor::{ActionResult, ExecutionResult, PlanExecutor};
