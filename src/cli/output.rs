//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::oci::Image;
use crate::planner::{ActionType, DeploymentPlan, ExecutionResult};
use crate::provision::{DeploymentOutputs, ResolvedImage};
use crate::state::DeploymentState;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "OCID")]
    id: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Output row for table display.
#[derive(Tabled)]
struct OutputRow {
    #[tabled(rename = "Output")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Catalog image row for table display.
#[derive(Tabled)]
struct ImageRow {
    #[tabled(rename = "Display name")]
    display_name: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "OCID")]
    id: String,
}

/// Recorded resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Resource")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Owned")]
    owned: String,
    #[tabled(rename = "OCID")]
    id: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Returns true when JSON output was requested.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Formats a deployment plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &DeploymentPlan, image: Option<&ResolvedImage>) -> String {
        match self.format {
            OutputFormat::Json => {
                let mut json = PlanJson::from(plan);
                json.image = image.cloned();
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_plan_text(plan, image),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &DeploymentPlan, image: Option<&ResolvedImage>) -> String {
        if plan.actions.is_empty() {
            return format!("{} Nothing to do.\n", "✓".green());
        }

        let mut output = String::new();

        let _ = writeln!(output, "\nDeployment plan ({})", plan.operation);
        let _ = write!(output, "   Config hash: {}\n\n", short(&plan.config_hash));

        let rows: Vec<PlanActionRow> = plan
            .actions
            .iter()
            .enumerate()
            .map(|(i, a)| PlanActionRow {
                index: i + 1,
                action: Self::format_action_type(a.action_type),
                resource: match a.kind {
                    Some(kind) => format!("{kind}: {}", Self::truncate(&a.resource_name, 40)),
                    None => Self::truncate(&a.resource_name, 50),
                },
                id: a.resource_id.as_deref().map_or_else(|| String::from("-"), |id| Self::truncate(id, 40)),
                reason: Self::truncate(&a.reason, 40),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if let Some(image) = image {
            let _ = writeln!(
                output,
                "\nImage: {} ({}) via {}",
                image.display_name.as_deref().unwrap_or("unnamed"),
                image.id,
                image.source
            );
        }

        let _ = write!(
            output,
            "\nPlan: {} to create, {} to reuse, {} to destroy\n",
            plan.create_count().to_string().green(),
            plan.reuse_count().to_string().yellow(),
            plan.delete_count().to_string().red()
        );

        if plan.config_changed() {
            let _ = write!(
                output,
                "\n{} Configuration changed since the last apply. Existing resources are not updated; run destroy then apply to rebuild.\n",
                "⚠".yellow()
            );
        }

        output
    }

    /// Formats the result of executing a plan.
    #[must_use]
    pub fn format_execution(&self, result: &ExecutionResult) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "success": result.success,
                    "executed": result.total_executed,
                    "successful": result.successful,
                    "failed": result.failed,
                    "skipped": result.skipped,
                    "error": result.first_error(),
                    "outputs": result.outputs,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if result.success {
                    format!("{} {result}\n", "✓".green())
                } else {
                    format!("{} {result}\n", "✗".red())
                };
                if let Some(error) = result.first_error() {
                    let _ = writeln!(output, "   {error}");
                }
                if let Some(outputs) = &result.outputs {
                    output.push('\n');
                    output.push_str(&Self::format_outputs_text(outputs));
                }
                output
            }
        }
    }

    /// Formats deployment outputs.
    #[must_use]
    pub fn format_outputs(&self, outputs: &DeploymentOutputs) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(outputs).unwrap_or_default(),
            OutputFormat::Text => Self::format_outputs_text(outputs),
        }
    }

    fn format_outputs_text(outputs: &DeploymentOutputs) -> String {
        let rows: Vec<OutputRow> = outputs
            .entries()
            .into_iter()
            .map(|(name, value)| OutputRow {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect();

        let mut output = Table::new(rows).to_string();
        output.push('\n');
        if !outputs.has_public_ip() {
            let _ = writeln!(output, "\n{} The instance has no public IP address.", "⚠".yellow());
        }
        output
    }

    /// Formats a list of catalog images.
    #[must_use]
    pub fn format_images(&self, images: &[Image]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(images).unwrap_or_default(),
            OutputFormat::Text => {
                if images.is_empty() {
                    return format!("{} No images match the configured filter.\n", "⚠".yellow());
                }
                let rows: Vec<ImageRow> = images
                    .iter()
                    .map(|i| ImageRow {
                        display_name: i.display_name.clone(),
                        created: i.time_created.format("%Y-%m-%d").to_string(),
                        id: i.id.clone(),
                    })
                    .collect();
                let mut output = Table::new(rows).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats a validation result with a short configuration summary.
    #[must_use]
    pub fn format_validation(
        &self,
        result: &ValidationResult,
        summary: &[(&str, String)],
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": result.is_valid(),
                    "errors": result
                        .errors
                        .iter()
                        .map(|e| serde_json::json!({ "field": e.field, "message": e.message }))
                        .collect::<Vec<_>>(),
                    "warnings": result.warnings,
                    "summary": summary
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), serde_json::Value::String(v.clone())))
                        .collect::<serde_json::Map<_, _>>(),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = String::new();
                if result.is_valid() {
                    let _ = writeln!(output, "{} Configuration is valid!", "✓".green());
                } else {
                    let _ = writeln!(
                        output,
                        "{} Configuration has {} error(s):",
                        "✗".red(),
                        result.error_count()
                    );
                    for error in &result.errors {
                        let _ = writeln!(output, "  - {}: {}", error.field, error.message);
                    }
                }

                if show_warnings && !result.warnings.is_empty() {
                    output.push_str("\nWarnings:\n");
                    for warning in &result.warnings {
                        let _ = writeln!(output, "  - {warning}");
                    }
                }

                output.push_str("\nConfiguration summary:\n");
                for (key, value) in summary {
                    let _ = writeln!(output, "  {key}: {value}");
                }
                output
            }
        }
    }

    /// Formats deployment state.
    #[must_use]
    pub fn format_state(&self, state: &DeploymentState) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(state).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();

                let _ = write!(output, "\nState: {}\n\n", state.project);
                let _ = writeln!(output, "   Version: {}", state.version);
                let _ = writeln!(output, "   Config hash: {}", short(&state.config_hash));
                let _ = writeln!(output, "   Last updated: {}", state.last_updated);
                if let Some(image) = &state.image {
                    let _ = writeln!(output, "   Image: {} ({})", image.id, image.source);
                }

                if !state.resources.is_empty() {
                    let rows: Vec<ResourceRow> = state
                        .resources
                        .iter()
                        .map(|(kind, r)| ResourceRow {
                            kind: kind.to_string(),
                            name: r.display_name.clone().unwrap_or_default(),
                            owned: if r.owned { "yes" } else { "no" }.to_string(),
                            id: r.id.clone(),
                        })
                        .collect();
                    output.push('\n');
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }

                if !state.history.is_empty() {
                    let _ = writeln!(output, "\n   Recent history ({}):", state.history.len());
                    for entry in state.history.iter().rev().take(5) {
                        let status = if entry.success { "✓" } else { "✗" };
                        let _ = writeln!(
                            output,
                            "     {status} {} - {} by {} ({} resources)",
                            entry.timestamp.format("%Y-%m-%d %H:%M"),
                            entry.operation,
                            entry.operator.as_deref().unwrap_or("unknown"),
                            entry.resources.len()
                        );
                    }
                }

                output
            }
        }
    }

    /// Formats a one-line success message.
    #[must_use]
    pub fn success(&self, message: &str) -> String {
        self.message("success", &"✓".green(), message)
    }

    /// Formats a one-line warning message.
    #[must_use]
    pub fn warning(&self, message: &str) -> String {
        self.message("warning", &"⚠".yellow(), message)
    }

    fn message(&self, status: &str, marker: &colored::ColoredString, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": status, "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{marker} {message}"),
        }
    }

    /// Formats an action type with color.
    fn format_action_type(action_type: ActionType) -> String {
        match action_type {
            ActionType::Create => "+create".green().to_string(),
            ActionType::Reuse => "=reuse".dimmed().to_string(),
            ActionType::Verify => "?verify".cyan().to_string(),
            ActionType::ResolveImage => "?image".cyan().to_string(),
            ActionType::Delete => "-delete".red().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct PlanJson {
    operation: String,
    config_hash: String,
    config_changed: bool,
    creates: usize,
    reuses: usize,
    deletes: usize,
    image: Option<ResolvedImage>,
    actions: Vec<ActionJson>,
}

#[derive(serde::Serialize)]
struct ActionJson {
    action_type: String,
    kind: Option<String>,
    resource: String,
    resource_id: Option<String>,
    reason: String,
}

impl From<&DeploymentPlan> for PlanJson {
    fn from(plan: &DeploymentPlan) -> Self {
        Self {
            operation: plan.operation.to_string(),
            config_hash: plan.config_hash.clone(),
            config_changed: plan.config_changed(),
            creates: plan.create_count(),
            reuses: plan.reuse_count(),
            deletes: plan.delete_count(),
            image: None,
            actions: plan
                .actions
                .iter()
                .map(|a| ActionJson {
                    action_type: a.action_type.to_string(),
                    kind: a.kind.map(|k| k.to_string()),
                    resource: a.resource_name.clone(),
                    resource_id: a.resource_id.clone(),
                    reason: a.reason.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci::ResourceKind;
    use crate::provision::UNAVAILABLE;
    use crate::state::ResourceState;

    fn outputs(public_ip: &str) -> DeploymentOutputs {
        DeploymentOutputs {
            instance_id: String::from("ocid1.instance.x"),
            instance_name: String::from("ronzz-linux-server"),
            instance_shape: String::from("VM.Standard.A1.Flex"),
            public_ip: public_ip.to_string(),
            private_ip: String::from("10.0.1.2"),
            instance_state: String::from("RUNNING"),
        }
    }

    #[test]
    fn test_outputs_text_lists_every_key() {
        let text = OutputFormatter::new(OutputFormat::Text).format_outputs(&outputs("203.0.113.10"));
        for key in crate::provision::OUTPUT_KEYS {
            assert!(text.contains(key), "{key}");
        }
        assert!(text.contains("203.0.113.10"));
        assert!(!text.contains("no public IP"));

        let text = OutputFormatter::new(OutputFormat::Text).format_outputs(&outputs(UNAVAILABLE));
        assert!(text.contains(UNAVAILABLE));
        assert!(text.contains("no public IP"));
    }

    #[test]
    fn test_outputs_json() {
        let json = OutputFormatter::new(OutputFormat::Json).format_outputs(&outputs(UNAVAILABLE));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["public_ip"], "N/A");
        assert_eq!(value["instance_state"], "RUNNING");
    }

    #[test]
    fn test_destroy_plan_json() {
        let mut state = DeploymentState::new("ronzz");
        state.record(ResourceKind::Vcn, ResourceState::created("ocid1.vcn.x", None));
        let plan = DeploymentPlan::for_destroy(&state);

        let json = OutputFormatter::new(OutputFormat::Json).format_plan(&plan, None);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["operation"], "destroy");
        assert_eq!(value["deletes"], 1);
        assert_eq!(value["actions"][0]["resource_id"], "ocid1.vcn.x");
        assert!(value["image"].is_null());
    }

    #[test]
    fn test_state_text_marks_supplied_resources() {
        let mut state = DeploymentState::new("ronzz");
        state.record(ResourceKind::Subnet, ResourceState::supplied("ocid1.subnet.x"));

        let text = OutputFormatter::new(OutputFormat::Text).format_state(&state);
        assert!(text.contains("ocid1.subnet.x"));
        assert!(text.contains("no"));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("ocid1.instance.abcdef", 10), "ocid1.i...");
        assert_eq!(OutputFormatter::truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_messages() {
        let json = OutputFormatter::new(OutputFormat::Json).warning("careful");
        assert!(json.contains("\"warning\""));
        assert!(OutputFormatter::new(OutputFormat::Text).success("done").ends_with("done"));
        assert!(OutputFormatter::new(OutputFormat::Json).is_json());
    }
}
