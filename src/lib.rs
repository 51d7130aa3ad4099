// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Ronzz Deploy
//!
//! Provisions a single Linux virtual machine and the network it needs on
//! Oracle Cloud Infrastructure.
//!
//! ## Overview
//!
//! One run walks a fixed topology:
//!
//! - A VCN with an internet gateway, a default route, a security list
//!   allowing SSH and ICMP, and one subnet. Skipped when a subnet is supplied.
//! - The boot image, resolved from an OCID, a display name, or the newest
//!   catalog image for the configured operating system and shape.
//! - The compute instance, attached to the subnet with a public IP.
//! - The outputs: instance identifiers and its public and private addresses.
//!
//! The OCIDs the tool creates are recorded in a local state file, so a second
//! `apply` reuses them and `destroy` removes exactly those.
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing, validation and resolved inputs
//! - [`oci`]: Credentials, request signing and the Core Services client
//! - [`provision`]: Network, image, instance and output steps
//! - [`planner`]: Apply and destroy plans and their execution
//! - [`state`]: Local state storage
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! project:
//!   name: ronzz
//!
//! oci:
//!   compartment_id: ocid1.compartment.oc1..example
//!   availability_domain: Uocm:EU-FRANKFURT-1-AD-1
//!   ssh_public_key_file: ~/.ssh/id_ed25519.pub
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod oci;
pub mod planner;
pub mod provision;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigHasher, ConfigParser, ConfigValidator, DeployConfig, DeployInputs};
pub use error::{Result, RonzzError};
pub use oci::{CoreApi, OciClient, OciCredentials};
pub use planner::{DeploymentPlan, PlanExecutor};
pub use provision::{DeploymentOutputs, ImageResolver, ResolvedImage};
pub use state::{DeploymentState, LocalStateStore, StateStore};
