//! OCI Core Services API types.
//!
//! Response types deserialize the subset of fields the tool reads; request
//! types serialize exactly the create details it sends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state reported by OCI resources.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// Resource is being created.
    Provisioning,
    /// Network resource is ready.
    Available,
    /// Instance is starting.
    Starting,
    /// Instance is running.
    Running,
    /// Instance is stopping.
    Stopping,
    /// Instance is stopped.
    Stopped,
    /// VNIC attachment is in progress.
    Attaching,
    /// VNIC is attached.
    Attached,
    /// VNIC is being detached.
    Detaching,
    /// VNIC is detached.
    Detached,
    /// Resource is being deleted.
    Terminating,
    /// Resource is deleted.
    Terminated,
    /// Resource failed.
    Faulty,
    /// State not known to this tool.
    #[default]
    #[serde(other)]
    Unknown,
}

impl LifecycleState {
    /// Returns true if the resource can never become ready again.
    #[must_use]
    pub const fn is_gone(self) -> bool {
        matches!(self, Self::Terminating | Self::Terminated | Self::Faulty)
    }

    /// Wire name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Provisioning => "PROVISIONING",
            Self::Available => "AVAILABLE",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Attaching => "ATTACHING",
            Self::Attached => "ATTACHED",
            Self::Detaching => "DETACHING",
            Self::Detached => "DETACHED",
            Self::Terminating => "TERMINATING",
            Self::Terminated => "TERMINATED",
            Self::Faulty => "FAULTY",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resources the tool creates, in creation order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Virtual cloud network.
    Vcn,
    /// Internet gateway.
    InternetGateway,
    /// Route table.
    RouteTable,
    /// Security list.
    SecurityList,
    /// Subnet.
    Subnet,
    /// Compute instance.
    Instance,
}

impl ResourceKind {
    /// All kinds in creation order.
    pub const ALL: [Self; 6] = [
        Self::Vcn,
        Self::InternetGateway,
        Self::RouteTable,
        Self::SecurityList,
        Self::Subnet,
        Self::Instance,
    ];

    /// Network kinds in creation order.
    pub const NETWORK: [Self; 5] = [
        Self::Vcn,
        Self::InternetGateway,
        Self::RouteTable,
        Self::SecurityList,
        Self::Subnet,
    ];

    /// Kinds in the order they must be deleted.
    pub const DESTROY_ORDER: [Self; 6] = [
        Self::Instance,
        Self::Subnet,
        Self::RouteTable,
        Self::SecurityList,
        Self::InternetGateway,
        Self::Vcn,
    ];

    /// Collection path under the API version, e.g. `internetGateways`.
    #[must_use]
    pub const fn api_path(self) -> &'static str {
        match self {
            Self::Vcn => "vcns",
            Self::InternetGateway => "internetGateways",
            Self::RouteTable => "routeTables",
            Self::SecurityList => "securityLists",
            Self::Subnet => "subnets",
            Self::Instance => "instances",
        }
    }

    /// Suffix appended to the project name to form the display name.
    #[must_use]
    pub const fn name_suffix(self) -> &'static str {
        match self {
            Self::Vcn => "vcn",
            Self::InternetGateway => "internet-gateway",
            Self::RouteTable => "route-table",
            Self::SecurityList => "security-list",
            Self::Subnet => "subnet",
            Self::Instance => "linux-server",
        }
    }

    /// State in which the resource is usable by its dependants.
    #[must_use]
    pub const fn ready_state(self) -> LifecycleState {
        match self {
            Self::Instance => LifecycleState::Running,
            _ => LifecycleState::Available,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Vcn => "VCN",
            Self::InternetGateway => "internet gateway",
            Self::RouteTable => "route table",
            Self::SecurityList => "security list",
            Self::Subnet => "subnet",
            Self::Instance => "instance",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Responses
// ============================================================================

/// A virtual cloud network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vcn {
    /// VCN OCID.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
    /// Primary CIDR block.
    #[serde(default)]
    pub cidr_block: Option<String>,
}

/// An internet gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternetGateway {
    /// Gateway OCID.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
}

/// A route table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTable {
    /// Route table OCID.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
}

/// A security list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityList {
    /// Security list OCID.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
}

/// A subnet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    /// Subnet OCID.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
    /// Availability domain; absent for regional subnets.
    #[serde(default)]
    pub availability_domain: Option<String>,
    /// CIDR block.
    #[serde(default)]
    pub cidr_block: Option<String>,
}

/// A boot image from the platform catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Image OCID.
    pub id: String,
    /// Display name, e.g. `Canonical-Ubuntu-24.04-aarch64-2024.10.08-0`.
    pub display_name: String,
    /// Operating system.
    #[serde(default)]
    pub operating_system: Option<String>,
    /// Operating system version.
    #[serde(default)]
    pub operating_system_version: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
    /// Creation time.
    pub time_created: DateTime<Utc>,
}

/// Shape configuration reported for an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceShapeConfig {
    /// OCPU count.
    #[serde(default)]
    pub ocpus: Option<f32>,
    /// Memory in GB.
    #[serde(default, rename = "memoryInGBs")]
    pub memory_in_gbs: Option<f32>,
}

/// A compute instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Instance OCID.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
    /// Shape.
    #[serde(default)]
    pub shape: String,
    /// Availability domain.
    #[serde(default)]
    pub availability_domain: Option<String>,
    /// Shape configuration.
    #[serde(default)]
    pub shape_config: Option<InstanceShapeConfig>,
}

/// Attachment of a VNIC to an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnicAttachment {
    /// Attachment OCID.
    pub id: String,
    /// Attached instance.
    pub instance_id: String,
    /// VNIC OCID, absent while attaching.
    #[serde(default)]
    pub vnic_id: Option<String>,
    /// Lifecycle state.
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
}

/// A virtual network interface card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vnic {
    /// VNIC OCID.
    pub id: String,
    /// Public IP address, if assigned.
    #[serde(default)]
    pub public_ip: Option<String>,
    /// Private IP address.
    #[serde(default)]
    pub private_ip: Option<String>,
    /// Whether this is the instance's primary VNIC.
    #[serde(default)]
    pub is_primary: Option<bool>,
}

/// Minimal view used when only the lifecycle state matters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleProbe {
    /// Lifecycle state.
    #[serde(default)]
    pub lifecycle_state: LifecycleState,
}

// ============================================================================
// Requests
// ============================================================================

/// Details for creating a VCN.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateVcnDetails {
    /// Target compartment.
    pub compartment_id: String,
    /// CIDR block.
    pub cidr_block: String,
    /// Display name.
    pub display_name: String,
    /// DNS label.
    pub dns_label: String,
}

/// Details for creating an internet gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateInternetGatewayDetails {
    /// Target compartment.
    pub compartment_id: String,
    /// Owning VCN.
    pub vcn_id: String,
    /// Display name.
    pub display_name: String,
    /// Whether the gateway is enabled.
    pub is_enabled: bool,
}

/// A route rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteRule {
    /// Destination CIDR.
    pub destination: String,
    /// Destination type, `CIDR_BLOCK`.
    pub destination_type: String,
    /// Target gateway OCID.
    pub network_entity_id: String,
}

/// Details for creating a route table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteTableDetails {
    /// Target compartment.
    pub compartment_id: String,
    /// Owning VCN.
    pub vcn_id: String,
    /// Display name.
    pub display_name: String,
    /// Route rules.
    pub route_rules: Vec<RouteRule>,
}

/// Inclusive TCP port range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortRange {
    /// Lowest port.
    pub min: u16,
    /// Highest port.
    pub max: u16,
}

/// TCP options of a security rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TcpOptions {
    /// Destination port range.
    pub destination_port_range: PortRange,
}

/// Egress security rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EgressSecurityRule {
    /// Destination CIDR.
    pub destination: String,
    /// Protocol number or `all`.
    pub protocol: String,
}

/// Ingress security rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IngressSecurityRule {
    /// Source CIDR.
    pub source: String,
    /// Protocol number (`6` TCP, `1` ICMP).
    pub protocol: String,
    /// TCP options.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tcp_options: Option<TcpOptions>,
    /// Rule description.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
}

/// Details for creating a security list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecurityListDetails {
    /// Target compartment.
    pub compartment_id: String,
    /// Owning VCN.
    pub vcn_id: String,
    /// Display name.
    pub display_name: String,
    /// Egress rules.
    pub egress_security_rules: Vec<EgressSecurityRule>,
    /// Ingress rules.
    pub ingress_security_rules: Vec<IngressSecurityRule>,
}

/// Details for creating a subnet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubnetDetails {
    /// Target compartment.
    pub compartment_id: String,
    /// Owning VCN.
    pub vcn_id: String,
    /// CIDR block.
    pub cidr_block: String,
    /// Display name.
    pub display_name: String,
    /// DNS label.
    pub dns_label: String,
    /// Route table used by the subnet.
    pub route_table_id: String,
    /// Security lists applied to the subnet.
    pub security_list_ids: Vec<String>,
}

/// Shape configuration for flexible shapes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LaunchShapeConfig {
    /// OCPU count.
    pub ocpus: f32,
    /// Memory in GB.
    #[serde(rename = "memoryInGBs")]
    pub memory_in_gbs: f32,
}

/// Primary VNIC details for a launch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateVnicDetails {
    /// Subnet to attach to.
    pub subnet_id: String,
    /// Display name.
    pub display_name: String,
    /// Whether to assign a public IP.
    pub assign_public_ip: bool,
}

/// Boot source of an instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "sourceType", rename_all = "camelCase")]
pub enum InstanceSourceDetails {
    /// Boot from a catalog or custom image.
    #[serde(rename_all = "camelCase")]
    Image {
        /// Image OCID.
        image_id: String,
    },
}

/// Details for launching an instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchInstanceDetails {
    /// Target compartment.
    pub compartment_id: String,
    /// Availability domain.
    pub availability_domain: String,
    /// Display name.
    pub display_name: String,
    /// Shape.
    pub shape: String,
    /// Shape configuration, only for flexible shapes.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub shape_config: Option<LaunchShapeConfig>,
    /// Primary VNIC.
    pub create_vnic_details: CreateVnicDetails,
    /// Boot source.
    pub source_details: InstanceSourceDetails,
    /// Instance metadata (`ssh_authorized_keys`).
    pub metadata: BTreeMap<String, String>,
}

/// Query for listing catalog images, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageQuery {
    /// Compartment to list from.
    pub compartment_id: String,
    /// Operating system filter.
    pub operating_system: Option<String>,
    /// Operating system version filter.
    pub operating_system_version: Option<String>,
    /// Compatible shape filter.
    pub shape: Option<String>,
    /// Exact display name filter.
    pub display_name: Option<String>,
    /// Page size.
    pub limit: Option<u32>,
}

impl ImageQuery {
    /// Builds the query parameters, sorted by creation time descending.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("compartmentId", self.compartment_id.clone())];

        let optional = [
            ("operatingSystem", &self.operating_system),
            ("operatingSystemVersion", &self.operating_system_version),
            ("shape", &self.shape),
            ("displayName", &self.display_name),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                params.push((key, value.clone()));
            }
        }

        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params.push(("sortBy", String::from("TIMECREATED")));
        params.push(("sortOrder", String::from("DESC")));
        params
    }
}
