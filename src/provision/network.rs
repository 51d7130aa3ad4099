//! Network topology for the deployment.
//!
//! A new network is a VCN with an internet gateway, a default route through
//! that gateway, a security list allowing SSH and ICMP, and one regional
//! subnet. When a subnet is supplied none of this is created.

use tracing::info;

use crate::config::DeployInputs;
use crate::error::{ProvisionError, Result};
use crate::oci::{
    CoreApi, CreateInternetGatewayDetails, CreateRouteTableDetails, CreateSecurityListDetails,
    CreateSubnetDetails, CreateVcnDetails, EgressSecurityRule, IngressSecurityRule, PortRange,
    ResourceKind, RouteRule, Subnet, TcpOptions,
};

use super::{wait_until_ready, ResourceIds};

/// IANA protocol number for TCP.
const PROTOCOL_TCP: &str = "6";

/// IANA protocol number for ICMP.
const PROTOCOL_ICMP: &str = "1";

/// Declares the network resources of a deployment.
#[derive(Debug, Clone, Copy)]
pub struct NetworkProvisioner<'a> {
    inputs: &'a DeployInputs,
}

impl<'a> NetworkProvisioner<'a> {
    /// Creates a provisioner for the given inputs.
    #[must_use]
    pub const fn new(inputs: &'a DeployInputs) -> Self {
        Self { inputs }
    }

    /// Network kinds this deployment creates, in creation order.
    ///
    /// Empty when a subnet is supplied; the VCN is skipped when one is supplied.
    #[must_use]
    pub fn kinds_to_create(&self) -> Vec<ResourceKind> {
        if self.inputs.subnet_id.is_some() {
            return Vec::new();
        }
        ResourceKind::NETWORK
            .into_iter()
            .filter(|kind| *kind != ResourceKind::Vcn || self.inputs.vcn_id.is_none())
            .collect()
    }

    /// Details for the VCN.
    #[must_use]
    pub fn vcn_details(&self) -> CreateVcnDetails {
        CreateVcnDetails {
            compartment_id: self.inputs.compartment_id.clone(),
            cidr_block: self.inputs.network.vcn_cidr.clone(),
            display_name: self.inputs.display_name(ResourceKind::Vcn.name_suffix()),
            dns_label: self.inputs.vcn_dns_label(),
        }
    }

    /// Details for the internet gateway.
    #[must_use]
    pub fn internet_gateway_details(&self, vcn_id: &str) -> CreateInternetGatewayDetails {
        CreateInternetGatewayDetails {
            compartment_id: self.inputs.compartment_id.clone(),
            vcn_id: vcn_id.to_string(),
            display_name: self
                .inputs
                .display_name(ResourceKind::InternetGateway.name_suffix()),
            is_enabled: true,
        }
    }

    /// Details for the route table with a default route through the gateway.
    #[must_use]
    pub fn route_table_details(&self, vcn_id: &str, gateway_id: &str) -> CreateRouteTableDetails {
        CreateRouteTableDetails {
            compartment_id: self.inputs.compartment_id.clone(),
            vcn_id: vcn_id.to_string(),
            display_name: self.inputs.display_name(ResourceKind::RouteTable.name_suffix()),
            route_rules: vec![RouteRule {
                destination: String::from("0.0.0.0/0"),
                destination_type: String::from("CIDR_BLOCK"),
                network_entity_id: gateway_id.to_string(),
            }],
        }
    }

    /// Details for the security list.
    #[must_use]
    pub fn security_list_details(&self, vcn_id: &str) -> CreateSecurityListDetails {
        let source = &self.inputs.network.ingress_source;

        let mut ingress = vec![
            tcp_rule(source, 22, "Allow SSH"),
            IngressSecurityRule {
                source: source.clone(),
                protocol: String::from(PROTOCOL_ICMP),
                tcp_options: None,
                description: Some(String::from("Allow ICMP")),
            },
        ];

        let mut extra = self.inputs.network.extra_tcp_ports.clone();
        extra.sort_unstable();
        extra.dedup();
        ingress.extend(
            extra
                .into_iter()
                .filter(|port| *port != 22)
                .map(|port| tcp_rule(source, port, &format!("Allow TCP {port}"))),
        );

        CreateSecurityListDetails {
            compartment_id: self.inputs.compartment_id.clone(),
            vcn_id: vcn_id.to_string(),
            display_name: self
                .inputs
                .display_name(ResourceKind::SecurityList.name_suffix()),
            egress_security_rules: vec![EgressSecurityRule {
                destination: String::from("0.0.0.0/0"),
                protocol: String::from("all"),
            }],
            ingress_security_rules: ingress,
        }
    }

    /// Details for the subnet.
    #[must_use]
    pub fn subnet_details(
        &self,
        vcn_id: &str,
        route_table_id: &str,
        security_list_id: &str,
    ) -> CreateSubnetDetails {
        CreateSubnetDetails {
            compartment_id: self.inputs.compartment_id.clone(),
            vcn_id: vcn_id.to_string(),
            cidr_block: self.inputs.network.subnet_cidr.clone(),
            display_name: self.inputs.display_name(ResourceKind::Subnet.name_suffix()),
            dns_label: self.inputs.subnet_dns_label(),
            route_table_id: route_table_id.to_string(),
            security_list_ids: vec![security_list_id.to_string()],
        }
    }

    /// Creates one network resource and waits until it is available.
    ///
    /// `known` must hold the OCIDs of the resources `kind` depends on.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency is missing or the API call fails.
    pub async fn create<A>(&self, api: &A, kind: ResourceKind, known: &ResourceIds) -> Result<String>
    where
        A: CoreApi + ?Sized,
    {
        let need = |dependency: ResourceKind| {
            known.get(&dependency).map(String::as_str).ok_or_else(|| {
                ProvisionError::MissingDependency {
                    action: format!("create {kind}"),
                    dependency: dependency.to_string(),
                }
            })
        };

        let id = match kind {
            ResourceKind::Vcn => api.create_vcn(&self.vcn_details()).await?.id,
            ResourceKind::InternetGateway => {
                let details = self.internet_gateway_details(need(ResourceKind::Vcn)?);
                api.create_internet_gateway(&details).await?.id
            }
            ResourceKind::RouteTable => {
                let details = self.route_table_details(
                    need(ResourceKind::Vcn)?,
                    need(ResourceKind::InternetGateway)?,
                );
                api.create_route_table(&details).await?.id
            }
            ResourceKind::SecurityList => {
                let details = self.security_list_details(need(ResourceKind::Vcn)?);
                api.create_security_list(&details).await?.id
            }
            ResourceKind::Subnet => {
                let details = self.subnet_details(
                    need(ResourceKind::Vcn)?,
                    need(ResourceKind::RouteTable)?,
                    need(ResourceKind::SecurityList)?,
                );
                api.create_subnet(&details).await?.id
            }
            ResourceKind::Instance => {
                return Err(crate::error::RonzzError::internal(
                    "instances are not network resources",
                ));
            }
        };

        info!("Created {kind}: {id}");
        wait_until_ready(api, kind, &id, self.inputs.wait).await?;
        Ok(id)
    }

    /// Checks that a supplied subnet exists and can host the instance.
    ///
    /// Regional subnets always pass. An AD-specific subnet must be in the
    /// requested availability domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the subnet is missing or in another availability domain.
    pub async fn verify_subnet<A>(&self, api: &A, subnet_id: &str) -> Result<Subnet>
    where
        A: CoreApi + ?Sized,
    {
        let subnet = api.get_subnet(subnet_id).await?;
        let requested = &self.inputs.availability_domain;

        if let Some(subnet_ad) = subnet.availability_domain.as_deref()
            && !same_availability_domain(subnet_ad, requested)
        {
            return Err(ProvisionError::AvailabilityDomainMismatch {
                subnet_id: subnet_id.to_string(),
                subnet_ad: subnet_ad.to_string(),
                requested_ad: requested.clone(),
            }
            .into());
        }

        Ok(subnet)
    }

    /// Checks that a supplied VCN exists and is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the VCN is missing or not available.
    pub async fn verify_vcn<A>(&self, api: &A, vcn_id: &str) -> Result<()>
    where
        A: CoreApi + ?Sized,
    {
        wait_until_ready(api, ResourceKind::Vcn, vcn_id, self.inputs.wait).await
    }
}

fn tcp_rule(source: &str, port: u16, description: &str) -> IngressSecurityRule {
    IngressSecurityRule {
        source: source.to_string(),
        protocol: String::from(PROTOCOL_TCP),
        tcp_options: Some(TcpOptions {
            destination_port_range: PortRange { min: port, max: port },
        }),
        description: Some(description.to_string()),
    }
}

/// Compares availability domain names, ignoring the tenancy prefix and case.
///
/// `Uocm:EU-FRANKFURT-1-AD-1` and `EU-FRANKFURT-1-AD-1` name the same domain.
fn same_availability_domain(a: &str, b: &str) -> bool {
    let strip = |ad: &str| ad.rsplit(':').next().unwrap_or(ad).trim().to_ascii_uppercase();
    strip(a) == strip(b)
}
