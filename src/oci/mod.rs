//! OCI Core Services integration module.
//!
//! This module provides credentials loading, request signing, the REST
//! client and the trait seams the provisioning steps are written against.

mod api;
mod auth;
mod client;
mod signer;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use api::{ComputeApi, CoreApi, ImageCatalog, LifecycleApi, VirtualNetworkApi};
pub use auth::{OciCredentials, DEFAULT_PROFILE};
pub use client::{OciClient, API_VERSION};
pub use signer::{RequestSigner, SignedHeaders, JSON_CONTENT_TYPE};
pub use types::{
    CreateInternetGatewayDetails, CreateRouteTableDetails, CreateSecurityListDetails,
    CreateSubnetDetails, CreateVcnDetails, CreateVnicDetails, EgressSecurityRule, Image,
    ImageQuery, IngressSecurityRule, Instance, InstanceShapeConfig, InstanceSourceDetails,
    InternetGateway, LaunchInstanceDetails, LaunchShapeConfig, LifecycleProbe, LifecycleState,
    PortRange, ResourceKind, RouteRule, RouteTable, SecurityList, Subnet, TcpOptions, Vcn, Vnic,
    VnicAttachment,
};
