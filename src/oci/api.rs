//! Trait seams over the OCI Core Services API.
//!
//! Provisioning code depends on these traits rather than on [`OciClient`]
//! so that it can run against in-memory doubles in tests.
//!
//! [`OciClient`]: super::OciClient

use async_trait::async_trait;

use crate::error::Result;

use super::types::{
    CreateInternetGatewayDetails, CreateRouteTableDetails, CreateSecurityListDetails,
    CreateSubnetDetails, CreateVcnDetails, Image, ImageQuery, Instance, InternetGateway,
    LaunchInstanceDetails, LifecycleState, ResourceKind, RouteTable, SecurityList, Subnet, Vcn,
    Vnic, VnicAttachment,
};

/// Virtual networking operations.
#[async_trait]
pub trait VirtualNetworkApi: Send + Sync {
    /// Creates a VCN.
    async fn create_vcn(&self, details: &CreateVcnDetails) -> Result<Vcn>;

    /// Creates an internet gateway.
    async fn create_internet_gateway(
        &self,
        details: &CreateInternetGatewayDetails,
    ) -> Result<InternetGateway>;

    /// Creates a route table.
    async fn create_route_table(&self, details: &CreateRouteTableDetails) -> Result<RouteTable>;

    /// Creates a security list.
    async fn create_security_list(
        &self,
        details: &CreateSecurityListDetails,
    ) -> Result<SecurityList>;

    /// Creates a subnet.
    async fn create_subnet(&self, details: &CreateSubnetDetails) -> Result<Subnet>;

    /// Gets a subnet.
    async fn get_subnet(&self, subnet_id: &str) -> Result<Subnet>;

    /// Gets a VNIC.
    async fn get_vnic(&self, vnic_id: &str) -> Result<Vnic>;
}

/// Compute operations.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Launches an instance.
    async fn launch_instance(&self, details: &LaunchInstanceDetails) -> Result<Instance>;

    /// Gets an instance.
    async fn get_instance(&self, instance_id: &str) -> Result<Instance>;

    /// Lists the VNIC attachments of an instance.
    async fn list_vnic_attachments(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VnicAttachment>>;
}

/// Image catalog lookups.
#[async_trait]
pub trait ImageCatalog: Send + Sync {
    /// Lists images matching the query, newest first.
    async fn list_images(&self, query: &ImageQuery) -> Result<Vec<Image>>;

    /// Gets an image, returning `None` if it does not exist.
    async fn get_image(&self, image_id: &str) -> Result<Option<Image>>;
}

/// Generic lifecycle operations shared by every resource kind.
#[async_trait]
pub trait LifecycleApi: Send + Sync {
    /// Returns the lifecycle state of a resource, or `None` if it does not exist.
    async fn resource_state(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Option<LifecycleState>>;

    /// Deletes (or terminates) a resource.
    async fn delete_resource(&self, kind: ResourceKind, id: &str) -> Result<()>;
}

/// The full set of Core Services operations used by the tool.
pub trait CoreApi: VirtualNetworkApi + ComputeApi + ImageCatalog + LifecycleApi {}

impl<T> CoreApi for T where T: VirtualNetworkApi + ComputeApi + ImageCatalog + LifecycleApi {}
