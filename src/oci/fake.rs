//! In-memory Core Services double used by tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{OciError, Result};

use super::api::{ComputeApi, ImageCatalog, LifecycleApi, VirtualNetworkApi};
use super::types::{
    CreateInternetGatewayDetails, CreateRouteTableDetails, CreateSecurityListDetails,
    CreateSubnetDetails, CreateVcnDetails, Image, ImageQuery, Instance, InstanceShapeConfig,
    InternetGateway, LaunchInstanceDetails, LifecycleState, ResourceKind, RouteTable,
    SecurityList, Subnet, Vcn, Vnic, VnicAttachment,
};

/// Recorded calls and simulated resources.
#[derive(Debug, Default)]
pub struct FakeState {
    next_id: u32,
    pub created: Vec<(ResourceKind, String)>,
    pub vcns: Vec<CreateVcnDetails>,
    pub gateways: Vec<CreateInternetGatewayDetails>,
    pub route_tables: Vec<CreateRouteTableDetails>,
    pub security_lists: Vec<CreateSecurityListDetails>,
    pub subnets: Vec<CreateSubnetDetails>,
    pub launches: Vec<LaunchInstanceDetails>,
    pub deleted: Vec<(ResourceKind, String)>,
    pub image_queries: Vec<ImageQuery>,
    pub images: Vec<Image>,
    pub public_ip: Option<String>,
    pub fail_create: Option<ResourceKind>,
    states: HashMap<String, LifecycleState>,
    subnet_ads: HashMap<String, Option<String>>,
    launched: HashMap<String, LaunchInstanceDetails>,
}

/// Fake OCI that creates resources in memory.
///
/// New resources report `PROVISIONING` on their first poll and their ready
/// state afterwards.
#[derive(Debug)]
pub struct FakeCore {
    inner: Mutex<FakeState>,
}

impl Default for FakeCore {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCore {
    pub fn new() -> Self {
        let state = FakeState {
            public_ip: Some(String::from("203.0.113.10")),
            ..FakeState::default()
        };
        Self {
            inner: Mutex::new(state),
        }
    }

    pub fn with_images(images: Vec<Image>) -> Self {
        let fake = Self::new();
        fake.state().images = images;
        fake
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap()
    }

    /// Registers a pre-existing, ready resource.
    pub fn add_existing(&self, kind: ResourceKind, id: &str) {
        self.state()
            .states
            .insert(id.to_string(), kind.ready_state());
    }

    /// Registers a pre-existing subnet in the given availability domain.
    pub fn add_subnet(&self, id: &str, availability_domain: Option<&str>) {
        self.add_existing(ResourceKind::Subnet, id);
        self.state()
            .subnet_ads
            .insert(id.to_string(), availability_domain.map(String::from));
    }

    pub fn created_count(&self, kind: ResourceKind) -> usize {
        self.state().created.iter().filter(|(k, _)| *k == kind).count()
    }

    fn mint(&self, kind: ResourceKind) -> Result<String> {
        let mut state = self.state();
        if state.fail_create == Some(kind) {
            return Err(OciError::api_error(500, "InternalError", format!("{kind} failed")).into());
        }
        state.next_id += 1;
        let id = format!("ocid1.{}.fake.{}", kind.name_suffix(), state.next_id);
        state.created.push((kind, id.clone()));
        state.states.insert(id.clone(), LifecycleState::Provisioning);
        Ok(id)
    }
}

/// Builds a catalog image.
pub fn image(id: &str, display_name: &str, created: DateTime<Utc>) -> Image {
    Image {
        id: id.to_string(),
        display_name: display_name.to_string(),
        operating_system: Some(String::from("Canonical Ubuntu")),
        operating_system_version: Some(String::from("24.04")),
        lifecycle_state: LifecycleState::Available,
        time_created: created,
    }
}

/// Midnight UTC on the given day of 2024.
pub fn day(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, 0, 0, 0).unwrap()
}

#[async_trait]
impl VirtualNetworkApi for FakeCore {
    async fn create_vcn(&self, details: &CreateVcnDetails) -> Result<Vcn> {
        let id = self.mint(ResourceKind::Vcn)?;
        self.state().vcns.push(details.clone());
        Ok(Vcn {
            id,
            display_name: Some(details.display_name.clone()),
            lifecycle_state: LifecycleState::Provisioning,
            cidr_block: Some(details.cidr_block.clone()),
        })
    }

    async fn create_internet_gateway(
        &self,
        details: &CreateInternetGatewayDetails,
    ) -> Result<InternetGateway> {
        let id = self.mint(ResourceKind::InternetGateway)?;
        self.state().gateways.push(details.clone());
        Ok(InternetGateway {
            id,
            display_name: Some(details.display_name.clone()),
            lifecycle_state: LifecycleState::Provisioning,
        })
    }

    async fn create_route_table(&self, details: &CreateRouteTableDetails) -> Result<RouteTable> {
        let id = self.mint(ResourceKind::RouteTable)?;
        self.state().route_tables.push(details.clone());
        Ok(RouteTable {
            id,
            display_name: Some(details.display_name.clone()),
            lifecycle_state: LifecycleState::Provisioning,
        })
    }

    async fn create_security_list(
        &self,
        details: &CreateSecurityListDetails,
    ) -> Result<SecurityList> {
        let id = self.mint(ResourceKind::SecurityList)?;
        self.state().security_lists.push(details.clone());
        Ok(SecurityList {
            id,
            display_name: Some(details.display_name.clone()),
            lifecycle_state: LifecycleState::Provisioning,
        })
    }

    async fn create_subnet(&self, details: &CreateSubnetDetails) -> Result<Subnet> {
        let id = self.mint(ResourceKind::Subnet)?;
        let mut state = self.state();
        state.subnets.push(details.clone());
        state.subnet_ads.insert(id.clone(), None);
        Ok(Subnet {
            id,
            display_name: Some(details.display_name.clone()),
            lifecycle_state: LifecycleState::Provisioning,
            availability_domain: None,
            cidr_block: Some(details.cidr_block.clone()),
        })
    }

    async fn get_subnet(&self, subnet_id: &str) -> Result<Subnet> {
        let state = self.state();
        let availability_domain = state.subnet_ads.get(subnet_id).cloned().ok_or_else(|| {
            OciError::NotFound {
                resource: format!("subnets/{subnet_id}"),
            }
        })?;
        Ok(Subnet {
            id: subnet_id.to_string(),
            display_name: None,
            lifecycle_state: LifecycleState::Available,
            availability_domain,
            cidr_block: None,
        })
    }

    async fn get_vnic(&self, vnic_id: &str) -> Result<Vnic> {
        Ok(Vnic {
            id: vnic_id.to_string(),
            public_ip: self.state().public_ip.clone(),
            private_ip: Some(String::from("10.0.1.2")),
            is_primary: Some(true),
        })
    }
}

#[async_trait]
impl ComputeApi for FakeCore {
    async fn launch_instance(&self, details: &LaunchInstanceDetails) -> Result<Instance> {
        let id = self.mint(ResourceKind::Instance)?;
        let mut state = self.state();
        state.launches.push(details.clone());
        state.launched.insert(id.clone(), details.clone());
        Ok(Instance {
            id,
            display_name: Some(details.display_name.clone()),
            lifecycle_state: LifecycleState::Provisioning,
            shape: details.shape.clone(),
            availability_domain: Some(details.availability_domain.clone()),
            shape_config: None,
        })
    }

    async fn get_instance(&self, instance_id: &str) -> Result<Instance> {
        let state = self.state();
        let details = state.launched.get(instance_id).ok_or_else(|| OciError::NotFound {
            resource: format!("instances/{instance_id}"),
        })?;
        Ok(Instance {
            id: instance_id.to_string(),
            display_name: Some(details.display_name.clone()),
            lifecycle_state: state
                .states
                .get(instance_id)
                .copied()
                .unwrap_or(LifecycleState::Terminated),
            shape: details.shape.clone(),
            availability_domain: Some(details.availability_domain.clone()),
            shape_config: details.shape_config.map(|c| InstanceShapeConfig {
                ocpus: Some(c.ocpus),
                memory_in_gbs: Some(c.memory_in_gbs),
            }),
        })
    }

    async fn list_vnic_attachments(
        &self,
        _compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VnicAttachment>> {
        let attached = self.state().launched.contains_key(instance_id);
        Ok(attached
            .then(|| VnicAttachment {
                id: format!("{instance_id}.attachment"),
                instance_id: instance_id.to_string(),
                vnic_id: Some(format!("{instance_id}.vnic")),
                lifecycle_state: LifecycleState::Attached,
            })
            .into_iter()
            .collect())
    }
}

#[async_trait]
impl ImageCatalog for FakeCore {
    async fn list_images(&self, query: &ImageQuery) -> Result<Vec<Image>> {
        let mut state = self.state();
        state.image_queries.push(query.clone());

        let mut images: Vec<Image> = state
            .images
            .iter()
            .filter(|image| {
                query
                    .display_name
                    .as_ref()
                    .is_none_or(|name| &image.display_name == name)
            })
            .filter(|image| {
                query
                    .operating_system
                    .as_ref()
                    .is_none_or(|os| image.operating_system.as_ref() == Some(os))
            })
            .cloned()
            .collect();
        images.sort_by(|a, b| b.time_created.cmp(&a.time_created));
        if let Some(limit) = query.limit {
            images.truncate(limit as usize);
        }
        Ok(images)
    }

    async fn get_image(&self, image_id: &str) -> Result<Option<Image>> {
        Ok(self.state().images.iter().find(|i| i.id == image_id).cloned())
    }
}

#[async_trait]
impl LifecycleApi for FakeCore {
    async fn resource_state(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> Result<Option<LifecycleState>> {
        let mut state = self.state();
        let Some(current) = state.states.get(id).copied() else {
            return Ok(None);
        };
        if current == LifecycleState::Provisioning {
            state.states.insert(id.to_string(), kind.ready_state());
        }
        Ok(Some(current))
    }

    async fn delete_resource(&self, kind: ResourceKind, id: &str) -> Result<()> {
        let mut state = self.state();
        if state.states.remove(id).is_none() {
            return Err(OciError::NotFound {
                resource: format!("{}/{id}", kind.api_path()),
            }
            .into());
        }
        state.deleted.push((kind, id.to_string()));
        Ok(())
    }
}
