//! Hand a plan to the provisioning engine.

use crate::error::{PlanError, PlanResult};
use crate::models::{AddressBlock, RouteRule};
use crate::planning::{IdentityKey, NetworkPlan};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Subnet,
    NatGateway,
    RouteTable,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Subnet => "subnet",
            ResourceKind::NatGateway => "nat",
            ResourceKind::RouteTable => "rtb",
        };
        write!(f, "{s}")
    }
}

/// What the engine needs to create one resource.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    pub key: IdentityKey,
    pub name: String,
    pub zone: Option<String>,
    pub cidr: Option<AddressBlock>,
    /// Subnet the resource attaches to.
    pub subnet_id: Option<String>,
    pub routes: Vec<RouteRule>,
}

/// External capability that creates a resource and returns its id.
pub trait Provisioner {
    fn provision(&mut self, kind: ResourceKind, spec: &ResourceSpec) -> Result<String, String>;
}

/// Creates nothing; returns ids derived from the identity key.
#[derive(Debug, Default)]
pub struct DryRunProvisioner {
    pub created: Vec<(ResourceKind, IdentityKey)>,
}

impl Provisioner for DryRunProvisioner {
    fn provision(&mut self, kind: ResourceKind, spec: &ResourceSpec) -> Result<String, String> {
        log::trace!("dry-run {kind} {}", spec.key);
        self.created.push((kind, spec.key.clone()));
        Ok(format!("{kind}-{}", spec.key.as_str().replace('/', "-")))
    }
}

/// Create subnets, then NAT gateways, then route tables, recording ids on the plan.
///
/// The first provider error stops the walk. Ids are written to `plan` only
/// once every call has succeeded, so a failed run leaves it untouched.
pub fn apply_plan(plan: &mut NetworkPlan, provisioner: &mut dyn Provisioner) -> PlanResult<()> {
    let mut subnet_ids: HashMap<IdentityKey, String> = HashMap::new();
    for subnet in plan.subnets() {
        let spec = ResourceSpec {
            key: subnet.key.clone(),
            name: subnet.name.clone(),
            zone: Some(subnet.zone.name.clone().unwrap_or_else(|| subnet.zone.label())),
            cidr: Some(subnet.cidr),
            subnet_id: None,
            routes: vec![],
        };
        let id = call(provisioner, ResourceKind::Subnet, &spec)?;
        subnet_ids.insert(subnet.key.clone(), id);
    }

    let mut nat_ids = Vec::with_capacity(plan.nat_gateways.len());
    for nat in &plan.nat_gateways {
        let spec = ResourceSpec {
            key: nat.key.clone(),
            name: format!("{}-nat-{}", plan.name, nat.zone.label()),
            zone: Some(nat.zone.name.clone().unwrap_or_else(|| nat.zone.label())),
            cidr: None,
            subnet_id: subnet_ids.get(&nat.subnet_key).cloned(),
            routes: vec![],
        };
        nat_ids.push(call(provisioner, ResourceKind::NatGateway, &spec)?);
    }

    let mut route_table_ids = Vec::new();
    for subnet in plan.subnets() {
        let spec = ResourceSpec {
            key: subnet.key.clone(),
            name: format!("{}-rtb", subnet.name),
            zone: None,
            cidr: None,
            subnet_id: subnet_ids.get(&subnet.key).cloned(),
            routes: subnet.routes.clone(),
        };
        route_table_ids.push(call(provisioner, ResourceKind::RouteTable, &spec)?);
    }

    for (subnet, route_table_id) in plan.subnets_mut().zip(route_table_ids) {
        subnet.resource_id = subnet_ids.remove(&subnet.key);
        subnet.route_table_id = Some(route_table_id);
    }
    for (nat, id) in plan.nat_gateways.iter_mut().zip(nat_ids) {
        nat.resource_id = Some(id);
    }

    log::info!(
        "provisioned {} subnets and {} NAT gateways for '{}'",
        plan.subnets().count(),
        plan.nat_gateways.len(),
        plan.name
    );
    Ok(())
}

fn call(
    provisioner: &mut dyn Provisioner,
    kind: ResourceKind,
    spec: &ResourceSpec,
) -> PlanResult<String> {
    provisioner.provision(kind, spec).map_err(|message| {
        log::error!("provider failed on {kind} {}: {message}", spec.key);
        PlanError::Provider {
            resource: format!("{kind} {}", spec.key),
            message,
        }
    })
}
