//! Assemble planner results into zone indexed collections.

use super::allocation::Allocation;
use super::identity::{IdentityKey, KeyScheme};
use super::topology::Topology;
use crate::error::{PlanError, PlanResult};
use crate::models::{
    usable_hosts, AddressBlock, AvailabilityZone, RouteRule, SubnetGroup, SubnetKind,
};
use serde::Serialize;

/// Group name used for NAT gateway identity keys.
pub const NAT_GATEWAY_KEY_GROUP: &str = "nat_gateway";

/// One subnet of a group in one zone.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubnetEntry {
    pub key: IdentityKey,
    pub group: String,
    pub zone: AvailabilityZone,
    /// Display name, `{prefix}-{group}-{zone label}`.
    pub name: String,
    pub cidr: AddressBlock,
    pub usable_hosts: u64,
    pub routes: Vec<RouteRule>,
    /// Set once provisioned.
    pub resource_id: Option<String>,
    pub route_table_id: Option<String>,
}

/// All zone entries of a group; `subnets[i]` is zone `i`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    pub name: String,
    pub kind: SubnetKind,
    pub subnets: Vec<SubnetEntry>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NatGatewayEntry {
    pub key: IdentityKey,
    pub zone: AvailabilityZone,
    /// Public subnet the gateway lives in.
    pub subnet_key: IdentityKey,
    pub resource_id: Option<String>,
}

/// The complete plan handed to the provisioning engine.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NetworkPlan {
    pub name: String,
    pub cidr: AddressBlock,
    pub zones: Vec<AvailabilityZone>,
    /// Declared order.
    pub groups: Vec<GroupPlan>,
    pub nat_gateways: Vec<NatGatewayEntry>,
    pub keys: KeyScheme,
}

impl NetworkPlan {
    pub fn group(&self, name: &str) -> Option<&GroupPlan> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn subnet(&self, group: &str, zone: usize) -> Option<&SubnetEntry> {
        self.group(group)?.subnets.get(zone)
    }

    /// Every subnet, group by group, in zone order.
    pub fn subnets(&self) -> impl Iterator<Item = &SubnetEntry> {
        self.groups.iter().flat_map(|g| g.subnets.iter())
    }

    pub(crate) fn subnets_mut(&mut self) -> impl Iterator<Item = &mut SubnetEntry> {
        self.groups.iter_mut().flat_map(|g| g.subnets.iter_mut())
    }

    /// Resource id of the subnet with `key`, once provisioned.
    pub fn resource_id(&self, key: &IdentityKey) -> Option<&str> {
        self.subnets()
            .find(|s| &s.key == key)
            .and_then(|s| s.resource_id.as_deref())
    }
}

/// Collect allocation, routing and keys into per-group, zone ordered entries.
pub fn assemble(
    name: &str,
    zones: &[AvailabilityZone],
    groups: &[SubnetGroup],
    allocation: &Allocation,
    topology: &Topology,
    keys: &KeyScheme,
) -> PlanResult<NetworkPlan> {
    let mut group_plans = Vec::with_capacity(groups.len());
    for group in groups {
        let prefix = group.name_prefix.as_deref().unwrap_or(name);
        let subnets = zones
            .iter()
            .map(|zone| -> PlanResult<SubnetEntry> {
                let cidr = allocation.get(&group.name, zone.index).ok_or_else(|| {
                    PlanError::Config(format!("no allocation for {}/{}", group.name, zone.label()))
                })?;
                let key = keys
                    .get(&group.name, zone.index)
                    .cloned()
                    .unwrap_or_else(|| IdentityKey::for_slot(&group.name, zone.index));
                Ok(SubnetEntry {
                    key,
                    group: group.name.clone(),
                    zone: zone.clone(),
                    name: format!("{prefix}-{}-{}", group.name, zone.label()),
                    cidr,
                    usable_hosts: usable_hosts(cidr.prefix()).unwrap_or(0),
                    routes: topology.routes_for(&group.name, zone.index).to_vec(),
                    resource_id: None,
                    route_table_id: None,
                })
            })
            .collect::<PlanResult<Vec<_>>>()?;
        group_plans.push(GroupPlan {
            name: group.name.clone(),
            kind: group.kind,
            subnets,
        });
    }

    let nat_gateways = match &topology.nat_gateways.group {
        Some(public) => topology
            .nat_gateways
            .nat_zones()
            .into_iter()
            .filter_map(|index| zones.get(index))
            .map(|zone| NatGatewayEntry {
                key: IdentityKey::for_slot(NAT_GATEWAY_KEY_GROUP, zone.index),
                zone: zone.clone(),
                subnet_key: keys
                    .get(public, zone.index)
                    .cloned()
                    .unwrap_or_else(|| IdentityKey::for_slot(public, zone.index)),
                resource_id: None,
            })
            .collect(),
        None => vec![],
    };

    log::debug!(
        "assembled {} groups, {} NAT gateways for '{name}'",
        group_plans.len(),
        nat_gateways.len()
    );

    Ok(NetworkPlan {
        name: name.to_string(),
        cidr: allocation.top_level,
        zones: zones.to_vec(),
        groups: group_plans,
        nat_gateways,
        keys: keys.clone(),
    })
}
