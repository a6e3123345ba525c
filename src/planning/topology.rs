//! NAT gateway placement and route table wiring.

use super::allocation::Allocation;
use crate::error::{PlanError, PlanResult};
use crate::models::{
    zone_label, AddressBlock, NatGatewayConfiguration, RouteRule, RouteTarget, SlotId,
    SubnetGroup, SubnetKind,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Where NAT gateways live.
///
/// `zones` maps zone index to NAT presence; it is empty when no NAT gateways
/// are planned.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct NatGatewayPlacement {
    /// Group hosting the gateways.
    pub group: Option<String>,
    pub configuration: Option<NatGatewayConfiguration>,
    pub zones: BTreeMap<usize, bool>,
}

impl NatGatewayPlacement {
    pub fn has_nat(&self, zone: usize) -> bool {
        self.zones.get(&zone).copied().unwrap_or(false)
    }

    /// Zones that host a NAT gateway, ascending.
    pub fn nat_zones(&self) -> Vec<usize> {
        self.zones
            .iter()
            .filter(|(_, present)| **present)
            .map(|(zone, _)| *zone)
            .collect()
    }

    /// NAT gateway private traffic of `zone` egresses through.
    ///
    /// Own zone when it has one, else the shared gateway in zone 0.
    pub fn nat_for(&self, zone: usize) -> Option<usize> {
        if self.has_nat(zone) {
            Some(zone)
        } else if self.has_nat(0) {
            Some(0)
        } else {
            None
        }
    }
}

/// Gateways plus the ordered route table of every (group, zone).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Topology {
    pub nat_gateways: NatGatewayPlacement,
    pub routes: BTreeMap<SlotId, Vec<RouteRule>>,
}

impl Topology {
    pub fn routes_for(&self, group: &str, zone: usize) -> &[RouteRule] {
        self.routes
            .get(&SlotId::new(group, zone))
            .map(|rules| rules.as_slice())
            .unwrap_or(&[])
    }
}

/// Decide NAT placement and build route tables.
///
/// Rules per table come out as: internet gateway, then NAT gateway, then
/// transit gateway destinations in ascending address order.
pub fn plan_topology(
    groups: &[SubnetGroup],
    allocation: &Allocation,
    zone_count: usize,
) -> PlanResult<Topology> {
    validate_groups(groups)?;

    let nat_gateways = place_nat_gateways(groups, zone_count)?;
    log::debug!(
        "NAT gateways in zones {:?} ({:?})",
        nat_gateways.nat_zones(),
        nat_gateways.configuration
    );

    let has_attachment = groups
        .iter()
        .any(|g| g.kind == SubnetKind::TransitGateway);

    let mut routes = BTreeMap::new();
    for group in groups {
        if !group.route_to_transit_gateway.is_empty() && !has_attachment {
            return Err(PlanError::unsatisfiable(
                &group.name,
                "routes to the transit gateway need a 'transit_gateway' subnet group for the attachment",
            ));
        }
        let destinations: BTreeSet<AddressBlock> =
            group.route_to_transit_gateway.iter().copied().collect();

        for zone in 0..zone_count {
            if allocation.get(&group.name, zone).is_none() {
                return Err(PlanError::Config(format!(
                    "no allocation for {}/{}",
                    group.name,
                    zone_label(zone)
                )));
            }

            let mut rules = Vec::new();
            if group.is_public() && group.connect_to_igw {
                rules.push(RouteRule::new(AddressBlock::any(), RouteTarget::InternetGateway));
            }
            if group.route_to_nat {
                let nat_zone = nat_gateways.nat_for(zone).ok_or_else(|| {
                    PlanError::unsatisfiable(
                        &group.name,
                        format!(
                            "route_to_nat is set but no NAT gateway exists (public group: {}, configuration: {:?})",
                            nat_gateways.group.as_deref().unwrap_or("none"),
                            nat_gateways.configuration
                        ),
                    )
                })?;
                rules.push(RouteRule::new(
                    AddressBlock::any(),
                    RouteTarget::NatGateway { zone: nat_zone },
                ));
            }
            rules.extend(
                destinations
                    .iter()
                    .map(|dest| RouteRule::new(*dest, RouteTarget::TransitGateway)),
            );

            check_unique_destinations(&group.name, zone, &rules)?;
            routes.insert(SlotId::new(&group.name, zone), rules);
        }
    }

    log::info!(
        "planned {} route tables, {} NAT gateways",
        routes.len(),
        nat_gateways.nat_zones().len()
    );

    Ok(Topology {
        nat_gateways,
        routes,
    })
}

fn validate_groups(groups: &[SubnetGroup]) -> PlanResult<()> {
    for group in groups {
        if group.is_public() && group.route_to_nat {
            return Err(PlanError::Config(format!(
                "group '{}' is public and cannot route to a NAT gateway",
                group.name
            )));
        }
        if !group.is_public() && group.nat_gateway_configuration.is_some() {
            return Err(PlanError::Config(format!(
                "nat_gateway_configuration is only valid on the public group, not '{}'",
                group.name
            )));
        }
    }
    if groups.iter().filter(|g| g.is_public()).count() > 1 {
        return Err(PlanError::Config(
            "only one public subnet group is supported".to_string(),
        ));
    }
    Ok(())
}

fn place_nat_gateways(
    groups: &[SubnetGroup],
    zone_count: usize,
) -> PlanResult<NatGatewayPlacement> {
    let Some(public) = groups.iter().find(|g| g.is_public()) else {
        return Ok(NatGatewayPlacement::default());
    };
    let configuration = public.nat_policy().unwrap_or_default();

    let zones: BTreeMap<usize, bool> = match configuration {
        NatGatewayConfiguration::AllAzs => (0..zone_count).map(|z| (z, true)).collect(),
        NatGatewayConfiguration::SingleAz => (0..zone_count).map(|z| (z, z == 0)).collect(),
        NatGatewayConfiguration::None => BTreeMap::new(),
    };

    if zones.values().any(|present| *present) && !public.connect_to_igw {
        return Err(PlanError::unsatisfiable(
            &public.name,
            "NAT gateways need the public group to route to the internet gateway",
        ));
    }

    Ok(NatGatewayPlacement {
        group: Some(public.name.clone()),
        configuration: Some(configuration),
        zones,
    })
}

fn check_unique_destinations(group: &str, zone: usize, rules: &[RouteRule]) -> PlanResult<()> {
    let mut seen = HashSet::new();
    for rule in rules {
        if !seen.insert(rule.destination) {
            return Err(PlanError::unsatisfiable(
                group,
                format!(
                    "zone {}: destination {} is routed twice",
                    zone_label(zone),
                    rule.destination
                ),
            ));
        }
    }
    Ok(())
}
