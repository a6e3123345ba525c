//! Subnet group model.

use super::AddressBlock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the group that receives internet facing subnets.
pub const PUBLIC_GROUP: &str = "public";
/// Name of the group that hosts the transit gateway attachment.
pub const TRANSIT_GATEWAY_GROUP: &str = "transit_gateway";

/// Kind of a subnet group, derived from its name.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubnetKind {
    Public,
    TransitGateway,
    /// Any other name; private, routable only through NAT or transit gateway.
    Custom,
}

impl SubnetKind {
    pub fn from_name(name: &str) -> SubnetKind {
        match name {
            PUBLIC_GROUP => SubnetKind::Public,
            TRANSIT_GATEWAY_GROUP => SubnetKind::TransitGateway,
            _ => SubnetKind::Custom,
        }
    }
}

impl fmt::Display for SubnetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubnetKind::Public => "public",
            SubnetKind::TransitGateway => "transit_gateway",
            SubnetKind::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

/// NAT gateway placement policy of the public group.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NatGatewayConfiguration {
    #[default]
    AllAzs,
    SingleAz,
    None,
}

/// How a group gets its address ranges.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Addressing {
    /// Computed sub-blocks of this prefix length.
    Netmask(u8),
    /// Explicit blocks, one per zone, zone ordered.
    Cidrs(Vec<AddressBlock>),
}

/// A named set of subnets, one per zone, sharing routing policy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubnetGroup {
    pub name: String,
    pub kind: SubnetKind,
    pub addressing: Addressing,
    /// Default route through a NAT gateway.
    pub route_to_nat: bool,
    /// Destinations reached through the transit gateway.
    pub route_to_transit_gateway: Vec<AddressBlock>,
    /// Only meaningful for the public group.
    pub nat_gateway_configuration: Option<NatGatewayConfiguration>,
    /// Public group default route to the internet gateway.
    pub connect_to_igw: bool,
    /// Overrides the network name in resource names.
    pub name_prefix: Option<String>,
}

impl SubnetGroup {
    /// A group with computed addressing and no routing options.
    pub fn with_netmask(name: &str, netmask: u8) -> SubnetGroup {
        SubnetGroup::new(name, Addressing::Netmask(netmask))
    }

    /// A group with explicit per-zone blocks and no routing options.
    pub fn with_cidrs(name: &str, cidrs: Vec<AddressBlock>) -> SubnetGroup {
        SubnetGroup::new(name, Addressing::Cidrs(cidrs))
    }

    fn new(name: &str, addressing: Addressing) -> SubnetGroup {
        let kind = SubnetKind::from_name(name);
        SubnetGroup {
            name: name.to_string(),
            kind,
            addressing,
            route_to_nat: false,
            route_to_transit_gateway: vec![],
            nat_gateway_configuration: match kind {
                SubnetKind::Public => Some(NatGatewayConfiguration::default()),
                _ => None,
            },
            connect_to_igw: kind == SubnetKind::Public,
            name_prefix: None,
        }
    }

    pub fn is_public(&self) -> bool {
        self.kind == SubnetKind::Public
    }

    /// NAT placement policy; `None` for groups that cannot host NAT gateways.
    pub fn nat_policy(&self) -> Option<NatGatewayConfiguration> {
        if self.is_public() {
            Some(self.nat_gateway_configuration.unwrap_or_default())
        } else {
            None
        }
    }
}

/// A (group, zone) pair: the unit every planner result is keyed by.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId {
    pub group: String,
    pub zone: usize,
}

impl SlotId {
    pub fn new(group: &str, zone: usize) -> SlotId {
        SlotId {
            group: group.to_string(),
            zone,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, super::zone_label(self.zone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name() {
        assert_eq!(SubnetKind::from_name("public"), SubnetKind::Public);
        assert_eq!(
            SubnetKind::from_name("transit_gateway"),
            SubnetKind::TransitGateway
        );
        assert_eq!(SubnetKind::from_name("private"), SubnetKind::Custom);
        assert_eq!(SubnetKind::from_name("Public"), SubnetKind::Custom);
    }

    #[test]
    fn test_public_defaults() {
        let group = SubnetGroup::with_netmask("public", 24);
        assert!(group.connect_to_igw);
        assert_eq!(group.nat_policy(), Some(NatGatewayConfiguration::AllAzs));

        let group = SubnetGroup::with_netmask("app", 24);
        assert!(!group.connect_to_igw);
        assert_eq!(group.nat_policy(), None);
    }

    #[test]
    fn test_nat_configuration_serde() {
        let config: NatGatewayConfiguration = serde_json::from_str("\"single_az\"").unwrap();
        assert_eq!(config, NatGatewayConfiguration::SingleAz);
        assert!(serde_json::from_str::<NatGatewayConfiguration>("\"some_azs\"").is_err());
    }

    #[test]
    fn test_slot_display_uses_zone_label() {
        assert_eq!(SlotId::new("private", 1).to_string(), "private/b");
    }
}
