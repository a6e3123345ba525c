//! Network configuration loading.
//!
//! The configuration is a JSON document; `subnets` keeps its declared order
//! because allocation order depends on it.

use crate::error::{PlanError, PlanResult};
use crate::models::{
    build_zones, AddressBlock, Addressing, AvailabilityZone, NatGatewayConfiguration,
    SubnetGroup, SubnetKind,
};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::Path;

/// Default config file, overridden by `VPC_PLAN_CONFIG`.
pub const DEFAULT_CONFIG_FILE: &str = "network.json";
/// Default identity state log, overridden by `VPC_PLAN_STATE`.
pub const DEFAULT_STATE_FILE: &str = "plan_state.jsonl";

fn default_name() -> String {
    "vpc".to_string()
}

/// Top-level network configuration.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// Used as the default prefix of resource names.
    #[serde(default = "default_name")]
    pub name: String,
    pub cidr: AddressBlock,
    pub az_count: usize,
    /// Provider zone names; sorted, first `az_count` used.
    #[serde(default)]
    pub availability_zones: Option<Vec<String>>,
    /// Zone slots each netmask group reserves, at least `az_count`.
    #[serde(default)]
    pub reserved_zones: Option<usize>,
    #[serde(deserialize_with = "ordered_groups")]
    pub subnets: Vec<(String, SubnetGroupConfig)>,
}

/// Settings of one subnet group as written in the config.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct SubnetGroupConfig {
    pub netmask: Option<u8>,
    pub cidrs: Option<Vec<AddressBlock>>,
    #[serde(default)]
    pub route_to_nat: bool,
    #[serde(default)]
    pub route_to_transit_gateway: Vec<AddressBlock>,
    pub nat_gateway_configuration: Option<NatGatewayConfiguration>,
    pub connect_to_igw: Option<bool>,
    pub name_prefix: Option<String>,
}

impl SubnetGroupConfig {
    /// Validate and turn into a [`SubnetGroup`] named `name`.
    pub fn to_group(&self, name: &str) -> PlanResult<SubnetGroup> {
        let addressing = match (self.netmask, &self.cidrs) {
            (Some(netmask), None) => Addressing::Netmask(netmask),
            (None, Some(cidrs)) => Addressing::Cidrs(cidrs.clone()),
            (Some(_), Some(_)) => {
                return Err(PlanError::Config(format!(
                    "subnet group '{name}' sets both netmask and cidrs"
                )))
            }
            (None, None) => {
                return Err(PlanError::Config(format!(
                    "subnet group '{name}' needs either netmask or cidrs"
                )))
            }
        };
        let kind = SubnetKind::from_name(name);
        if self.connect_to_igw.is_some() && kind != SubnetKind::Public {
            return Err(PlanError::Config(format!(
                "connect_to_igw is only valid on the public group, not '{name}'"
            )));
        }

        let mut group = match addressing {
            Addressing::Netmask(netmask) => SubnetGroup::with_netmask(name, netmask),
            Addressing::Cidrs(cidrs) => SubnetGroup::with_cidrs(name, cidrs),
        };
        group.route_to_nat = self.route_to_nat;
        group.route_to_transit_gateway = self.route_to_transit_gateway.clone();
        if let Some(nat) = self.nat_gateway_configuration {
            group.nat_gateway_configuration = Some(nat);
        }
        if let Some(igw) = self.connect_to_igw {
            group.connect_to_igw = igw;
        }
        group.name_prefix = self.name_prefix.clone();
        Ok(group)
    }
}

impl NetworkConfig {
    /// Subnet groups in declared order.
    pub fn groups(&self) -> PlanResult<Vec<SubnetGroup>> {
        self.subnets
            .iter()
            .map(|(name, settings)| settings.to_group(name))
            .collect()
    }

    pub fn zones(&self) -> PlanResult<Vec<AvailabilityZone>> {
        build_zones(self.az_count, self.availability_zones.as_deref())
    }

    /// Zone slots reserved per netmask group.
    pub fn reserved_zones(&self) -> PlanResult<usize> {
        match self.reserved_zones {
            Some(reserved) if reserved < self.az_count => Err(PlanError::Config(format!(
                "reserved_zones ({reserved}) is smaller than az_count ({})",
                self.az_count
            ))),
            Some(reserved) => Ok(reserved),
            None => Ok(self.az_count),
        }
    }

    pub fn validate(&self) -> PlanResult<()> {
        if self.az_count == 0 {
            return Err(PlanError::Config("az_count must be at least 1".to_string()));
        }
        self.reserved_zones()?;
        self.zones()?;
        self.groups()?;
        Ok(())
    }
}

/// Parse a configuration document, reporting the JSON path of any error.
pub fn parse_config(json: &str) -> PlanResult<NetworkConfig> {
    let mut deserializer = serde_json::Deserializer::from_str(json);
    let config: NetworkConfig = serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|e| PlanError::Config(format!("path={} error={}", e.path(), e.inner())))?;
    config.validate()?;
    Ok(config)
}

/// Read and parse the configuration file at `path`.
pub fn load_config(path: &str) -> PlanResult<NetworkConfig> {
    if !Path::new(path).exists() {
        return Err(PlanError::Config(format!(
            "config file does not exist: {path}"
        )));
    }
    log::info!("Reading network config: {path}");
    let json = std::fs::read_to_string(path)
        .map_err(|e| PlanError::Config(format!("error reading {path}: {e}")))?;
    parse_config(&json)
}

fn ordered_groups<'de, D>(deserializer: D) -> Result<Vec<(String, SubnetGroupConfig)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedGroups;

    impl<'de> Visitor<'de> for OrderedGroups {
        type Value = Vec<(String, SubnetGroupConfig)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of subnet group name to settings")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut groups: Vec<(String, SubnetGroupConfig)> = Vec::new();
            while let Some((name, settings)) = map.next_entry::<String, SubnetGroupConfig>()? {
                if groups.iter().any(|(existing, _)| existing == &name) {
                    return Err(de::Error::custom(format!(
                        "duplicate subnet group '{name}'"
                    )));
                }
                groups.push((name, settings));
            }
            Ok(groups)
        }
    }

    deserializer.deserialize_map(OrderedGroups)
}
