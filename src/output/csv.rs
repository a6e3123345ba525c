//! CSV output of a network plan.

use super::terminal::format_field;
use crate::error::PlanResult;
use crate::planning::{NetworkPlan, SubnetEntry};
use colored::Colorize;
use itertools::Itertools;

/// One printable row per subnet.
#[derive(Debug, PartialEq, Eq)]
pub struct PlanRow {
    pub group: String,
    pub zone: String,
    pub cidr: String,
    pub broadcast: String,
    pub hosts: u64,
    pub name: String,
    pub routes: String,
    pub key: String,
}

impl From<&SubnetEntry> for PlanRow {
    fn from(s: &SubnetEntry) -> Self {
        PlanRow {
            group: s.group.clone(),
            zone: s.zone.name.clone().unwrap_or_else(|| s.zone.label()),
            cidr: s.cidr.to_string(),
            broadcast: s.cidr.broadcast().to_string(),
            hosts: s.usable_hosts,
            name: s.name.clone(),
            routes: if s.routes.is_empty() {
                "local".to_string()
            } else {
                s.routes.iter().join(" ")
            },
            key: s.key.to_string(),
        }
    }
}

/// Rows of the plan, group by group in zone order.
pub fn plan_rows(plan: &NetworkPlan) -> Vec<PlanRow> {
    plan.subnets().map(PlanRow::from).collect()
}

/// Print the plan as CSV to stdout.
pub fn print_plan(plan: &NetworkPlan) -> PlanResult<()> {
    log::info!(
        "#Start print_plan() '{}' {} over {} zones",
        plan.name,
        plan.cidr,
        plan.zones.len()
    );

    println!(
        r#"  "group",   "zone",     "subnet_cidr",        "broadcast",  "hosts",              "name",                          "routes",          "key""#
    );
    for row in plan_rows(plan) {
        println!(
            "{group},{zone},{cidr},{broadcast},{hosts},{name},{routes},{key}",
            group = format_field(&row.group, 9),
            zone = format_field(&row.zone, 10),
            cidr = format_field(&row.cidr, 18),
            broadcast = format_field(format!("{}_br", row.broadcast), 19),
            hosts = format_field(row.hosts, 8),
            name = format_field(&row.name, 24),
            routes = format_field(&row.routes, 34),
            key = format_field(&row.key, 16),
        );
    }

    for nat in &plan.nat_gateways {
        println!(
            "#{}# {} in {}",
            "NAT".on_green(),
            nat.key,
            nat.subnet_key
        );
    }
    Ok(())
}

/// Print the plan as JSON to stdout.
pub fn print_plan_json(plan: &NetworkPlan) -> PlanResult<()> {
    println!("{}", serde_json::to_string_pretty(plan)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::plan_network;

    #[test]
    fn test_plan_rows() {
        let config = parse_config(
            r#"{"name": "edge", "cidr": "10.0.0.0/20", "az_count": 2,
                "availability_zones": ["eu-west-1b", "eu-west-1a"],
                "subnets": {
                    "public": {"netmask": 24},
                    "app": {"netmask": 24, "route_to_nat": true}
                }}"#,
        )
        .unwrap();
        let plan = plan_network(&config).unwrap();
        let rows = plan_rows(&plan);
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0],
            PlanRow {
                group: "public".to_string(),
                zone: "eu-west-1a".to_string(),
                cidr: "10.0.2.0/24".to_string(),
                broadcast: "10.0.2.255".to_string(),
                hosts: 251,
                name: "edge-public-a".to_string(),
                routes: "0.0.0.0/0->igw".to_string(),
                key: "public/a".to_string(),
            }
        );
        assert_eq!(rows[3].routes, "0.0.0.0/0->nat-b");
    }

    #[test]
    fn test_plan_json_serializes() {
        let config = parse_config(
            r#"{"cidr": "10.0.0.0/20", "az_count": 1, "subnets": {"app": {"netmask": 24}}}"#,
        )
        .unwrap();
        let plan = plan_network(&config).unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["groups"][0]["subnets"][0]["cidr"], "10.0.0.0/24");
        assert_eq!(json["keys"][0]["key"], "app/a");
    }
}
