//! Plan the subnet layout of a virtual private network.
//!
//! Given one top-level address block, a zone count and an ordered set of subnet
//! groups, the planner allocates a block per (group, zone), places NAT
//! gateways, wires route tables and assigns stable identity keys. The result is
//! a [`planning::NetworkPlan`] ready for a provisioning engine.

pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod planning;
pub mod provision;
pub mod state;

use crate::config::NetworkConfig;
use crate::error::PlanResult;
use crate::planning::{NetworkPlan, Topology};
use crate::state::{MigrationReport, StateStore};

pub use error::PlanError;

/// Run every planning pass for `config`.
///
/// Nothing is published unless every pass succeeds.
pub fn plan_network(config: &NetworkConfig) -> PlanResult<NetworkPlan> {
    run_passes(config).map(|(plan, _)| plan)
}

/// Plan, then reconcile identity keys against the state log and append to it.
pub fn plan_and_record(
    config: &NetworkConfig,
    store: &mut dyn StateStore,
) -> PlanResult<(NetworkPlan, MigrationReport)> {
    let (plan, topology) = run_passes(config)?;
    let report = state::record_plan(
        store,
        &config.name,
        &plan.keys,
        planning::transit_route_keys(&topology),
    )?;
    Ok((plan, report))
}

fn run_passes(config: &NetworkConfig) -> PlanResult<(NetworkPlan, Topology)> {
    let zones = config.zones()?;
    let groups = config.groups()?;
    let reserved = config.reserved_zones()?;

    let allocation =
        planning::plan_with_reserve(config.cidr, config.az_count, reserved, &groups)?;
    let topology = planning::plan_topology(&groups, &allocation, config.az_count)?;
    let keys = planning::assign_keys(&groups, config.az_count);

    let plan = planning::assemble(&config.name, &zones, &groups, &allocation, &topology, &keys)?;
    Ok((plan, topology))
}
