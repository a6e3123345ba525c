//! Network planning logic.
//!
//! This module contains the planning passes, leaves first:
//! - [`address_space`] - partitioning, containment and overlap of address blocks
//! - [`allocation`] - address block per (group, zone)
//! - [`topology`] - NAT gateway placement and route tables
//! - [`identity`] - stable keys and key-scheme migration
//! - [`assemble`] - zone indexed plan for the provisioning engine

pub mod address_space;
pub mod allocation;
pub mod assemble;
pub mod identity;
pub mod topology;

// Re-export public functions
pub use address_space::{contains, nth_block, overlaps, partition, sub_block_count};
pub use allocation::{plan, plan_with_reserve, Allocation};
pub use assemble::{assemble, GroupPlan, NatGatewayEntry, NetworkPlan, SubnetEntry};
pub use identity::{
    assign_keys, reconcile, transit_route_changes, transit_route_keys, IdentityKey, KeyRename,
    KeyScheme, TransitRouteChanges,
};
pub use topology::{plan_topology, NatGatewayPlacement, Topology};
