//! Domain models for network planning.
//!
//! This module contains the core data structures used throughout the planner:
//! - [`AddressBlock`] - aligned IPv4 range in CIDR notation
//! - [`AvailabilityZone`] - ordered failure domain
//! - [`SubnetGroup`] - named set of subnets, one per zone
//! - [`RouteRule`] - route table entry

mod group;
mod ipv4;
mod route;
mod zone;

// Re-export public types
pub use group::{
    Addressing, NatGatewayConfiguration, SlotId, SubnetGroup, SubnetKind, PUBLIC_GROUP,
    TRANSIT_GATEWAY_GROUP,
};
pub use ipv4::{
    block_size, broadcast_addr, cut_addr, get_cidr_mask, usable_hosts, AddressBlock, MAX_LENGTH,
    RESERVED_HOSTS,
};
pub use route::{RouteRule, RouteTarget};
pub use zone::{build_zones, zone_label, AvailabilityZone};
