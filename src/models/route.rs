//! Route table entries.

use super::{zone_label, AddressBlock};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a route sends traffic.
///
/// Variant order is the order rules appear in a route table.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteTarget {
    InternetGateway,
    /// NAT gateway hosted in the public subnet of `zone`.
    NatGateway { zone: usize },
    TransitGateway,
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTarget::InternetGateway => write!(f, "igw"),
            RouteTarget::NatGateway { zone } => write!(f, "nat-{}", zone_label(*zone)),
            RouteTarget::TransitGateway => write!(f, "tgw"),
        }
    }
}

/// One route: destination block and where it goes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteRule {
    pub destination: AddressBlock,
    pub target: RouteTarget,
}

impl RouteRule {
    pub fn new(destination: AddressBlock, target: RouteTarget) -> RouteRule {
        RouteRule {
            destination,
            target,
        }
    }
}

impl fmt::Display for RouteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.destination, self.target)
    }
}
