//! Error types for network planning.

use thiserror::Error;

/// Errors raised while planning a network topology.
///
/// Every variant names the group(s) and zone(s) involved so a failed plan can be
/// reported against the exact piece of configuration that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// Malformed address block, or a block outside the range it must live in.
    #[error("invalid address block '{block}': {reason}")]
    InvalidAddressBlock { block: String, reason: String },

    /// Requested netmask / zone count does not fit the available address space.
    #[error("insufficient capacity in {block} for group '{group}': {reason}")]
    Capacity {
        group: String,
        block: String,
        reason: String,
    },

    /// Explicit `cidrs` length does not match the zone count.
    #[error("zone count mismatch for group '{group}': {reason}")]
    ZoneCountMismatch { group: String, reason: String },

    /// Two allocations share addresses.
    #[error("{first_group}/{first_zone} ({first_block}) overlaps {second_group}/{second_zone} ({second_block})")]
    Overlap {
        first_group: String,
        first_zone: String,
        first_block: String,
        second_group: String,
        second_zone: String,
        second_block: String,
    },

    /// A route references a gateway that does not exist.
    #[error("unsatisfiable route for group '{group}': {reason}")]
    UnsatisfiableRoute { group: String, reason: String },

    /// Malformed or contradictory configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// State store read/write failure.
    #[error("state store error: {0}")]
    State(String),

    /// Opaque error from the provisioning engine.
    #[error("provider error while creating {resource}: {message}")]
    Provider { resource: String, message: String },
}

/// Result type for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

impl PlanError {
    pub(crate) fn invalid_block(block: impl ToString, reason: impl Into<String>) -> Self {
        PlanError::InvalidAddressBlock {
            block: block.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsatisfiable(group: &str, reason: impl Into<String>) -> Self {
        PlanError::UnsatisfiableRoute {
            group: group.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Config(err.to_string())
    }
}

impl From<std::io::Error> for PlanError {
    fn from(err: std::io::Error) -> Self {
        PlanError::State(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_message_names_both_sides() {
        let err = PlanError::Overlap {
            first_group: "private".to_string(),
            first_zone: "a".to_string(),
            first_block: "10.0.0.0/24".to_string(),
            second_group: "public".to_string(),
            second_zone: "b".to_string(),
            second_block: "10.0.0.128/25".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "private/a (10.0.0.0/24) overlaps public/b (10.0.0.128/25)"
        );
    }

    #[test]
    fn test_unsatisfiable_helper() {
        let err = PlanError::unsatisfiable("private", "no NAT gateway");
        assert_eq!(
            err.to_string(),
            "unsatisfiable route for group 'private': no NAT gateway"
        );
    }
}
