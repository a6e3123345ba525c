//! Address allocation per (group, zone).
//!
//! Explicit `cidrs` are claimed first, in declared order. Netmask groups are
//! then carved out of the top-level block from the lowest address upwards:
//! every non-public group before the public group, each in declared order.
//! Keeping private ranges ahead of public ones means growing public capacity
//! later never moves an existing private range.
//!
//! A netmask group takes the first aligned run of free sub-blocks at or past
//! the cursor, stepping over explicit blocks. An explicit group found exactly
//! at the cursor advances it as if it had been computed, so pinning a group to
//! its current blocks leaves every later group where it was.

use super::address_space::{contains, nth_block, overlaps, sub_block_count};
use crate::error::{PlanError, PlanResult};
use crate::models::{block_size, zone_label, AddressBlock, Addressing, SlotId, SubnetGroup};
use std::collections::{BTreeMap, HashSet};

/// Result of allocation: one block per (group, zone).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub top_level: AddressBlock,
    pub zone_count: usize,
    pub entries: BTreeMap<SlotId, AddressBlock>,
}

impl Allocation {
    pub fn get(&self, group: &str, zone: usize) -> Option<AddressBlock> {
        self.entries.get(&SlotId::new(group, zone)).copied()
    }

    /// Blocks of one group in zone order.
    pub fn group_blocks(&self, group: &str) -> Vec<AddressBlock> {
        (0..self.zone_count)
            .filter_map(|zone| self.get(group, zone))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Allocate blocks for every group, reserving room for exactly `zone_count` zones.
pub fn plan(
    top_level: AddressBlock,
    zone_count: usize,
    groups: &[SubnetGroup],
) -> PlanResult<Allocation> {
    plan_with_reserve(top_level, zone_count, zone_count, groups)
}

/// Allocate blocks for every group.
///
/// Each netmask group reserves `max(zone_count, reserved_zones)` consecutive
/// sub-blocks and fills the first `zone_count`, so raising the zone count up to
/// the reservation leaves every existing block in place.
pub fn plan_with_reserve(
    top_level: AddressBlock,
    zone_count: usize,
    reserved_zones: usize,
    groups: &[SubnetGroup],
) -> PlanResult<Allocation> {
    log::debug!(
        "allocating {} groups over {} zones in {top_level}",
        groups.len(),
        zone_count
    );

    let mut names = HashSet::new();
    for group in groups {
        if !names.insert(group.name.as_str()) {
            return Err(PlanError::Config(format!(
                "subnet group '{}' declared twice",
                group.name
            )));
        }
    }

    let mut ledger = Ledger::default();

    for group in groups {
        let Addressing::Cidrs(cidrs) = &group.addressing else {
            continue;
        };
        if cidrs.len() != zone_count {
            return Err(PlanError::ZoneCountMismatch {
                group: group.name.clone(),
                reason: format!(
                    "{} cidrs given for {zone_count} zones; cidrs must be resized explicitly",
                    cidrs.len()
                ),
            });
        }
        for (zone, cidr) in cidrs.iter().enumerate() {
            if !contains(top_level, *cidr) {
                return Err(PlanError::invalid_block(
                    cidr,
                    format!(
                        "{}/{} is outside the top-level block {top_level}",
                        group.name,
                        zone_label(zone)
                    ),
                ));
            }
            ledger.claim(SlotId::new(&group.name, zone), *cidr)?;
        }
    }

    let slots = zone_count.max(reserved_zones) as u64;
    let mut cursor: u64 = 0;
    let ordered = groups
        .iter()
        .filter(|g| !g.is_public())
        .chain(groups.iter().filter(|g| g.is_public()));

    for group in ordered {
        let netmask = match &group.addressing {
            Addressing::Netmask(netmask) => *netmask,
            Addressing::Cidrs(cidrs) => {
                if let Some(end) = explicit_run_end(top_level, cursor, cidrs, slots) {
                    cursor = cursor.max(end);
                }
                continue;
            }
        };
        if zone_count == 0 {
            return Err(PlanError::ZoneCountMismatch {
                group: group.name.clone(),
                reason: "netmask allocation needs at least one zone".to_string(),
            });
        }

        let available =
            sub_block_count(top_level, netmask).map_err(|e| with_group(e, &group.name))?;
        let size = block_size(netmask)?;
        let mut first = cursor.div_ceil(size);
        loop {
            if first + slots > available {
                return Err(PlanError::Capacity {
                    group: group.name.clone(),
                    block: top_level.to_string(),
                    reason: format!(
                        "{slots} x /{netmask} needed from offset {first}, only {available} fit"
                    ),
                });
            }
            let lo = first * size;
            match ledger.collision_end(top_level.lo(), lo, lo + slots * size - 1) {
                Some(end) => {
                    log::debug!("{} skips claimed range ending at offset {end}", group.name);
                    first = end.div_ceil(size);
                }
                None => break,
            }
        }

        for zone in 0..zone_count {
            let block = nth_block(top_level, netmask, first + zone as u64)
                .map_err(|e| with_group(e, &group.name))?;
            log::debug!("{}/{} <- {block}", group.name, zone_label(zone));
            ledger.claim(SlotId::new(&group.name, zone), block)?;
        }
        cursor = (first + slots) * size;
    }

    log::info!(
        "allocated {} subnets in {top_level} ({} zones)",
        ledger.entries.len(),
        zone_count
    );

    Ok(Allocation {
        top_level,
        zone_count,
        entries: ledger.entries.into_iter().collect(),
    })
}

/// Running set of claimed blocks; nothing leaves it until planning succeeds.
#[derive(Default)]
struct Ledger {
    entries: Vec<(SlotId, AddressBlock)>,
}

impl Ledger {
    fn claim(&mut self, slot: SlotId, block: AddressBlock) -> PlanResult<()> {
        if let Some((other, other_block)) = self
            .entries
            .iter()
            .find(|(_, existing)| overlaps(*existing, block))
        {
            log::warn!("{other} ({other_block}) collides with {slot} ({block})");
            return Err(PlanError::Overlap {
                first_group: other.group.clone(),
                first_zone: zone_label(other.zone),
                first_block: other_block.to_string(),
                second_group: slot.group.clone(),
                second_zone: zone_label(slot.zone),
                second_block: block.to_string(),
            });
        }
        self.entries.push((slot, block));
        Ok(())
    }

    /// End offset from `base` of the highest claimed block touching `lo..=hi`.
    fn collision_end(&self, base: u32, lo: u64, hi: u64) -> Option<u64> {
        self.entries
            .iter()
            .map(|(_, b)| (u64::from(b.lo() - base), u64::from(b.hi() - base)))
            .filter(|(b_lo, b_hi)| *b_lo <= hi && lo <= *b_hi)
            .map(|(_, b_hi)| b_hi + 1)
            .max()
    }
}

/// End offset of an explicit group that sits where sequential allocation
/// would have put it. Groups after it then keep their blocks.
fn explicit_run_end(
    top_level: AddressBlock,
    cursor: u64,
    cidrs: &[AddressBlock],
    slots: u64,
) -> Option<u64> {
    let first = cidrs.first()?;
    let size = block_size(first.prefix()).ok()?;
    let offset = u64::from(first.lo() - top_level.lo());
    if offset != cursor.div_ceil(size) * size {
        return None;
    }
    let used = cidrs
        .iter()
        .map(|c| u64::from(c.hi() - top_level.lo()) + 1)
        .max()?;
    if cidrs.iter().all(|c| c.prefix() == first.prefix()) {
        Some(used.max(offset + slots * size))
    } else {
        Some(used)
    }
}

fn with_group(err: PlanError, group: &str) -> PlanError {
    match err {
        PlanError::Capacity { block, reason, .. } => PlanError::Capacity {
            group: group.to_string(),
            block,
            reason,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use pretty_assertions::assert_eq;

    fn block(s: &str) -> AddressBlock {
        AddressBlock::new(s).unwrap()
    }

    #[test]
    fn test_private_before_public() {
        let groups = vec![
            SubnetGroup::with_netmask("public", 24),
            SubnetGroup::with_netmask("private", 24),
        ];
        let result = plan(block("10.0.0.0/16"), 2, &groups).unwrap();
        assert_eq!(result.group_blocks("private"), vec![block("10.0.0.0/24"), block("10.0.1.0/24")]);
        assert_eq!(result.group_blocks("public"), vec![block("10.0.2.0/24"), block("10.0.3.0/24")]);
    }

    #[test]
    fn test_mixed_netmasks_align() {
        let groups = vec![
            SubnetGroup::with_netmask("transit_gateway", 28),
            SubnetGroup::with_netmask("private", 24),
        ];
        let result = plan(block("10.0.0.0/20"), 2, &groups).unwrap();
        assert_eq!(result.get("transit_gateway", 1), Some(block("10.0.0.16/28")));
        assert_eq!(result.get("private", 0), Some(block("10.0.1.0/24")));
        assert_eq!(result.get("private", 1), Some(block("10.0.2.0/24")));
    }

    #[test]
    fn test_zero_groups() {
        let result = plan(block("10.0.0.0/16"), 3, &[]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_zero_zones() {
        let explicit = vec![SubnetGroup::with_cidrs("private", vec![])];
        assert!(plan(block("10.0.0.0/16"), 0, &explicit).unwrap().is_empty());

        let computed = vec![SubnetGroup::with_netmask("private", 24)];
        assert!(matches!(
            plan(block("10.0.0.0/16"), 0, &computed),
            Err(PlanError::ZoneCountMismatch { .. })
        ));
    }

    #[test]
    fn test_cidrs_length_mismatch() {
        let groups = vec![SubnetGroup::with_cidrs(
            "private",
            vec![block("10.0.0.0/24"), block("10.0.1.0/24")],
        )];
        let err = plan(block("10.0.0.0/16"), 3, &groups).unwrap_err();
        assert!(matches!(err, PlanError::ZoneCountMismatch { ref group, .. } if group == "private"));
    }

    #[test]
    fn test_cidrs_outside_top_level() {
        let groups = vec![SubnetGroup::with_cidrs("private", vec![block("10.1.0.0/24")])];
        assert!(matches!(
            plan(block("10.0.0.0/16"), 1, &groups),
            Err(PlanError::InvalidAddressBlock { .. })
        ));
    }

    #[test]
    fn test_computed_skips_explicit() {
        let groups = vec![
            SubnetGroup::with_netmask("private", 24),
            SubnetGroup::with_cidrs("public", vec![block("10.0.1.0/24"), block("10.0.9.0/24")]),
        ];
        let result = plan(block("10.0.0.0/16"), 2, &groups).unwrap();
        assert_eq!(result.group_blocks("private"), vec![block("10.0.2.0/24"), block("10.0.3.0/24")]);
        assert_eq!(result.group_blocks("public"), vec![block("10.0.1.0/24"), block("10.0.9.0/24")]);
    }

    #[test]
    fn test_pinned_group_keeps_later_blocks() {
        for reserve in [2, 3] {
            let computed = vec![
                SubnetGroup::with_netmask("transit_gateway", 28),
                SubnetGroup::with_netmask("private", 24),
                SubnetGroup::with_netmask("app", 28),
                SubnetGroup::with_netmask("public", 26),
            ];
            let before = plan_with_reserve(block("10.0.0.0/16"), 2, reserve, &computed).unwrap();

            let mut pinned = computed.clone();
            pinned[1] = SubnetGroup::with_cidrs("private", before.group_blocks("private"));
            let after = plan_with_reserve(block("10.0.0.0/16"), 2, reserve, &pinned).unwrap();
            assert_eq!(before.entries, after.entries, "reserve {reserve}");
        }
    }

    #[test]
    fn test_pinned_first_group_keeps_second() {
        let computed = vec![
            SubnetGroup::with_netmask("private", 24),
            SubnetGroup::with_netmask("app", 24),
        ];
        let before = plan(block("10.0.0.0/16"), 2, &computed).unwrap();
        assert_eq!(before.group_blocks("app"), vec![block("10.0.2.0/24"), block("10.0.3.0/24")]);

        let pinned = vec![
            SubnetGroup::with_cidrs("private", vec![block("10.0.0.0/24"), block("10.0.1.0/24")]),
            SubnetGroup::with_netmask("app", 24),
        ];
        let after = plan(block("10.0.0.0/16"), 2, &pinned).unwrap();
        assert_eq!(after.group_blocks("app"), before.group_blocks("app"));
    }

    #[test]
    fn test_skip_past_explicit_exhausts_capacity() {
        let groups = vec![
            SubnetGroup::with_cidrs("data", vec![block("10.0.0.64/26")]),
            SubnetGroup::with_cidrs("logs", vec![block("10.0.0.192/26")]),
            SubnetGroup::with_netmask("private", 25),
        ];
        let err = plan(block("10.0.0.0/24"), 1, &groups).unwrap_err();
        assert!(matches!(err, PlanError::Capacity { ref group, .. } if group == "private"), "{err}");
    }

    #[test]
    fn test_explicit_collides_with_explicit() {
        let groups = vec![
            SubnetGroup::with_cidrs("private", vec![block("10.0.0.0/23")]),
            SubnetGroup::with_cidrs("data", vec![block("10.0.1.0/24")]),
        ];
        assert!(matches!(
            plan(block("10.0.0.0/16"), 1, &groups),
            Err(PlanError::Overlap { .. })
        ));
    }

    #[test]
    fn test_capacity_exhausted() {
        let groups = vec![
            SubnetGroup::with_netmask("private", 25),
            SubnetGroup::with_netmask("public", 25),
        ];
        let err = plan(block("10.0.0.0/24"), 2, &groups).unwrap_err();
        assert!(matches!(err, PlanError::Capacity { ref group, .. } if group == "public"));
    }

    #[test]
    fn test_netmask_not_smaller_than_top_level() {
        let groups = vec![SubnetGroup::with_netmask("private", 16)];
        let err = plan(block("10.0.0.0/16"), 1, &groups).unwrap_err();
        assert!(matches!(err, PlanError::Capacity { ref group, .. } if group == "private"));
    }

    #[test]
    fn test_duplicate_group_names() {
        let groups = vec![
            SubnetGroup::with_netmask("private", 24),
            SubnetGroup::with_netmask("private", 24),
        ];
        assert!(matches!(
            plan(block("10.0.0.0/16"), 1, &groups),
            Err(PlanError::Config(_))
        ));
    }

    #[test]
    fn test_reserve_keeps_existing_blocks() {
        let groups = vec![
            SubnetGroup::with_netmask("private", 24),
            SubnetGroup::with_netmask("public", 24),
        ];
        let two = plan_with_reserve(block("10.0.0.0/16"), 2, 4, &groups).unwrap();
        let three = plan_with_reserve(block("10.0.0.0/16"), 3, 4, &groups).unwrap();
        for (slot, cidr) in &two.entries {
            assert_eq!(three.entries.get(slot), Some(cidr));
        }
        assert_eq!(three.get("public", 0), Some(block("10.0.4.0/24")));
        assert_eq!(three.get("public", 2), Some(block("10.0.6.0/24")));
    }

    #[test]
    fn test_no_pairwise_overlap() {
        let groups = vec![
            SubnetGroup::with_netmask("public", 26),
            SubnetGroup::with_netmask("app", 22),
            SubnetGroup::with_cidrs(
                "data",
                vec![block("10.0.200.0/24"), block("10.0.201.0/24"), block("10.0.202.0/24")],
            ),
            SubnetGroup::with_netmask("transit_gateway", 28),
        ];
        let result = plan(block("10.0.0.0/16"), 3, &groups).unwrap();
        assert_eq!(result.len(), 12);
        for ((_, a), (_, b)) in result.entries.iter().tuple_combinations() {
            assert!(!overlaps(*a, *b), "{a} overlaps {b}");
        }
    }
}
