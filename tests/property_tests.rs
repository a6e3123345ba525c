//! Property-based tests for the planning passes.
//!
//! These tests check properties that must hold for every valid input: partition
//! shape, pairwise disjoint plans, determinism, non-disruptive zone scaling and
//! identity keys that ignore addressing.

use itertools::Itertools;
use proptest::prelude::*;
use std::net::Ipv4Addr;
use vpc_subnet_planner::models::{AddressBlock, Addressing, SubnetGroup};
use vpc_subnet_planner::planning::{
    assign_keys, contains, overlaps, partition, plan, plan_with_reserve,
};

// ============================================================================
// Strategies
// ============================================================================

/// Aligned top-level blocks between /8 and /24.
fn top_level_block() -> impl Strategy<Value = AddressBlock> {
    (any::<u32>(), 8u8..=24).prop_map(|(bits, prefix)| {
        let mask = u32::MAX << (32 - prefix);
        AddressBlock::from_parts(Ipv4Addr::from(bits & mask), prefix).unwrap()
    })
}

/// Group names; `public` appears at most once because names are unique.
fn group_specs() -> impl Strategy<Value = Vec<(String, u8)>> {
    prop::collection::vec(0u8..=6, 0..5).prop_flat_map(|extra| {
        let n = extra.len();
        (Just(extra), any::<bool>(), 0..=n).prop_map(|(extra, with_public, public_at)| {
            let mut groups: Vec<(String, u8)> = extra
                .into_iter()
                .enumerate()
                .map(|(i, e)| (format!("group{i}"), e))
                .collect();
            if with_public {
                groups.insert(public_at.min(groups.len()), ("public".to_string(), 2));
            }
            groups
        })
    })
}

fn build_groups(top: AddressBlock, specs: &[(String, u8)]) -> Vec<SubnetGroup> {
    specs
        .iter()
        .map(|(name, extra)| SubnetGroup::with_netmask(name, (top.prefix() + 4 + extra).min(32)))
        .collect()
}

// ============================================================================
// Partition
// ============================================================================

proptest! {
    #[test]
    fn prop_partition_shape(top in top_level_block(), extra in 1u8..=8, count in 1usize..=16) {
        let netmask = top.prefix() + extra;
        prop_assume!((1u64 << extra) >= count as u64);

        let blocks = partition(top, netmask, count).unwrap();
        prop_assert_eq!(blocks.len(), count);
        for b in &blocks {
            prop_assert_eq!(b.prefix(), netmask);
            prop_assert!(contains(top, *b));
        }
        for (a, b) in blocks.iter().tuple_windows() {
            prop_assert!(a.lo() < b.lo());
        }
        for (a, b) in blocks.iter().tuple_combinations() {
            prop_assert!(!overlaps(*a, *b));
        }
    }

    #[test]
    fn prop_partition_rejects_oversubscription(top in top_level_block(), extra in 1u8..=6) {
        let count = (1usize << extra) + 1;
        prop_assert!(partition(top, top.prefix() + extra, count).is_err());
    }
}

// ============================================================================
// Allocation
// ============================================================================

proptest! {
    #[test]
    fn prop_plan_pairwise_disjoint(top in top_level_block(), specs in group_specs(), zones in 1usize..=4) {
        let groups = build_groups(top, &specs);
        if let Ok(result) = plan(top, zones, &groups) {
            prop_assert_eq!(result.len(), groups.len() * zones);
            for (_, b) in &result.entries {
                prop_assert!(contains(top, *b));
            }
            for ((_, a), (_, b)) in result.entries.iter().tuple_combinations() {
                prop_assert!(!overlaps(*a, *b), "{} overlaps {}", a, b);
            }
        }
    }

    #[test]
    fn prop_plan_deterministic(top in top_level_block(), specs in group_specs(), zones in 1usize..=4) {
        let groups = build_groups(top, &specs);
        let first = format!("{:?}", plan(top, zones, &groups));
        let second = format!("{:?}", plan(top, zones, &groups));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_private_below_public(top in top_level_block(), specs in group_specs(), zones in 1usize..=3) {
        let groups = build_groups(top, &specs);
        if let Ok(result) = plan(top, zones, &groups) {
            for public in result.group_blocks("public") {
                for (slot, block) in &result.entries {
                    if slot.group != "public" {
                        prop_assert!(block.hi() < public.lo());
                    }
                }
            }
        }
    }

    #[test]
    fn prop_pinning_groups_keeps_every_block(
        top in top_level_block(),
        specs in group_specs(),
        pins in prop::collection::vec(any::<bool>(), 6),
        zones in 1usize..=3,
        spare in 0usize..=2,
    ) {
        let groups = build_groups(top, &specs);
        let reserve = zones + spare;
        if let Ok(computed) = plan_with_reserve(top, zones, reserve, &groups) {
            let mixed: Vec<SubnetGroup> = groups
                .iter()
                .zip(&pins)
                .map(|(group, pin)| {
                    if *pin {
                        SubnetGroup::with_cidrs(&group.name, computed.group_blocks(&group.name))
                    } else {
                        group.clone()
                    }
                })
                .collect();

            let result = plan_with_reserve(top, zones, reserve, &mixed).unwrap();
            prop_assert_eq!(&result.entries, &computed.entries);
            for ((_, a), (_, b)) in result.entries.iter().tuple_combinations() {
                prop_assert!(!overlaps(*a, *b), "{} overlaps {}", a, b);
            }
        }
    }

    #[test]
    fn prop_mixed_addressing_disjoint(
        top in top_level_block(),
        specs in group_specs(),
        offsets in prop::collection::vec(any::<u32>(), 6),
        zones in 1usize..=3,
    ) {
        // Every other group gets explicit blocks at arbitrary aligned offsets.
        let groups: Vec<SubnetGroup> = build_groups(top, &specs)
            .into_iter()
            .zip(&offsets)
            .enumerate()
            .map(|(i, (group, offset))| {
                let netmask = match group.addressing {
                    Addressing::Netmask(netmask) if i % 2 == 0 => netmask,
                    _ => return group,
                };
                match partition(top, netmask, 1usize << (netmask - top.prefix()).min(12)) {
                    Ok(blocks) => {
                        let start = *offset as usize % blocks.len();
                        let cidrs = (0..zones).map(|z| blocks[(start + z) % blocks.len()]).collect();
                        SubnetGroup::with_cidrs(&group.name, cidrs)
                    }
                    Err(_) => group,
                }
            })
            .collect();

        if let Ok(result) = plan(top, zones, &groups) {
            prop_assert_eq!(result.len(), groups.len() * zones);
            for ((_, a), (_, b)) in result.entries.iter().tuple_combinations() {
                prop_assert!(!overlaps(*a, *b), "{} overlaps {}", a, b);
            }
        }
    }

    #[test]
    fn prop_adding_zone_keeps_existing(top in top_level_block(), specs in group_specs(), zones in 1usize..=3) {
        let groups = build_groups(top, &specs);
        let reserve = zones + 1;
        if let Ok(bigger) = plan_with_reserve(top, zones + 1, reserve, &groups) {
            let smaller = plan_with_reserve(top, zones, reserve, &groups).unwrap();
            for (slot, block) in &smaller.entries {
                prop_assert_eq!(bigger.entries.get(slot), Some(block));
            }
        }
    }
}

// ============================================================================
// Identity keys
// ============================================================================

proptest! {
    #[test]
    fn prop_keys_ignore_addresses(netmask in 17u8..=28, other in 17u8..=28) {
        let a = vec![
            SubnetGroup::with_netmask("private", netmask),
            SubnetGroup::with_netmask("public", other),
        ];
        let b = vec![
            SubnetGroup::with_netmask("private", other),
            SubnetGroup::with_netmask("public", netmask),
        ];
        let keys_a = assign_keys(&a, 2);
        let keys_b = assign_keys(&b, 2);
        prop_assert_eq!(keys_a.get("private", 0).unwrap().as_str(), "private/a");
        prop_assert_eq!(keys_a, keys_b);
    }
}
