//! Stable identity keys and key-scheme migration.
//!
//! Entities are keyed by their declared identity, `group/zone`, never by an
//! address computed from configuration, so changing a netmask or switching a
//! group to explicit `cidrs` keeps every key in place.
//!
//! Transit gateway routes are still keyed `group/zone:destination` by the
//! provisioning side. [`reconcile`] does not cover them; use
//! [`transit_route_changes`] to list the keys that need a manual state move.

use super::allocation::Allocation;
use super::topology::Topology;
use crate::models::{zone_label, RouteTarget, SlotId, SubnetGroup};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stable name of a planned entity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Key of the subnet (and its route table) of `group` in `zone`.
    pub fn for_slot(group: &str, zone: usize) -> IdentityKey {
        IdentityKey(format!("{group}/{}", zone_label(zone)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IdentityKey {
    fn from(s: &str) -> Self {
        IdentityKey(s.to_string())
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One (slot, key) pair of a scheme; the persisted form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    pub group: String,
    pub zone: usize,
    pub key: IdentityKey,
}

/// Keys of every (group, zone) under one naming scheme.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(from = "Vec<KeyEntry>", into = "Vec<KeyEntry>")]
pub struct KeyScheme {
    pub keys: BTreeMap<SlotId, IdentityKey>,
}

impl KeyScheme {
    pub fn get(&self, group: &str, zone: usize) -> Option<&IdentityKey> {
        self.keys.get(&SlotId::new(group, zone))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Legacy scheme that keyed subnets by their allocated block (`group/cidr`).
    pub fn address_derived(allocation: &Allocation) -> KeyScheme {
        KeyScheme {
            keys: allocation
                .entries
                .iter()
                .map(|(slot, block)| {
                    (slot.clone(), IdentityKey(format!("{}/{block}", slot.group)))
                })
                .collect(),
        }
    }
}

impl From<Vec<KeyEntry>> for KeyScheme {
    fn from(entries: Vec<KeyEntry>) -> Self {
        KeyScheme {
            keys: entries
                .into_iter()
                .map(|e| (SlotId { group: e.group, zone: e.zone }, e.key))
                .collect(),
        }
    }
}

impl From<KeyScheme> for Vec<KeyEntry> {
    fn from(scheme: KeyScheme) -> Self {
        scheme
            .keys
            .into_iter()
            .map(|(slot, key)| KeyEntry {
                group: slot.group,
                zone: slot.zone,
                key,
            })
            .collect()
    }
}

/// An entity whose key changed between two schemes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KeyRename {
    pub from: IdentityKey,
    pub to: IdentityKey,
}

/// Assign `group/zone` keys to every group in every zone.
pub fn assign_keys(groups: &[SubnetGroup], zone_count: usize) -> KeyScheme {
    let keys = groups
        .iter()
        .flat_map(|group| {
            (0..zone_count).map(move |zone| {
                (
                    SlotId::new(&group.name, zone),
                    IdentityKey::for_slot(&group.name, zone),
                )
            })
        })
        .collect();
    KeyScheme { keys }
}

/// Renames that carry entities of `old` over to their keys in `new`.
///
/// Only slots present in both schemes with differing keys are emitted, ordered
/// by (group, zone).
pub fn reconcile(old: &KeyScheme, new: &KeyScheme) -> Vec<KeyRename> {
    old.keys
        .iter()
        .filter_map(|(slot, old_key)| {
            let new_key = new.keys.get(slot)?;
            (old_key != new_key).then(|| KeyRename {
                from: old_key.clone(),
                to: new_key.clone(),
            })
        })
        .collect()
}

/// Keys the provisioning side gives transit gateway routes: `group/zone:destination`.
pub fn transit_route_keys(topology: &Topology) -> BTreeSet<String> {
    topology
        .routes
        .iter()
        .flat_map(|(slot, rules)| {
            rules
                .iter()
                .filter(|rule| rule.target == RouteTarget::TransitGateway)
                .map(move |rule| format!("{slot}:{}", rule.destination))
        })
        .collect()
}

/// Transit route keys that disappear and appear between two runs.
///
/// These are not identity-equivalent as far as [`reconcile`] knows; a widened
/// destination shows up as one removal plus one addition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitRouteChanges {
    pub removed: Vec<String>,
    pub added: Vec<String>,
}

impl TransitRouteChanges {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

pub fn transit_route_changes(
    old: &BTreeSet<String>,
    new: &BTreeSet<String>,
) -> TransitRouteChanges {
    TransitRouteChanges {
        removed: old.difference(new).cloned().collect(),
        added: new.difference(old).cloned().collect(),
    }
}
