//! Availability zone model.

use crate::error::{PlanError, PlanResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Regex for the trailing letter of provider zone names such as `us-east-1a`.
static ZONE_SUFFIX_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_zone_suffix_regex() -> &'static Regex {
    ZONE_SUFFIX_REGEX.get_or_init(|| Regex::new(r"\d([a-z])$").expect("Invalid Regex"))
}

/// An availability zone: a stable index plus an optional provider name.
///
/// Index 0 is always the alphabetically lowest provider name, so index order
/// and letter order agree (`0 <-> a`, `1 <-> b`, ...).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AvailabilityZone {
    /// Position of the zone, `0..zone_count`.
    pub index: usize,
    /// Provider assigned name, if known.
    pub name: Option<String>,
}

impl AvailabilityZone {
    /// Human readable label derived from the index: `a`, `b`, ... `z`, `aa`, `ab`, ...
    pub fn label(&self) -> String {
        zone_label(self.index)
    }
}

impl fmt::Display for AvailabilityZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", self.label(), name),
            None => write!(f, "{}", self.label()),
        }
    }
}

/// Letter label for a zone index.
pub fn zone_label(index: usize) -> String {
    let mut label = Vec::new();
    let mut n = index;
    loop {
        label.push(b'a' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// Build the ordered zone list for a plan.
///
/// Provider names, when given, are sorted and the first `zone_count` used.
pub fn build_zones(zone_count: usize, names: Option<&[String]>) -> PlanResult<Vec<AvailabilityZone>> {
    let Some(names) = names else {
        return Ok((0..zone_count)
            .map(|index| AvailabilityZone { index, name: None })
            .collect());
    };

    if names.len() < zone_count {
        return Err(PlanError::Config(format!(
            "az_count is {zone_count} but only {} availability zone names given",
            names.len()
        )));
    }

    let mut sorted: Vec<&String> = names.iter().collect();
    sorted.sort();
    sorted.dedup();
    if sorted.len() < zone_count {
        return Err(PlanError::Config(format!(
            "availability zone names contain duplicates: {names:?}"
        )));
    }

    let zones: Vec<AvailabilityZone> = sorted
        .into_iter()
        .take(zone_count)
        .enumerate()
        .map(|(index, name)| AvailabilityZone {
            index,
            name: Some(name.clone()),
        })
        .collect();

    for zone in &zones {
        let Some(name) = &zone.name else { continue };
        if let Some(caps) = get_zone_suffix_regex().captures(name) {
            if caps[1] != zone.label() {
                log::warn!(
                    "zone '{name}' is planned as zone {} (label '{}'); keys follow the label",
                    zone.index,
                    zone.label()
                );
            }
        }
    }

    Ok(zones)
}
