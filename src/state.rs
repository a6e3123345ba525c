//! Append-only log of identity key schemes.
//!
//! Every successful plan appends one record holding the keys in force and the
//! renames emitted against the previous record. Records are never rewritten or
//! deleted, so the history of key moves stays inspectable.

use crate::error::{PlanError, PlanResult};
use crate::planning::{
    reconcile, transit_route_changes, KeyRename, KeyScheme, TransitRouteChanges,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One planning run as seen by the state log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StateRecord {
    pub recorded_at: DateTime<Utc>,
    pub network: String,
    pub scheme: KeyScheme,
    pub renames: Vec<KeyRename>,
    /// Legacy `group/zone:destination` keys of transit gateway routes.
    #[serde(default)]
    pub transit_routes: BTreeSet<String>,
}

/// Storage for [`StateRecord`]s; append only.
pub trait StateStore {
    /// All records, oldest first.
    fn records(&self) -> PlanResult<Vec<StateRecord>>;

    fn append(&mut self, record: StateRecord) -> PlanResult<()>;

    /// Most recent record of `network`.
    fn latest(&self, network: &str) -> PlanResult<Option<StateRecord>> {
        Ok(self
            .records()?
            .into_iter()
            .rev()
            .find(|r| r.network == network))
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<StateRecord>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl StateStore for MemoryStore {
    fn records(&self) -> PlanResult<Vec<StateRecord>> {
        Ok(self.records.clone())
    }

    fn append(&mut self, record: StateRecord) -> PlanResult<()> {
        self.records.push(record);
        Ok(())
    }
}

/// File store, one JSON record per line.
#[derive(Debug, Clone)]
pub struct JsonLinesStore {
    path: PathBuf,
}

impl JsonLinesStore {
    pub fn new(path: impl AsRef<Path>) -> JsonLinesStore {
        JsonLinesStore {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl StateStore for JsonLinesStore {
    fn records(&self) -> PlanResult<Vec<StateRecord>> {
        if !self.path.exists() {
            log::info!("State file not found, starting empty: {}", self.path.display());
            return Ok(vec![]);
        }
        let text = std::fs::read_to_string(&self.path)?;
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| {
                    PlanError::State(format!(
                        "{} line {}: {e}",
                        self.path.display(),
                        i + 1
                    ))
                })
            })
            .collect()
    }

    fn append(&mut self, record: StateRecord) -> PlanResult<()> {
        let line = serde_json::to_string(&record)
            .map_err(|e| PlanError::State(format!("error serializing state record: {e}")))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        log::debug!("Appended state record to {}", self.path.display());
        Ok(())
    }
}

/// What changed in identity terms since the previous run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationReport {
    pub renames: Vec<KeyRename>,
    /// Not covered by renames; needs manual state correction.
    pub transit_routes: TransitRouteChanges,
}

/// Reconcile `scheme` against the last record of `network` and append a new record.
pub fn record_plan(
    store: &mut dyn StateStore,
    network: &str,
    scheme: &KeyScheme,
    transit_routes: BTreeSet<String>,
) -> PlanResult<MigrationReport> {
    let previous = store.latest(network)?;
    let (renames, transit_changes) = match &previous {
        Some(prev) => (
            reconcile(&prev.scheme, scheme),
            transit_route_changes(&prev.transit_routes, &transit_routes),
        ),
        None => (vec![], TransitRouteChanges::default()),
    };

    if !transit_changes.is_empty() {
        log::warn!(
            "transit gateway route keys changed and are not covered by key renames; correct state manually: removed={:?} added={:?}",
            transit_changes.removed,
            transit_changes.added
        );
    }
    log::info!("{} key renames for '{network}'", renames.len());

    store.append(StateRecord {
        recorded_at: Utc::now(),
        network: network.to_string(),
        scheme: scheme.clone(),
        renames: renames.clone(),
        transit_routes,
    })?;

    Ok(MigrationReport {
        renames,
        transit_routes: transit_changes,
    })
}
