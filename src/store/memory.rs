//! In-process column store.
//!
//! [`MemoryStore`] implements [`StoreTransport`] and [`RecentIndex`] with the
//! semantics the repository relies on from a real cluster:
//!
//! - **Atomic batches**: a batch is validated in full, then applied under one
//!   lock, so readers never see half of it.
//! - **Last write wins per column**: a mutation only replaces a column whose
//!   stored timestamp is not newer. Equal timestamps go to the later write.
//! - **Replica accounting**: the store has a replication factor and a number
//!   of live replicas; requests whose [`Consistency`] cannot be met fail with
//!   [`StoreFault::Unavailable`].
//! - **Fault injection**: [`MemoryStore::fail_next_with`] queues faults that
//!   the next calls return instead of touching data.
//!
//! ## Snapshots
//!
//! The whole keyspace can be saved to and loaded from a JSON file. Row keys,
//! column names and values are hex-encoded. A missing snapshot file loads as
//! an empty store; a corrupt one is an error rather than silent data loss.

use super::{
    BatchWrite, Consistency, RecentIndex, SlicePredicate, StoreFault, StoreTransport,
    StoredColumn, WriteTimestamp,
};
use super::mutation::Column;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Version of the snapshot format. Bump on incompatible changes.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot version {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("snapshot belongs to keyspace '{found}', not '{expected}'")]
    KeyspaceMismatch { found: String, expected: String },
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
    #[error("cannot open keyspace: {0}")]
    Connect(#[from] StoreFault),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cell {
    value: Vec<u8>,
    timestamp: WriteTimestamp,
}

type Row = BTreeMap<Vec<u8>, Cell>;
type Family = BTreeMap<Vec<u8>, Row>;

/// A single-process stand-in for a replicated column store.
#[derive(Debug)]
pub struct MemoryStore {
    keyspace: String,
    replication_factor: usize,
    live_replicas: AtomicUsize,
    families: Mutex<BTreeMap<String, Family>>,
    faults: Mutex<VecDeque<StoreFault>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn validate_keyspace(keyspace: &str) -> Result<(), StoreFault> {
    if keyspace.is_empty() {
        return Err(StoreFault::invalid_request("keyspace name may not be empty"));
    }
    if !keyspace
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(StoreFault::invalid_request(format!(
            "keyspace name '{keyspace}' may only contain alphanumerics and underscores"
        )));
    }
    Ok(())
}

impl MemoryStore {
    /// Open an empty keyspace with a single replica.
    pub fn connect(keyspace: &str) -> Result<Self, StoreFault> {
        validate_keyspace(keyspace)?;
        Ok(Self {
            keyspace: keyspace.to_string(),
            replication_factor: 1,
            live_replicas: AtomicUsize::new(1),
            families: Mutex::new(BTreeMap::new()),
            faults: Mutex::new(VecDeque::new()),
        })
    }

    /// Declare a column family, builder style.
    pub fn with_column_family(self, name: &str) -> Self {
        self.define_column_family(name);
        self
    }

    /// Set the replication factor; all replicas start out live.
    pub fn with_replication(mut self, factor: usize) -> Self {
        let factor = factor.max(1);
        self.replication_factor = factor;
        self.live_replicas = AtomicUsize::new(factor);
        self
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    /// Declare a column family. Existing data in it is kept.
    pub fn define_column_family(&self, name: &str) {
        lock(&self.families).entry(name.to_string()).or_default();
    }

    /// Simulate replicas going down or coming back.
    pub fn set_live_replicas(&self, live: usize) {
        self.live_replicas
            .store(live.min(self.replication_factor), Ordering::SeqCst);
    }

    /// Make the next call fail with `fault`. Queued faults are consumed in order.
    pub fn fail_next_with(&self, fault: StoreFault) {
        lock(&self.faults).push_back(fault);
    }

    /// Number of rows in a column family.
    pub fn row_count(&self, column_family: &str) -> usize {
        lock(&self.families)
            .get(column_family)
            .map_or(0, |family| family.len())
    }

    /// Load a keyspace from a snapshot file, or open it empty if the file
    /// does not exist.
    pub fn load(keyspace: &str, path: &Path) -> Result<Self, SnapshotError> {
        let store = Self::connect(keyspace)?;
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(store),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        if snapshot.keyspace != keyspace {
            return Err(SnapshotError::KeyspaceMismatch {
                found: snapshot.keyspace,
                expected: keyspace.to_string(),
            });
        }
        *lock(&store.families) = snapshot.into_families()?;
        Ok(store)
    }

    /// Write the whole keyspace to a snapshot file.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let snapshot = Snapshot::from_families(&self.keyspace, &lock(&self.families));
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Common preamble of every request: injected faults, then replicas.
    fn admit(&self, consistency: Consistency) -> Result<(), StoreFault> {
        if let Some(fault) = lock(&self.faults).pop_front() {
            return Err(fault);
        }
        let live = self.live_replicas.load(Ordering::SeqCst);
        if live < consistency.required_replicas(self.replication_factor) {
            return Err(StoreFault::Unavailable);
        }
        Ok(())
    }
}

fn unconfigured_family(column_family: &str) -> StoreFault {
    StoreFault::invalid_request(format!("unconfigured column family '{column_family}'"))
}

impl StoreTransport for MemoryStore {
    fn get_slice(
        &self,
        row_key: &[u8],
        column_family: &str,
        predicate: &SlicePredicate,
        consistency: Consistency,
    ) -> Result<Vec<StoredColumn>, StoreFault> {
        self.admit(consistency)?;
        if predicate.column_names.is_empty() {
            return Err(StoreFault::invalid_request("slice predicate names no columns"));
        }
        let families = lock(&self.families);
        let family = families
            .get(column_family)
            .ok_or_else(|| unconfigured_family(column_family))?;
        let Some(row) = family.get(row_key) else {
            return Ok(Vec::new());
        };
        Ok(predicate
            .column_names
            .iter()
            .filter_map(|name| {
                row.get(name).map(|cell| StoredColumn {
                    name: name.clone(),
                    value: cell.value.clone(),
                    timestamp: cell.timestamp,
                })
            })
            .collect())
    }

    fn atomic_batch_mutate(
        &self,
        batch: &BatchWrite,
        consistency: Consistency,
    ) -> Result<(), StoreFault> {
        self.admit(consistency)?;
        if batch.row_key.is_empty() {
            return Err(StoreFault::invalid_request("row key may not be empty"));
        }
        if batch.mutations.is_empty() {
            return Err(StoreFault::invalid_request("batch contains no mutations"));
        }

        let mut families = lock(&self.families);
        let family = families
            .get_mut(&batch.column_family)
            .ok_or_else(|| unconfigured_family(&batch.column_family))?;
        let row = family.entry(batch.row_key.clone()).or_default();
        let mut applied = 0usize;
        for mutation in &batch.mutations {
            let name = mutation.name().to_vec();
            if row
                .get(&name)
                .is_some_and(|cell| cell.timestamp > mutation.timestamp)
            {
                continue;
            }
            row.insert(
                name,
                Cell {
                    value: mutation.value.clone(),
                    timestamp: mutation.timestamp,
                },
            );
            applied += 1;
        }
        tracing::debug!(
            keyspace = %self.keyspace,
            column_family = %batch.column_family,
            row = %hex::encode(&batch.row_key),
            applied,
            superseded = batch.mutations.len() - applied,
            "applied batch"
        );
        Ok(())
    }
}

impl RecentIndex for MemoryStore {
    fn recent_row_keys(
        &self,
        column_family: &str,
        owner: Option<&str>,
        limit: usize,
        consistency: Consistency,
    ) -> Result<Vec<Vec<u8>>, StoreFault> {
        self.admit(consistency)?;
        let families = lock(&self.families);
        let family = families
            .get(column_family)
            .ok_or_else(|| unconfigured_family(column_family))?;

        let picture = Column::Picture.name().as_bytes();
        let owner_col = Column::Owner.name().as_bytes();
        let mut rows: Vec<(WriteTimestamp, &Vec<u8>)> = family
            .iter()
            .filter(|(_, row)| {
                owner.is_none_or(|o| {
                    row.get(owner_col)
                        .is_some_and(|cell| cell.value == o.as_bytes())
                })
            })
            .filter_map(|(key, row)| row.get(picture).map(|cell| (cell.timestamp, key)))
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|(_, key)| key.clone())
            .collect())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    keyspace: String,
    /// family → hex row key → hex column name → cell
    families: BTreeMap<String, BTreeMap<String, BTreeMap<String, SnapshotCell>>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotCell {
    value: String,
    timestamp: i64,
}

fn unhex(field: &str, s: &str) -> Result<Vec<u8>, SnapshotError> {
    hex::decode(s).map_err(|e| SnapshotError::Corrupt(format!("{field} '{s}': {e}")))
}

impl Snapshot {
    fn from_families(keyspace: &str, families: &BTreeMap<String, Family>) -> Self {
        let families = families
            .iter()
            .map(|(name, family)| {
                let rows = family
                    .iter()
                    .map(|(key, row)| {
                        let cells = row
                            .iter()
                            .map(|(col, cell)| {
                                (
                                    hex::encode(col),
                                    SnapshotCell {
                                        value: hex::encode(&cell.value),
                                        timestamp: cell.timestamp.0,
                                    },
                                )
                            })
                            .collect();
                        (hex::encode(key), cells)
                    })
                    .collect();
                (name.clone(), rows)
            })
            .collect();
        Self {
            version: SNAPSHOT_VERSION,
            keyspace: keyspace.to_string(),
            families,
        }
    }

    fn into_families(self) -> Result<BTreeMap<String, Family>, SnapshotError> {
        let mut out = BTreeMap::new();
        for (name, rows) in self.families {
            let mut family = Family::new();
            for (key, cells) in rows {
                let mut row = Row::new();
                for (col, cell) in cells {
                    row.insert(
                        unhex("column", &col)?,
                        Cell {
                            value: unhex("value", &cell.value)?,
                            timestamp: WriteTimestamp(cell.timestamp),
                        },
                    );
                }
                family.insert(unhex("row key", &key)?, row);
            }
            out.insert(name, family);
        }
        Ok(out)
    }
}
