use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::traits::{LedgerStore, Versioned};

/// In-memory, HashMap-based ledger store.
///
/// Intended for tests, embedding, and the CLI (which persists it as a JSON
/// snapshot between runs). Values are cloned on read and write.
pub struct InMemoryLedgerStore {
    entries: RwLock<HashMap<String, Versioned>>,
}

/// On-disk form of a store. Values are UTF-8 documents written by the codec.
#[derive(Default, Serialize, Deserialize)]
struct Snapshot {
    entries: BTreeMap<String, SnapshotEntry>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    version: u64,
    value: String,
}

impl InMemoryLedgerStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or_default()
    }

    /// Returns `true` if no key has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of all keys.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Load a store from a snapshot file. A missing file yields an empty store.
    pub fn load(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no snapshot; starting empty");
            return Ok(Self::new());
        }
        let raw = std::fs::read(path)?;
        let snapshot: Snapshot =
            serde_json::from_slice(&raw).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let entries = snapshot
            .entries
            .into_iter()
            .map(|(key, entry)| {
                (
                    key,
                    Versioned {
                        version: entry.version,
                        value: entry.value.into_bytes(),
                    },
                )
            })
            .collect();
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    /// Write the store to `path`, replacing any existing file atomically.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let snapshot = {
            let map = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
            let mut entries = BTreeMap::new();
            for (key, versioned) in map.iter() {
                let value = String::from_utf8(versioned.value.clone()).map_err(|e| {
                    StoreError::Serialization(format!("value at {key} is not UTF-8: {e}"))
                })?;
                entries.insert(
                    key.clone(),
                    SnapshotEntry {
                        version: versioned.version,
                        value,
                    },
                );
            }
            Snapshot { entries }
        };

        let encoded = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&encoded)?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        tracing::debug!(path = %path.display(), keys = snapshot.entries.len(), "snapshot saved");
        Ok(())
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut map = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        let version = map.get(key).map(|v| v.version + 1).unwrap_or(1);
        map.insert(
            key.to_string(),
            Versioned {
                version,
                value: value.to_vec(),
            },
        );
        Ok(())
    }

    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>> {
        let map = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(key).cloned())
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &[u8],
    ) -> StoreResult<bool> {
        let mut map = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        let current = map.get(key).map(|v| v.version);
        if current != expected_version {
            return Ok(false);
        }
        map.insert(
            key.to_string(),
            Versioned {
                version: current.map(|v| v + 1).unwrap_or(1),
                value: value.to_vec(),
            },
        );
        Ok(true)
    }

    fn compare_and_delete(&self, key: &str, expected_version: u64) -> StoreResult<bool> {
        let mut map = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        if map.get(key).map(|v| v.version) != Some(expected_version) {
            return Ok(false);
        }
        map.remove(key);
        Ok(true)
    }
}

impl std::fmt::Debug for InMemoryLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedgerStore")
            .field("key_count", &self.len())
            .finish()
    }
}
