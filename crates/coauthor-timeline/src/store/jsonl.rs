//! Append-only JSON-lines relationship store.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::keys_for;
use crate::error::{StoreError, StoreResult};
use crate::models::{CoauthorRelationship, RelationshipKey};
use crate::sources::RelationshipStore;

/// Relationship store backed by a JSON-lines file.
///
/// The file is read once on open; inserts append one line per new record.
#[derive(Debug)]
pub struct JsonlRelationshipStore {
    path: PathBuf,
    records: Mutex<BTreeMap<RelationshipKey, CoauthorRelationship>>,
}

impl JsonlRelationshipStore {
    /// Open the store at `path`, creating it on first insert.
    ///
    /// A repeated key in the file keeps its first occurrence.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut records = BTreeMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                for (n, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let record: CoauthorRelationship =
                        serde_json::from_str(line).map_err(|source| StoreError::Corrupt { line: n + 1, source })?;
                    records.entry(record.key()).or_insert(record);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(path = %path.display(), records = records.len(), "Opened relationship store");
        Ok(Self { path, records: Mutex::new(records) })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every stored record, in key order.
    pub async fn records(&self) -> Vec<CoauthorRelationship> {
        self.records.lock().await.values().cloned().collect()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// True when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl RelationshipStore for JsonlRelationshipStore {
    async fn existing_keys(&self, target_id: &str) -> StoreResult<HashSet<RelationshipKey>> {
        Ok(keys_for(&*self.records.lock().await, target_id))
    }

    async fn persist(&self, records: &[CoauthorRelationship]) -> StoreResult<usize> {
        let mut stored = self.records.lock().await;

        let mut batch = HashSet::new();
        let fresh: Vec<&CoauthorRelationship> = records
            .iter()
            .filter(|r| {
                let key = r.key();
                !stored.contains_key(&key) && batch.insert(key)
            })
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        let mut buf = Vec::new();
        for record in &fresh {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(&buf).await?;
        file.flush().await?;

        // Memory only reflects what reached the file.
        for record in &fresh {
            stored.insert(record.key(), (*record).clone());
        }
        Ok(fresh.len())
    }
}
