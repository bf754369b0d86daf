//! Relationship and author stores.
//!
//! Relationship records are insert-if-absent on their natural key; a
//! colliding insert is a silent no-op. Each store serialises inserts behind a
//! lock so concurrent targets can persist safely.

mod authors;
mod jsonl;

pub use authors::AuthorTable;
pub use jsonl::JsonlRelationshipStore;

use std::collections::{BTreeMap, HashSet};

use tokio::sync::Mutex;

use crate::error::StoreResult;
use crate::models::{CoauthorRelationship, RelationshipKey};
use crate::sources::RelationshipStore;

/// Relationship store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRelationshipStore {
    records: Mutex<BTreeMap<RelationshipKey, CoauthorRelationship>>,
}

impl InMemoryRelationshipStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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
impl RelationshipStore for InMemoryRelationshipStore {
    async fn existing_keys(&self, target_id: &str) -> StoreResult<HashSet<RelationshipKey>> {
        Ok(keys_for(&*self.records.lock().await, target_id))
    }

    async fn persist(&self, records: &[CoauthorRelationship]) -> StoreResult<usize> {
        let mut stored = self.records.lock().await;
        Ok(insert_absent(&mut stored, records).len())
    }
}

/// Keys stored for one target.
fn keys_for(records: &BTreeMap<RelationshipKey, CoauthorRelationship>, target_id: &str) -> HashSet<RelationshipKey> {
    records.keys().filter(|k| k.target_id == target_id).cloned().collect()
}

/// Insert records whose key is absent; returns the ones inserted.
fn insert_absent<'r>(
    stored: &mut BTreeMap<RelationshipKey, CoauthorRelationship>,
    records: &'r [CoauthorRelationship],
) -> Vec<&'r CoauthorRelationship> {
    let mut inserted = Vec::new();
    for record in records {
        let key = record.key();
        if stored.contains_key(&key) {
            continue;
        }
        stored.insert(key, record.clone());
        inserted.push(record);
    }
    inserted
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::CollaborationKind;

    fn record(target: &str, coauthor: &str, year: i32, count: u32) -> CoauthorRelationship {
        CoauthorRelationship {
            target_id: target.into(),
            date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            year,
            coauthor_id: coauthor.into(),
            coauthor_name: coauthor.into(),
            kind: CollaborationKind::NewCollaboration,
            yearly_count: count,
            all_time_count: count,
            shared_institution: None,
            coauthor_institution: None,
        }
    }

    #[tokio::test]
    async fn test_collision_is_noop() {
        let store = InMemoryRelationshipStore::new();
        assert_eq!(store.persist(&[record("A", "B", 2018, 1)]).await.unwrap(), 1);
        assert_eq!(store.persist(&[record("A", "B", 2018, 9), record("A", "C", 2018, 1)]).await.unwrap(), 1);

        let records = store.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].yearly_count, 1, "first write wins");
    }

    #[tokio::test]
    async fn test_existing_keys_per_target() {
        let store = InMemoryRelationshipStore::new();
        store.persist(&[record("A", "B", 2018, 1), record("Z", "B", 2018, 1)]).await.unwrap();

        let keys = store.existing_keys("A").await.unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys.contains(&RelationshipKey::new("A", "B", 2018)));
    }
}
