//! Author-year table.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::models::{AuthorYear, CareerSpan};
use crate::sources::AuthorStore;

/// Author rows keyed by `(author_id, year)`, optionally backed by a JSON-lines file.
///
/// The file is rewritten in full by [`AuthorTable::save`].
#[derive(Debug, Default)]
pub struct AuthorTable {
    path: Option<PathBuf>,
    rows: Mutex<BTreeMap<(String, i32), AuthorYear>>,
}

impl AuthorTable {
    /// Create an empty, memory-only table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the table from `path`; a missing file yields an empty table.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut rows = BTreeMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                for (n, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let row: AuthorYear =
                        serde_json::from_str(line).map_err(|source| StoreError::Corrupt { line: n + 1, source })?;
                    merge(&mut rows, row);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(Self { path: Some(path), rows: Mutex::new(rows) })
    }

    /// Write every row back to the backing file, if any.
    pub async fn save(&self) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut buf = Vec::new();
        for row in self.rows.lock().await.values() {
            serde_json::to_writer(&mut buf, row)?;
            buf.push(b'\n');
        }

        let tmp = path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, &buf).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Snapshot of every row, in key order.
    pub async fn rows(&self) -> Vec<AuthorYear> {
        self.rows.lock().await.values().cloned().collect()
    }

    /// Row for one author and year.
    pub async fn get(&self, author_id: &str, year: i32) -> Option<AuthorYear> {
        self.rows.lock().await.get(&(author_id.to_string(), year)).cloned()
    }

    /// Number of rows.
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    /// True when the table is empty.
    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

/// Coalescing upsert of one row.
///
/// A new non-null institution replaces the stored one; the earliest known
/// first year wins; the age is recomputed and a row whose age turns negative
/// is dropped.
fn merge(rows: &mut BTreeMap<(String, i32), AuthorYear>, row: AuthorYear) {
    if row.has_negative_age() {
        return;
    }
    let key = row.key();
    let Some(stored) = rows.get_mut(&key) else {
        rows.insert(key, row);
        return;
    };

    stored.display_name = row.display_name;
    if row.institution.is_some() {
        stored.institution = row.institution;
    }
    if row.last_pub_year.is_some() {
        stored.last_pub_year = stored.last_pub_year.max(row.last_pub_year);
    }
    let first = match (stored.first_pub_year, row.first_pub_year) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    if let Some(first) = first {
        stored.set_first_year(first);
    }
    if stored.has_negative_age() {
        rows.remove(&key);
    }
}

#[async_trait::async_trait]
impl AuthorStore for AuthorTable {
    async fn upsert(&self, rows: &[AuthorYear]) -> StoreResult<()> {
        let mut stored = self.rows.lock().await;
        for row in rows {
            merge(&mut stored, row.clone());
        }
        Ok(())
    }

    async fn correct_first_year(&self, author_id: &str, first_year: i32) -> StoreResult<usize> {
        let mut stored = self.rows.lock().await;
        let mut removed = 0;
        stored.retain(|(id, _), row| {
            if id != author_id {
                return true;
            }
            row.set_first_year(first_year);
            let keep = !row.has_negative_age();
            if !keep {
                removed += 1;
            }
            keep
        });
        let remaining = stored.keys().filter(|(id, _)| id == author_id).count();
        tracing::info!(author_id, first_year, removed, remaining, "Corrected first publication year");
        Ok(remaining)
    }

    async fn known_spans(&self) -> StoreResult<HashMap<String, CareerSpan>> {
        let stored = self.rows.lock().await;
        let mut spans = HashMap::new();
        for row in stored.values() {
            if let (Some(first), Some(last)) = (row.first_pub_year, row.last_pub_year) {
                spans.entry(row.author_id.clone()).or_insert(CareerSpan::new(first, last));
            }
        }
        Ok(spans)
    }
}
