//! Batch processing of targets.
//!
//! Each target is derived in full (every year, ascending) before its records
//! are written, so a target that fails part-way commits nothing. Targets run
//! concurrently and never abort the batch: every outcome is collected into a
//! [`BatchSummary`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::career::{self, CareerResolver};
use crate::config::Config;
use crate::corpus::{Corpus, UpsertCounts};
use crate::engine::{Target, TimelineEngine};
use crate::error::{StoreError, StoreResult, TimelineError, TimelineResult};
use crate::harvest::{HarvestStats, Harvester};
use crate::models::{CollaborationKind, openalex_key};
use crate::sources::{AuthorStore, PublicationSource, RelationshipStore};

/// One line of the targets file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetEntry {
    /// Author ID (short key or OpenAlex URL).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Manually verified first publication year.
    #[serde(default)]
    pub first_pub_year: Option<i32>,
}

impl TargetEntry {
    /// The engine's view of this entry, with the ID normalised.
    #[must_use]
    pub fn target(&self) -> Target {
        Target::new(openalex_key(&self.id), self.name.clone())
    }
}

/// Read a JSON-lines targets file.
pub async fn load_targets(path: &Path) -> StoreResult<Vec<TargetEntry>> {
    let content = tokio::fs::read_to_string(path).await?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| serde_json::from_str(line).map_err(|source| StoreError::Corrupt { line: n + 1, source }))
        .collect()
}

/// First-year overrides from the targets file.
#[must_use]
pub fn overrides(entries: &[TargetEntry]) -> HashMap<String, i32> {
    entries
        .iter()
        .filter_map(|e| e.first_pub_year.map(|year| (openalex_key(&e.id), year)))
        .collect()
}

/// Per-target RNG: seeded from the batch seed and target ID when a seed is set.
#[must_use]
pub fn target_rng(seed: Option<u64>, target_id: &str) -> StdRng {
    use md5::{Digest, Md5};

    match seed {
        Some(seed) => {
            let digest = Md5::digest(target_id.as_bytes());
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&digest[..8]);
            StdRng::seed_from_u64(seed ^ u64::from_le_bytes(bytes))
        }
        None => StdRng::from_entropy(),
    }
}

/// Result of one successfully processed target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    /// Target author ID.
    pub target_id: String,
    /// Years with publications.
    pub years: usize,
    /// Records written to the store.
    pub records_written: usize,
    /// Records skipped because they were already stored.
    pub already_stored: usize,
    /// Author rows upserted.
    pub author_rows: usize,
    /// Written records per label.
    pub labels: BTreeMap<CollaborationKind, usize>,
}

/// A target that was skipped or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetIssue {
    /// Target author ID.
    pub target_id: String,
    /// Year being processed, when known.
    pub year: Option<i32>,
    /// Human-readable reason.
    pub reason: String,
    /// Transient API failure; rerunning the target may succeed.
    pub retryable: bool,
}

impl TargetIssue {
    fn from_error(target_id: &str, error: &TimelineError) -> Self {
        Self {
            target_id: target_id.to_string(),
            year: error.year(),
            reason: reason(error),
            retryable: error.is_retryable(),
        }
    }
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Targets processed in full.
    pub processed: Vec<TargetReport>,
    /// Targets skipped for upstream inconsistencies.
    pub skipped: Vec<TargetIssue>,
    /// Targets aborted by malformed records or store errors.
    pub failed: Vec<TargetIssue>,
}

impl BatchSummary {
    /// Record one target's outcome.
    pub fn record(&mut self, target_id: &str, outcome: TimelineResult<TargetReport>) {
        match outcome {
            Ok(report) => self.processed.push(report),
            Err(e) => {
                let issue = TargetIssue::from_error(target_id, &e);
                if e.is_skip() {
                    self.skipped.push(issue);
                } else {
                    self.failed.push(issue);
                }
            }
        }
    }

    /// Total targets seen.
    #[must_use]
    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len() + self.failed.len()
    }

    /// Records written across targets.
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.processed.iter().map(|r| r.records_written).sum()
    }

    /// Written records per label across targets.
    #[must_use]
    pub fn label_counts(&self) -> BTreeMap<CollaborationKind, usize> {
        let mut counts: BTreeMap<_, _> = CollaborationKind::ALL.iter().map(|k| (*k, 0)).collect();
        for report in &self.processed {
            for (kind, n) in &report.labels {
                *counts.entry(*kind).or_default() += n;
            }
        }
        counts
    }

    /// Sort every list by target ID.
    pub fn sort(&mut self) {
        self.processed.sort_by(|a, b| a.target_id.cmp(&b.target_id));
        self.skipped.sort_by(|a, b| a.target_id.cmp(&b.target_id));
        self.failed.sort_by(|a, b| a.target_id.cmp(&b.target_id));
    }
}

fn reason(error: &TimelineError) -> String {
    match error {
        TimelineError::Skipped { reason, .. } | TimelineError::Malformed { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

/// Everything needed to derive and persist timelines.
#[derive(Clone)]
pub struct Pipeline {
    source: Arc<dyn PublicationSource>,
    engine: TimelineEngine,
    careers: CareerResolver,
    relationships: Arc<dyn RelationshipStore>,
    authors: Arc<dyn AuthorStore>,
    concurrency: usize,
    seed: Option<u64>,
    max_author_age: i32,
}

impl Pipeline {
    /// Assemble a pipeline.
    #[must_use]
    pub fn new(
        source: Arc<dyn PublicationSource>,
        engine: TimelineEngine,
        careers: CareerResolver,
        relationships: Arc<dyn RelationshipStore>,
        authors: Arc<dyn AuthorStore>,
        config: &Config,
    ) -> Self {
        Self {
            source,
            engine,
            careers,
            relationships,
            authors,
            concurrency: config.concurrency.max(1),
            seed: config.seed,
            max_author_age: config.max_author_age,
        }
    }

    /// Derive, persist and report one target.
    pub async fn process_target<R: Rng + Send>(&self, target: &Target, rng: &mut R) -> TimelineResult<TargetReport> {
        tracing::info!(target_id = %target.id, name = %target.name, "Processing target");

        let span = self.careers.resolve(&target.id).await?;
        if span.is_absent() {
            return Err(TimelineError::skipped(&target.id, "no career span"));
        }

        let years: Vec<i32> = self
            .source
            .publication_years(&target.id)
            .await?
            .into_iter()
            .filter(|y| span.contains(*y))
            .collect();
        if years.is_empty() {
            return Err(TimelineError::skipped(&target.id, "no publications within career span"));
        }

        let existing = self.relationships.existing_keys(&target.id).await?;
        let mut run = self.engine.start(target.clone(), existing);
        for year in &years {
            let publications = self.source.publications(&target.id, *year).await?;
            run.process_year(*year, &publications, rng)?;
        }
        let timeline = run.finish();

        let written = self.relationships.persist(&timeline.records).await?;
        let rows = career::author_rows(&timeline, &self.careers, self.max_author_age).await?;
        self.authors.upsert(&rows).await?;

        let mut labels = BTreeMap::new();
        for record in &timeline.records {
            *labels.entry(record.kind).or_insert(0) += 1;
        }

        let report = TargetReport {
            target_id: target.id.clone(),
            years: timeline.years.len(),
            records_written: written,
            already_stored: timeline.already_stored() + (timeline.records.len() - written),
            author_rows: rows.len(),
            labels,
        };
        tracing::info!(
            target_id = %target.id,
            years = report.years,
            records = report.records_written,
            already_stored = report.already_stored,
            collaborators = timeline.state.collaborator_count(),
            "Finished target"
        );
        Ok(report)
    }

    /// Process every target, a few at a time.
    pub async fn run_batch(&self, targets: &[Target]) -> BatchSummary {
        let outcomes: Vec<_> = stream::iter(targets)
            .map(|target| async move {
                let mut rng = target_rng(self.seed, &target.id);
                let outcome = self.process_target(target, &mut rng).await;
                log_outcome(target, &outcome);
                (target.id.clone(), outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summary = BatchSummary::default();
        for (target_id, outcome) in outcomes {
            summary.record(&target_id, outcome);
        }
        summary.sort();
        summary
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("engine", &self.engine)
            .field("careers", &self.careers)
            .field("concurrency", &self.concurrency)
            .field("seed", &self.seed)
            .finish()
    }
}

fn log_outcome(target: &Target, outcome: &TimelineResult<TargetReport>) {
    match outcome {
        Ok(_) => {}
        Err(e) if e.is_skip() => tracing::warn!(target_id = %target.id, reason = %e, "Target skipped"),
        Err(e) => tracing::error!(
            target_id = %target.id,
            year = ?e.year(),
            retryable = e.is_retryable(),
            retry_after = ?e.retry_after(),
            error = %e,
            "Target aborted"
        ),
    }
}

/// Outcome of the harvest phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HarvestSummary {
    /// Targets fetched from the API.
    pub harvested: usize,
    /// Targets already covered by the corpus.
    pub covered: usize,
    /// Works accepted into the corpus.
    pub accepted: usize,
    /// Publications newly inserted.
    pub inserted: usize,
    /// Publications patched with missing metadata.
    pub coalesced: usize,
    /// Targets that could not be harvested.
    pub failed: Vec<TargetIssue>,
}

impl HarvestSummary {
    fn add(&mut self, stats: &HarvestStats, counts: UpsertCounts) {
        self.harvested += 1;
        self.accepted += stats.accepted;
        self.inserted += counts.inserted;
        self.coalesced += counts.coalesced;
    }
}

/// Fetch every target not yet covered by `corpus` and merge the results into it.
pub async fn harvest_targets(
    harvester: &Harvester,
    careers: &CareerResolver,
    corpus: &mut Corpus,
    targets: &[Target],
    config: &Config,
) -> HarvestSummary {
    let snapshot: &Corpus = corpus;
    let fetched: Vec<_> = stream::iter(targets)
        .map(|target| async move {
            let span = match careers.resolve(&target.id).await {
                Ok(span) => span,
                Err(e) => return (target, Err(e)),
            };
            if snapshot.covers(&target.id, span) {
                tracing::debug!(target_id = %target.id, "Corpus already covers career span");
                return (target, Ok(None));
            }
            let mut rng = target_rng(config.seed, &target.id);
            (target, harvester.harvest(target, span, &mut rng).await.map(Some))
        })
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

    let mut summary = HarvestSummary::default();
    for (target, result) in fetched {
        match result {
            Ok(Some((publications, stats))) => {
                let counts = corpus.extend(publications);
                summary.add(&stats, counts);
            }
            Ok(None) => summary.covered += 1,
            Err(e) => {
                tracing::warn!(
                    target_id = %target.id,
                    retryable = e.is_retryable(),
                    retry_after = ?e.retry_after(),
                    error = %e,
                    "Harvest failed"
                );
                summary.failed.push(TargetIssue::from_error(&target.id, &e));
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn test_target_entry_parsing() {
        let entry: TargetEntry =
            serde_json::from_str(r#"{"id":"https://openalex.org/a5","name":"Ada","firstPubYear":1999}"#).unwrap();
        assert_eq!(entry.target(), Target::new("A5", "Ada"));
        assert_eq!(overrides(&[entry]), HashMap::from([("A5".to_string(), 1999)]));
    }

    #[test]
    fn test_target_rng_is_deterministic_per_target() {
        let a: u64 = target_rng(Some(7), "A1").r#gen();
        let b: u64 = target_rng(Some(7), "A1").r#gen();
        let c: u64 = target_rng(Some(7), "A2").r#gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_summary_taxonomy() {
        let mut summary = BatchSummary::default();
        summary.record("A", Ok(TargetReport { target_id: "A".into(), records_written: 3, ..Default::default() }));
        summary.record("B", Err(TimelineError::skipped("B", "no career span")));
        summary.record("C", Err(TimelineError::malformed("C", 2019, "bad record")));
        summary.record("D", Err(TimelineError::from(ClientError::rate_limited(30))));

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.records_written(), 3);
        assert_eq!(summary.skipped[0].reason, "no career span");
        assert_eq!(summary.failed[0].year, Some(2019));
        assert!(!summary.failed[0].retryable);
        assert!(summary.failed[1].retryable);
        assert_eq!(summary.label_counts().len(), 3);
    }
}
