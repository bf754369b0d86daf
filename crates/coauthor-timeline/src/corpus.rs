//! In-memory publication corpus.
//!
//! The corpus holds every harvested publication, keyed by target and work. It
//! serves as the [`PublicationSource`] for derivation, as the last-resort
//! [`CareerSpanResolver`], and produces a [`CorpusIndex`]: the read-only person
//! directory and coauthorship graph the engine consults.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::engine::MentionTally;
use crate::error::{StoreError, StoreResult, TimelineResult};
use crate::models::{CareerSpan, Publication};
use crate::sources::{CareerSpanResolver, CollaborationGraph, PersonDirectory, PersonYear, PublicationSource};

/// Result of adding one publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// New (target, work) pair.
    Inserted,
    /// Existing entry had missing metadata filled.
    Coalesced,
    /// Existing entry already complete.
    Unchanged,
}

/// Counts from a batch of upserts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertCounts {
    /// New entries.
    pub inserted: usize,
    /// Patched entries.
    pub coalesced: usize,
    /// Untouched entries.
    pub unchanged: usize,
}

/// Publications of all targets, keyed by target ID then work ID.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    publications: BTreeMap<String, BTreeMap<String, Publication>>,
}

impl Corpus {
    /// Create an empty corpus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total publications across targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.publications.values().map(BTreeMap::len).sum()
    }

    /// True when nothing has been harvested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.publications.values().all(BTreeMap::is_empty)
    }

    /// Target IDs present in the corpus.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.publications.keys().map(String::as_str)
    }

    /// Insert a publication, or fill missing metadata on the stored copy.
    pub fn upsert(&mut self, publication: Publication) -> Upsert {
        let works = self.publications.entry(publication.author_id.clone()).or_default();
        match works.get_mut(&publication.work_id) {
            Some(stored) => {
                if stored.coalesce(&publication) {
                    Upsert::Coalesced
                } else {
                    Upsert::Unchanged
                }
            }
            None => {
                works.insert(publication.work_id.clone(), publication);
                Upsert::Inserted
            }
        }
    }

    /// Upsert many publications.
    pub fn extend(&mut self, publications: impl IntoIterator<Item = Publication>) -> UpsertCounts {
        let mut counts = UpsertCounts::default();
        for publication in publications {
            match self.upsert(publication) {
                Upsert::Inserted => counts.inserted += 1,
                Upsert::Coalesced => counts.coalesced += 1,
                Upsert::Unchanged => counts.unchanged += 1,
            }
        }
        counts
    }

    /// Every publication of `author_id`.
    pub fn publications_of(&self, author_id: &str) -> impl Iterator<Item = &Publication> {
        self.publications.get(author_id).into_iter().flat_map(BTreeMap::values)
    }

    /// Years with at least one publication of `author_id`.
    #[must_use]
    pub fn years_of(&self, author_id: &str) -> BTreeSet<i32> {
        self.publications_of(author_id).map(|p| p.year).collect()
    }

    /// Publications of `author_id` in `year`, in work ID order.
    #[must_use]
    pub fn publications_in_year(&self, author_id: &str, year: i32) -> Vec<Publication> {
        self.publications_of(author_id).filter(|p| p.year == year).cloned().collect()
    }

    /// Earliest and latest year in the corpus for `author_id`.
    #[must_use]
    pub fn span_of(&self, author_id: &str) -> CareerSpan {
        let years = self.years_of(author_id);
        CareerSpan { first_year: years.first().copied(), last_year: years.last().copied() }
    }

    /// True when the corpus already holds `author_id`'s works for the whole span.
    ///
    /// An unknown first year only requires the last year to be held.
    #[must_use]
    pub fn covers(&self, author_id: &str, span: CareerSpan) -> bool {
        let Some(last) = span.last_year else {
            return false;
        };
        let held = self.span_of(author_id);
        matches!(
            (held.first_year, held.last_year),
            (Some(lo), Some(hi)) if span.first_year.is_none_or(|first| lo <= first) && hi >= last
        )
    }

    /// Build the person directory and coauthorship graph.
    ///
    /// A work harvested for several targets is counted once.
    #[must_use]
    pub fn index(&self) -> CorpusIndex {
        let mut index = CorpusIndex::default();
        let mut seen_works = HashSet::new();

        for publication in self.publications.values().flat_map(BTreeMap::values) {
            if !seen_works.insert(publication.work_id.as_str()) {
                continue;
            }
            let Some(authors) = &publication.authors else {
                continue;
            };
            let year = publication.year;

            let mut ids_on_work = BTreeSet::new();
            for contributor in authors {
                let Some(id) = &contributor.id else {
                    continue;
                };
                let institutions = index.institutions.entry((id.clone(), year)).or_default();
                for institution in &contributor.institutions {
                    institutions.add(institution.clone());
                }
                index.names.entry((contributor.name.clone(), year)).or_default().add(id.clone());
                ids_on_work.insert(id.clone());
            }

            for id in &ids_on_work {
                let peers = index.coauthors.entry((id.clone(), year)).or_default();
                peers.extend(ids_on_work.iter().filter(|other| *other != id).cloned());
            }
        }

        tracing::debug!(
            people = index.institutions.len(),
            names = index.names.len(),
            "Built corpus index"
        );
        index
    }

    /// Load a JSON-lines snapshot; a missing file yields an empty corpus.
    pub async fn load(path: &Path) -> StoreResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };

        let mut corpus = Self::new();
        for (n, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let publication: Publication =
                serde_json::from_str(line).map_err(|source| StoreError::Corrupt { line: n + 1, source })?;
            corpus.upsert(publication);
        }
        Ok(corpus)
    }

    /// Write the corpus as a JSON-lines snapshot, replacing `path`.
    pub async fn save(&self, path: &Path) -> StoreResult<()> {
        let mut buf = Vec::new();
        for publication in self.publications.values().flat_map(BTreeMap::values) {
            serde_json::to_writer(&mut buf, publication)?;
            buf.push(b'\n');
        }

        let tmp = path.with_extension("jsonl.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&buf).await?;
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PublicationSource for Corpus {
    async fn publication_years(&self, author_id: &str) -> TimelineResult<BTreeSet<i32>> {
        Ok(self.years_of(author_id))
    }

    async fn publications(&self, author_id: &str, year: i32) -> TimelineResult<Vec<Publication>> {
        Ok(self.publications_in_year(author_id, year))
    }
}

#[async_trait::async_trait]
impl CareerSpanResolver for Corpus {
    async fn career_span(&self, author_id: &str) -> TimelineResult<CareerSpan> {
        Ok(self.span_of(author_id))
    }
}

/// Read-only lookups derived from a [`Corpus`].
#[derive(Debug, Clone, Default)]
pub struct CorpusIndex {
    institutions: HashMap<(String, i32), MentionTally<String>>,
    names: HashMap<(String, i32), MentionTally<String>>,
    coauthors: HashMap<(String, i32), BTreeSet<String>>,
}

impl CorpusIndex {
    /// Majority institution of `author_id` in `year`.
    #[must_use]
    pub fn institution(&self, author_id: &str, year: i32) -> Option<&String> {
        self.institutions.get(&(author_id.to_string(), year))?.majority()
    }

    /// ID most often listed under `name` in `year`.
    #[must_use]
    pub fn id_for_name(&self, name: &str, year: i32) -> Option<&String> {
        self.names.get(&(name.to_string(), year))?.majority()
    }

    fn known(&self, author_id: &str, year: i32) -> bool {
        self.institutions.contains_key(&(author_id.to_string(), year))
    }
}

impl PersonDirectory for CorpusIndex {
    fn person_year(&self, name: &str, id: Option<&str>, year: i32) -> Option<PersonYear> {
        let author_id = match id {
            Some(id) if self.known(id, year) => id.to_string(),
            _ => self.id_for_name(name, year)?.clone(),
        };
        let institution = self.institution(&author_id, year).cloned();
        Some(PersonYear { author_id, institution })
    }
}

impl CollaborationGraph for CorpusIndex {
    fn coauthors_in_year(&self, author_id: &str, year: i32) -> Vec<String> {
        self.coauthors
            .get(&(author_id.to_string(), year))
            .map(|peers| peers.iter().cloned().collect())
            .unwrap_or_default()
    }
}
