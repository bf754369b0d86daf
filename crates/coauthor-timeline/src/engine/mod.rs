//! Coauthor timeline engine.
//!
//! Walks a target's publication years in ascending order, carrying
//! [`CollaborationState`] across years, and emits one classified
//! [`CoauthorRelationship`] per (target, coauthor, year). The engine performs
//! no I/O: publications are handed to it year by year and lookups go through
//! the injected read-only [`PersonDirectory`] and [`CollaborationGraph`].
//!
//! # Example
//!
//! ```no_run
//! use std::collections::{BTreeMap, HashSet};
//! use std::sync::Arc;
//!
//! use coauthor_timeline::corpus::Corpus;
//! use coauthor_timeline::engine::{Target, TimelineEngine};
//! use rand::SeedableRng;
//!
//! let corpus = Corpus::new();
//! let index = Arc::new(corpus.index());
//! let engine = TimelineEngine::new(index.clone(), index);
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let timeline = engine
//!     .derive(Target::new("A1", "Ada"), &BTreeMap::new(), HashSet::new(), &mut rng)
//!     .unwrap();
//! assert!(timeline.records.is_empty());
//! ```

mod state;
mod tally;
mod year;

pub use state::CollaborationState;
pub use tally::MentionTally;
pub use year::{CoauthorYear, YearAggregate, aggregate_year};

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use rand::Rng;

use crate::dates;
use crate::error::{TimelineError, TimelineResult};
use crate::models::{CoauthorRelationship, Publication, RelationshipKey};
use crate::sources::{CollaborationGraph, PersonDirectory};

/// The author whose timeline is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Stable author ID.
    pub id: String,
    /// Display name, used to recognise the target on papers without IDs.
    pub name: String,
}

impl Target {
    /// Create a target.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

/// Statistics for one processed year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearSummary {
    /// Calendar year.
    pub year: i32,
    /// Papers read.
    pub papers: usize,
    /// Distinct coauthors classified.
    pub coauthors: usize,
    /// Records emitted (excluding ones already stored).
    pub emitted: usize,
    /// Records skipped because the store already has their key.
    pub already_stored: usize,
    /// Coauthor mentions the directory could not resolve.
    pub unresolved_mentions: usize,
}

/// Result of deriving one target's timeline.
#[derive(Debug, Clone)]
pub struct TargetTimeline {
    /// The target.
    pub target: Target,
    /// New relationship records, in year order.
    pub records: Vec<CoauthorRelationship>,
    /// Per-year statistics for years with publications.
    pub years: Vec<YearSummary>,
    /// The target's majority institution per processed year.
    pub target_institutions: BTreeMap<i32, Option<String>>,
    /// Final cross-year state.
    pub state: CollaborationState,
}

impl TargetTimeline {
    /// Records skipped because they were already stored.
    #[must_use]
    pub fn already_stored(&self) -> usize {
        self.years.iter().map(|y| y.already_stored).sum()
    }
}

/// Stateless engine shared by all targets.
#[derive(Clone)]
pub struct TimelineEngine {
    directory: Arc<dyn PersonDirectory>,
    graph: Arc<dyn CollaborationGraph>,
    shuffle_dates: bool,
}

impl TimelineEngine {
    /// Create an engine over the given read-only lookups.
    #[must_use]
    pub fn new(directory: Arc<dyn PersonDirectory>, graph: Arc<dyn CollaborationGraph>) -> Self {
        Self { directory, graph, shuffle_dates: false }
    }

    /// Randomise paper days within their month before sampling record dates.
    #[must_use]
    pub fn with_date_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle_dates = shuffle;
        self
    }

    /// Start a run for one target.
    ///
    /// `existing` holds the keys already persisted for this target; matching
    /// records are computed (so state advances identically) but not emitted.
    #[must_use]
    pub fn start(&self, target: Target, existing: HashSet<RelationshipKey>) -> TimelineRun<'_> {
        TimelineRun {
            engine: self,
            target,
            existing,
            state: CollaborationState::new(),
            records: Vec::new(),
            years: Vec::new(),
            target_institutions: BTreeMap::new(),
            last_year: None,
        }
    }

    /// Derive a whole timeline from publications grouped by year.
    pub fn derive<R: Rng + ?Sized>(
        &self,
        target: Target,
        publications: &BTreeMap<i32, Vec<Publication>>,
        existing: HashSet<RelationshipKey>,
        rng: &mut R,
    ) -> TimelineResult<TargetTimeline> {
        let mut run = self.start(target, existing);
        for (year, papers) in publications {
            run.process_year(*year, papers, rng)?;
        }
        Ok(run.finish())
    }
}

impl std::fmt::Debug for TimelineEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineEngine").field("shuffle_dates", &self.shuffle_dates).finish()
    }
}

/// An in-flight derivation for one target.
///
/// Dropping a run discards its state; nothing is committed until the caller
/// persists the records returned by [`TimelineRun::finish`].
pub struct TimelineRun<'e> {
    engine: &'e TimelineEngine,
    target: Target,
    existing: HashSet<RelationshipKey>,
    state: CollaborationState,
    records: Vec<CoauthorRelationship>,
    years: Vec<YearSummary>,
    target_institutions: BTreeMap<i32, Option<String>>,
    last_year: Option<i32>,
}

impl TimelineRun<'_> {
    /// The target of this run.
    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    /// Current cross-year state.
    #[must_use]
    pub const fn state(&self) -> &CollaborationState {
        &self.state
    }

    /// Process one year. Years must be strictly ascending.
    ///
    /// A year without publications is skipped and leaves the state untouched.
    pub fn process_year<R: Rng + ?Sized>(
        &mut self,
        year: i32,
        publications: &[Publication],
        rng: &mut R,
    ) -> TimelineResult<Option<YearSummary>> {
        if let Some(last) = self.last_year {
            if year <= last {
                return Err(TimelineError::malformed(
                    &self.target.id,
                    year,
                    format!("years out of order (after {last})"),
                ));
            }
        }
        if publications.is_empty() {
            return Ok(None);
        }

        let agg = aggregate_year(
            &self.target,
            year,
            publications,
            self.engine.directory.as_ref(),
            self.engine.shuffle_dates,
            rng,
        )?;
        self.last_year = Some(year);

        self.state.advance_introductions(self.engine.graph.as_ref(), &self.target.id, year);

        let target_institution = agg.target_institution().cloned();
        let mut summary = YearSummary {
            year,
            papers: agg.papers,
            coauthors: agg.coauthors.len(),
            unresolved_mentions: agg.unresolved_mentions,
            ..YearSummary::default()
        };

        for (coauthor_id, coauthor) in &agg.coauthors {
            let kind = self.state.classify(coauthor_id);
            let all_time_count = self.state.record_appearances(coauthor_id, coauthor.count);
            let coauthor_institution = coauthor.institutions.majority().cloned();
            let shared_institution = match (&coauthor_institution, &target_institution) {
                (Some(theirs), Some(ours)) if theirs == ours => Some(theirs.clone()),
                _ => None,
            };
            let date = dates::representative_date(&agg.dates, year, rng);

            let record = CoauthorRelationship {
                target_id: self.target.id.clone(),
                date,
                year,
                coauthor_id: coauthor_id.clone(),
                coauthor_name: coauthor.name.clone(),
                kind,
                yearly_count: coauthor.count,
                all_time_count,
                shared_institution,
                coauthor_institution,
            };

            if self.existing.contains(&record.key()) {
                summary.already_stored += 1;
            } else {
                summary.emitted += 1;
                self.records.push(record);
            }
        }

        self.state.finish_year(agg.coauthors.keys().map(String::as_str));
        self.target_institutions.insert(year, target_institution);

        tracing::debug!(
            target_id = %self.target.id,
            year,
            papers = summary.papers,
            coauthors = summary.coauthors,
            emitted = summary.emitted,
            already_stored = summary.already_stored,
            unresolved = summary.unresolved_mentions,
            "Processed year"
        );

        self.years.push(summary.clone());
        Ok(Some(summary))
    }

    /// Close the run and hand back its records.
    #[must_use]
    pub fn finish(self) -> TargetTimeline {
        TargetTimeline {
            target: self.target,
            records: self.records,
            years: self.years,
            target_institutions: self.target_institutions,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::models::{CollaborationKind, Contributor};
    use crate::sources::{EmptyGraph, PersonYear};

    /// Resolves by name; institution per (name, year).
    #[derive(Default)]
    struct MapDirectory {
        people: HashMap<String, String>,
        institutions: HashMap<(String, i32), String>,
    }

    impl MapDirectory {
        fn person(mut self, name: &str, id: &str) -> Self {
            self.people.insert(name.to_string(), id.to_string());
            self
        }

        fn works_at(mut self, name: &str, year: i32, institution: &str) -> Self {
            self.institutions.insert((name.to_string(), year), institution.to_string());
            self
        }
    }

    impl PersonDirectory for MapDirectory {
        fn person_year(&self, name: &str, _id: Option<&str>, year: i32) -> Option<PersonYear> {
            let author_id = self.people.get(name)?.clone();
            let institution = self.institutions.get(&(name.to_string(), year)).cloned();
            Some(PersonYear { author_id, institution })
        }
    }

    struct EdgeGraph(Vec<(&'static str, i32, &'static str)>);

    impl CollaborationGraph for EdgeGraph {
        fn coauthors_in_year(&self, author_id: &str, year: i32) -> Vec<String> {
            self.0
                .iter()
                .filter(|(a, y, _)| *a == author_id && *y == year)
                .map(|(_, _, b)| (*b).to_string())
                .collect()
        }
    }

    fn paper(work: &str, year: i32, coauthors: &[&str]) -> Publication {
        let mut p = Publication::new("A", work, year).with_author(Contributor::new("Alice", Some("A")));
        for name in coauthors {
            p = p.with_author(Contributor::new(*name, None));
        }
        p
    }

    fn directory() -> MapDirectory {
        MapDirectory::default().person("Bob", "B").person("Carol", "C").person("Dan", "D")
    }

    fn engine(directory: MapDirectory) -> TimelineEngine {
        TimelineEngine::new(Arc::new(directory), Arc::new(EmptyGraph))
    }

    fn by_year(papers: Vec<Publication>) -> BTreeMap<i32, Vec<Publication>> {
        let mut map: BTreeMap<i32, Vec<Publication>> = BTreeMap::new();
        for p in papers {
            map.entry(p.year).or_default().push(p);
        }
        map
    }

    fn find<'a>(records: &'a [CoauthorRelationship], coauthor: &str, year: i32) -> &'a CoauthorRelationship {
        records
            .iter()
            .find(|r| r.coauthor_id == coauthor && r.year == year)
            .unwrap_or_else(|| panic!("no record for {coauthor} in {year}"))
    }

    #[test]
    fn test_two_year_classification() {
        let papers = by_year(vec![
            paper("W1", 2018, &["Bob"]),
            paper("W2", 2019, &["Bob", "Carol"]),
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let timeline = engine(directory())
            .derive(Target::new("A", "Alice"), &papers, HashSet::new(), &mut rng)
            .unwrap();

        assert_eq!(timeline.records.len(), 3);

        let b18 = find(&timeline.records, "B", 2018);
        assert_eq!(b18.kind, CollaborationKind::NewCollaboration);
        assert_eq!((b18.yearly_count, b18.all_time_count), (1, 1));

        let b19 = find(&timeline.records, "B", 2019);
        assert_eq!(b19.kind, CollaborationKind::ExistingCollaboration);
        assert_eq!((b19.yearly_count, b19.all_time_count), (1, 2));

        let c19 = find(&timeline.records, "C", 2019);
        assert_eq!(c19.kind, CollaborationKind::NewCollaboration);
        assert_eq!((c19.yearly_count, c19.all_time_count), (1, 1));
    }

    #[test]
    fn test_counts_accumulate_within_year() {
        let papers = by_year(vec![
            paper("W1", 2018, &["Bob"]),
            paper("W2", 2018, &["Bob"]),
            paper("W3", 2018, &["Bob", "Bob"]),
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let timeline = engine(directory())
            .derive(Target::new("A", "Alice"), &papers, HashSet::new(), &mut rng)
            .unwrap();

        let b = find(&timeline.records, "B", 2018);
        assert_eq!(b.yearly_count, 3, "duplicate mention on one paper counts once");
        assert_eq!(b.all_time_count, 3);
        assert_eq!(b.kind, CollaborationKind::NewCollaboration);
    }

    #[test]
    fn test_unresolvable_coauthor_is_dropped() {
        let papers = by_year(vec![paper("W1", 2018, &["Bob", "Nobody"])]);
        let mut rng = StdRng::seed_from_u64(7);
        let timeline = engine(directory())
            .derive(Target::new("A", "Alice"), &papers, HashSet::new(), &mut rng)
            .unwrap();

        assert_eq!(timeline.records.len(), 1);
        assert_eq!(timeline.records[0].coauthor_id, "B");
        assert_eq!(timeline.years[0].unresolved_mentions, 1);
    }

    #[test]
    fn test_gap_years_keep_state() {
        let papers = by_year(vec![paper("W1", 2015, &["Bob"]), paper("W2", 2020, &["Bob"])]);
        let mut rng = StdRng::seed_from_u64(7);
        let timeline = engine(directory())
            .derive(Target::new("A", "Alice"), &papers, HashSet::new(), &mut rng)
            .unwrap();

        assert_eq!(timeline.records.len(), 2);
        let b20 = find(&timeline.records, "B", 2020);
        assert_eq!(b20.kind, CollaborationKind::ExistingCollaboration);
        assert_eq!(b20.all_time_count, 2);
        assert_eq!(timeline.years.len(), 2);
    }

    #[test]
    fn test_existing_keys_are_not_reemitted_but_state_advances() {
        let papers = by_year(vec![paper("W1", 2018, &["Bob"]), paper("W2", 2019, &["Bob"])]);
        let target = Target::new("A", "Alice");
        let engine = engine(directory());

        let mut rng = StdRng::seed_from_u64(7);
        let first = engine.derive(target.clone(), &papers, HashSet::new(), &mut rng).unwrap();
        let existing: HashSet<_> = first.records.iter().map(CoauthorRelationship::key).collect();

        let mut rng = StdRng::seed_from_u64(7);
        let second = engine.derive(target.clone(), &papers, existing, &mut rng).unwrap();
        assert!(second.records.is_empty());
        assert_eq!(second.already_stored(), 2);

        // Only 2018 stored: the 2019 record is still classified against it.
        let only_2018: HashSet<_> = [RelationshipKey::new("A", "B", 2018)].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(7);
        let third = engine.derive(target, &papers, only_2018, &mut rng).unwrap();
        assert_eq!(third.records.len(), 1);
        assert_eq!(third.records[0].kind, CollaborationKind::ExistingCollaboration);
        assert_eq!(third.records[0].all_time_count, 2);
    }

    #[test]
    fn test_mutual_connection() {
        // Bob worked with Dan in 2018; Alice meets Dan in 2019.
        let graph = EdgeGraph(vec![("B", 2018, "D"), ("B", 2018, "A")]);
        let engine = TimelineEngine::new(Arc::new(directory()), Arc::new(graph));
        let papers = by_year(vec![
            paper("W1", 2018, &["Bob"]),
            paper("W2", 2019, &["Dan", "Carol"]),
            paper("W3", 2020, &["Dan"]),
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let timeline = engine.derive(Target::new("A", "Alice"), &papers, HashSet::new(), &mut rng).unwrap();

        assert_eq!(find(&timeline.records, "D", 2019).kind, CollaborationKind::NewViaMutualConnection);
        assert_eq!(find(&timeline.records, "C", 2019).kind, CollaborationKind::NewCollaboration);
        assert_eq!(find(&timeline.records, "D", 2020).kind, CollaborationKind::ExistingCollaboration);
    }

    #[test]
    fn test_shared_institution_uses_majorities() {
        let dir = directory().works_at("Bob", 2018, "MIT").works_at("Carol", 2018, "ETH");
        let papers = by_year(vec![
            Publication::new("A", "W1", 2018)
                .with_author(Contributor::new("Alice", Some("A")).with_institution("MIT"))
                .with_author(Contributor::new("Bob", None))
                .with_author(Contributor::new("Carol", None)),
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let timeline = engine(dir).derive(Target::new("A", "Alice"), &papers, HashSet::new(), &mut rng).unwrap();

        let b = find(&timeline.records, "B", 2018);
        assert_eq!(b.shared_institution.as_deref(), Some("MIT"));
        assert_eq!(b.coauthor_institution.as_deref(), Some("MIT"));

        let c = find(&timeline.records, "C", 2018);
        assert_eq!(c.shared_institution, None);
        assert_eq!(c.coauthor_institution.as_deref(), Some("ETH"));

        assert_eq!(timeline.target_institutions.get(&2018), Some(&Some("MIT".to_string())));
    }

    #[test]
    fn test_namesake_with_other_id_is_a_coauthor() {
        let dir = directory().person("Alice", "Z").works_at("Alice", 2018, "Oxford");
        let papers = by_year(vec![
            Publication::new("A", "W1", 2018)
                .with_author(Contributor::new("Alice", Some("Z")).with_institution("Oxford"))
                .with_author(Contributor::new("Alice", Some("A")).with_institution("MIT")),
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let timeline = engine(dir).derive(Target::new("A", "Alice"), &papers, HashSet::new(), &mut rng).unwrap();

        let namesake = find(&timeline.records, "Z", 2018);
        assert_eq!(namesake.kind, CollaborationKind::NewCollaboration);
        assert_eq!(namesake.shared_institution, None);
        assert_eq!(timeline.target_institutions.get(&2018), Some(&Some("MIT".to_string())));
    }

    #[test]
    fn test_dates_stay_in_year() {
        let papers = by_year(vec![
            paper("W1", 2018, &["Bob"]).with_date("2018-06-15"),
            paper("W2", 2018, &["Carol"]).with_date("not a date"),
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let timeline = engine(directory())
            .with_date_shuffle(true)
            .derive(Target::new("A", "Alice"), &papers, HashSet::new(), &mut rng)
            .unwrap();

        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2018, 12, 31).unwrap();
        for r in &timeline.records {
            assert!(r.date >= start && r.date <= end);
        }
    }

    #[test]
    fn test_empty_year_is_skipped() {
        let engine = engine(directory());
        let mut run = engine.start(Target::new("A", "Alice"), HashSet::new());
        let mut rng = StdRng::seed_from_u64(7);

        assert!(run.process_year(2018, &[], &mut rng).unwrap().is_none());
        assert_eq!(run.state().collaborator_count(), 0);

        run.process_year(2019, &[paper("W1", 2019, &["Bob"])], &mut rng).unwrap();
        assert_eq!(run.state().collaborator_count(), 1);
    }

    #[test]
    fn test_years_must_ascend() {
        let engine = engine(directory());
        let mut run = engine.start(Target::new("A", "Alice"), HashSet::new());
        let mut rng = StdRng::seed_from_u64(7);

        run.process_year(2019, &[paper("W1", 2019, &["Bob"])], &mut rng).unwrap();
        let err = run.process_year(2018, &[paper("W2", 2018, &["Bob"])], &mut rng).unwrap_err();
        assert!(matches!(err, TimelineError::Malformed { year: 2018, .. }));
    }

    #[test]
    fn test_foreign_publication_is_malformed() {
        let foreign = Publication::new("Z", "W9", 2018).with_author(Contributor::new("Bob", None));
        let papers = by_year(vec![foreign]);
        let mut rng = StdRng::seed_from_u64(7);
        let err = engine(directory())
            .derive(Target::new("A", "Alice"), &papers, HashSet::new(), &mut rng)
            .unwrap_err();
        assert!(!err.is_skip());
    }

    #[test]
    fn test_paper_without_authors_is_skipped() {
        let mut bare = Publication::new("A", "W1", 2018);
        bare.authors = None;
        let papers = by_year(vec![bare, paper("W2", 2018, &["Bob"])]);
        let mut rng = StdRng::seed_from_u64(7);
        let timeline = engine(directory())
            .derive(Target::new("A", "Alice"), &papers, HashSet::new(), &mut rng)
            .unwrap();
        assert_eq!(timeline.records.len(), 1);
        assert_eq!(timeline.years[0].papers, 2);
    }
}
