//! Collaborator interfaces consumed by the timeline engine and pipeline.
//!
//! I/O-bound collaborators (publications, career spans, stores) are async.
//! The lookups the engine calls inside its year loop (`PersonDirectory`,
//! `CollaborationGraph`) are synchronous read-only snapshots, so the engine
//! itself never suspends.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{StoreResult, TimelineResult};
use crate::models::{AuthorYear, CareerSpan, CoauthorRelationship, Publication, RelationshipKey};

/// Supplies an author's publications.
#[async_trait::async_trait]
pub trait PublicationSource: Send + Sync {
    /// Years in which the author has at least one publication, ascending.
    async fn publication_years(&self, author_id: &str) -> TimelineResult<BTreeSet<i32>>;

    /// All publications of the author in one calendar year.
    async fn publications(&self, author_id: &str, year: i32) -> TimelineResult<Vec<Publication>>;
}

/// Resolves an author's first and last publication year.
#[async_trait::async_trait]
pub trait CareerSpanResolver: Send + Sync {
    /// Resolve the span; an absent span is `CareerSpan::default()`.
    async fn career_span(&self, author_id: &str) -> TimelineResult<CareerSpan>;
}

/// What the directory knows about a person in one year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonYear {
    /// Stable author ID.
    pub author_id: String,
    /// Majority institution that year, if known.
    pub institution: Option<String>,
}

/// Read-only `(name, year) -> (institution, stable ID)` lookup.
pub trait PersonDirectory: Send + Sync {
    /// Look up a person. Implementations prefer `id` when given and fall back to `name`.
    fn person_year(&self, name: &str, id: Option<&str>, year: i32) -> Option<PersonYear>;
}

/// Read-only view of who published with whom in a given year.
pub trait CollaborationGraph: Send + Sync {
    /// IDs of everyone who shared a paper with `author_id` in `year`.
    fn coauthors_in_year(&self, author_id: &str, year: i32) -> Vec<String>;
}

/// A graph with no edges; disables mutual-connection detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyGraph;

impl CollaborationGraph for EmptyGraph {
    fn coauthors_in_year(&self, _author_id: &str, _year: i32) -> Vec<String> {
        Vec::new()
    }
}

/// Persistent keyed table of classified relationships.
#[async_trait::async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Keys already persisted for a target.
    async fn existing_keys(&self, target_id: &str) -> StoreResult<HashSet<RelationshipKey>>;

    /// Insert records; keys already present are skipped silently.
    ///
    /// Returns the number of records actually inserted.
    async fn persist(&self, records: &[CoauthorRelationship]) -> StoreResult<usize>;
}

/// Persistent table of author-year rows.
#[async_trait::async_trait]
pub trait AuthorStore: Send + Sync {
    /// Upsert rows on `(author_id, year)`, coalescing institution and first year.
    async fn upsert(&self, rows: &[AuthorYear]) -> StoreResult<()>;

    /// Rewrite an author's first year and ages; rows with negative age are deleted.
    ///
    /// Returns the number of rows remaining for the author.
    async fn correct_first_year(&self, author_id: &str, first_year: i32) -> StoreResult<usize>;

    /// Spans already known for every stored author with both bounds set.
    async fn known_spans(&self) -> StoreResult<HashMap<String, CareerSpan>>;
}
