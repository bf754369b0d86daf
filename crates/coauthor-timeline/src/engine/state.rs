//! Collaboration state carried across a target's career.

use std::collections::{HashMap, HashSet};

use crate::models::CollaborationKind;
use crate::sources::CollaborationGraph;

/// Cross-year state for one target. Never reset between years.
#[derive(Debug, Clone, Default)]
pub struct CollaborationState {
    /// Coauthors seen in any finished year.
    all_time_collaborators: HashSet<String>,

    /// Cumulative appearances per coauthor, including the year in progress.
    all_time_counts: HashMap<String, u32>,

    /// People reachable through a collaborator who never published with the target.
    introductions: HashSet<String>,

    /// First year not yet scanned for introductions.
    next_unscanned_year: Option<i32>,
}

impl CollaborationState {
    /// Create empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `coauthor` collaborated with the target in a finished year.
    #[must_use]
    pub fn is_collaborator(&self, coauthor: &str) -> bool {
        self.all_time_collaborators.contains(coauthor)
    }

    /// True if `coauthor` was reachable through a collaborator.
    #[must_use]
    pub fn is_introduced(&self, coauthor: &str) -> bool {
        self.introductions.contains(coauthor)
    }

    /// Cumulative count for `coauthor`.
    #[must_use]
    pub fn all_time_count(&self, coauthor: &str) -> u32 {
        self.all_time_counts.get(coauthor).copied().unwrap_or(0)
    }

    /// Number of distinct collaborators so far.
    #[must_use]
    pub fn collaborator_count(&self) -> usize {
        self.all_time_collaborators.len()
    }

    /// Number of pending introductions.
    #[must_use]
    pub fn introduction_count(&self) -> usize {
        self.introductions.len()
    }

    /// Classify `coauthor` against the state as of the end of the previous year.
    #[must_use]
    pub fn classify(&self, coauthor: &str) -> CollaborationKind {
        if self.is_collaborator(coauthor) {
            CollaborationKind::ExistingCollaboration
        } else if self.is_introduced(coauthor) {
            CollaborationKind::NewViaMutualConnection
        } else {
            CollaborationKind::NewCollaboration
        }
    }

    /// Add `papers` appearances for `coauthor`; returns the new cumulative count.
    pub fn record_appearances(&mut self, coauthor: &str, papers: u32) -> u32 {
        let count = self.all_time_counts.entry(coauthor.to_string()).or_insert(0);
        *count += papers;
        *count
    }

    /// Collect collaborators-of-collaborators for every year in `[next_unscanned, year)`.
    ///
    /// Called at the start of a year with publications. Candidates exclude the
    /// target and anyone who already collaborated directly.
    pub fn advance_introductions(&mut self, graph: &dyn CollaborationGraph, target_id: &str, year: i32) {
        let from = self.next_unscanned_year.unwrap_or(year);
        for scanned in from..year {
            for collaborator in &self.all_time_collaborators {
                for candidate in graph.coauthors_in_year(collaborator, scanned) {
                    if candidate != target_id && !self.all_time_collaborators.contains(&candidate) {
                        self.introductions.insert(candidate);
                    }
                }
            }
        }
        self.next_unscanned_year = Some(year);
    }

    /// Close a year: its coauthors become all-time collaborators.
    pub fn finish_year<'a>(&mut self, coauthors: impl IntoIterator<Item = &'a str>) {
        for coauthor in coauthors {
            self.introductions.remove(coauthor);
            self.all_time_collaborators.insert(coauthor.to_string());
        }
    }
}
