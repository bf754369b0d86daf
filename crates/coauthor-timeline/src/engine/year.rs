//! Per-year aggregation of a target's publications.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use rand::Rng;

use super::Target;
use super::tally::MentionTally;
use crate::dates;
use crate::error::{TimelineError, TimelineResult};
use crate::models::Publication;
use crate::sources::PersonDirectory;

/// One coauthor's activity with the target during a single year.
#[derive(Debug, Clone)]
pub struct CoauthorYear {
    /// Display name as first seen this year.
    pub name: String,
    /// Papers shared with the target this year.
    pub count: u32,
    /// Institution mentions from the directory, one per shared paper.
    pub institutions: MentionTally<String>,
}

/// Everything gathered from one year's publications before classification.
///
/// Scoped to a single year and discarded once its records are emitted.
#[derive(Debug, Clone, Default)]
pub struct YearAggregate {
    /// Coauthors keyed by stable ID.
    pub coauthors: BTreeMap<String, CoauthorYear>,
    /// The target's own institution mentions.
    pub target_institutions: MentionTally<String>,
    /// One date per paper, within the year.
    pub dates: Vec<NaiveDate>,
    /// Papers read.
    pub papers: usize,
    /// Papers without an author list.
    pub papers_without_authors: usize,
    /// Coauthor mentions dropped because the directory could not resolve them.
    pub unresolved_mentions: usize,
}

impl YearAggregate {
    /// The target's majority institution this year.
    #[must_use]
    pub fn target_institution(&self) -> Option<&String> {
        self.target_institutions.majority()
    }
}

/// Aggregate one year of publications.
///
/// Missing data is recovered locally: unparsable dates fall back to January
/// 1st, papers without an author list are skipped, and unresolvable coauthors
/// are dropped from that paper only. A record belonging to another target or
/// year is malformed and aborts the target.
pub fn aggregate_year<R: Rng + ?Sized>(
    target: &Target,
    year: i32,
    publications: &[Publication],
    directory: &dyn PersonDirectory,
    shuffle_dates: bool,
    rng: &mut R,
) -> TimelineResult<YearAggregate> {
    let mut agg = YearAggregate::default();

    for paper in publications {
        validate(target, year, paper)?;
        agg.papers += 1;

        let (date, fell_back) = dates::date_within_year(paper.date.as_deref(), year);
        if fell_back && paper.date.is_some() {
            tracing::warn!(
                target_id = %target.id,
                work_id = %paper.work_id,
                date = ?paper.date,
                "Unparsable publication date, using start of year"
            );
        }
        agg.dates.push(if shuffle_dates { dates::shuffle_day_within_month(date, rng) } else { date });

        let Some(authors) = &paper.authors else {
            tracing::warn!(
                target_id = %target.id,
                year,
                work_id = %paper.work_id,
                title = paper.title.as_deref().unwrap_or(""),
                "Missing author list, skipping paper"
            );
            agg.papers_without_authors += 1;
            continue;
        };

        let mut seen_on_paper = HashSet::new();
        for contributor in authors {
            if contributor.is_author(&target.id, &target.name) {
                for institution in &contributor.institutions {
                    agg.target_institutions.add(institution.clone());
                }
                continue;
            }

            let Some(person) = directory.person_year(&contributor.name, contributor.id.as_deref(), year)
            else {
                agg.unresolved_mentions += 1;
                continue;
            };

            // A name variant of the target resolves to the target's own ID.
            if person.author_id == target.id || !seen_on_paper.insert(person.author_id.clone()) {
                continue;
            }

            let entry = agg.coauthors.entry(person.author_id).or_insert_with(|| CoauthorYear {
                name: contributor.name.clone(),
                count: 0,
                institutions: MentionTally::new(),
            });
            entry.count += 1;
            if let Some(institution) = person.institution {
                entry.institutions.add(institution);
            }
        }
    }

    Ok(agg)
}

fn validate(target: &Target, year: i32, paper: &Publication) -> TimelineResult<()> {
    if paper.work_id.trim().is_empty() {
        return Err(TimelineError::malformed(&target.id, year, "publication without work id"));
    }
    if paper.author_id != target.id {
        return Err(TimelineError::malformed(
            &target.id,
            year,
            format!("publication {} belongs to {}", paper.work_id, paper.author_id),
        ));
    }
    if paper.year != year {
        return Err(TimelineError::malformed(
            &target.id,
            year,
            format!("publication {} is dated {}", paper.work_id, paper.year),
        ));
    }
    Ok(())
}
