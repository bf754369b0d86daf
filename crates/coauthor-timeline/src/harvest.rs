//! Harvesting a target's works from OpenAlex into publications.
//!
//! Each accepted work becomes one [`Publication`] seen from the target: their
//! position in the author list and their running majority institution for the
//! year are recorded alongside the full contributor list.

use chrono::Datelike;
use rand::Rng;
use regex::RegexSet;

use crate::client::OpenAlexClient;
use crate::config::{Config, filters};
use crate::dates;
use crate::engine::{MentionTally, Target};
use crate::error::{TimelineError, TimelineResult};
use crate::models::{AuthorPosition, Authorship, CareerSpan, Contributor, Publication, Work, WorkType, openalex_key};

/// Why a work was left out of the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Language is not English.
    Language,
    /// Work type is not accepted.
    WorkType,
    /// Title looks like supplementary material.
    Title,
}

/// Harvest filter: language, work type and title patterns.
#[derive(Debug, Clone)]
pub struct WorkFilter {
    accepted_types: Vec<String>,
    english_only: bool,
    excluded_titles: RegexSet,
}

impl WorkFilter {
    /// Build the filter from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if a title pattern does not compile.
    pub fn from_config(config: &Config) -> Result<Self, regex::Error> {
        Ok(Self {
            accepted_types: config.accepted_work_types.clone(),
            english_only: config.english_only,
            excluded_titles: RegexSet::new(filters::EXCLUDED_TITLE_PATTERNS)?,
        })
    }

    /// Check one work.
    pub fn check(&self, work: &Work) -> Result<(), Rejection> {
        if self.english_only && !work.is_english() {
            return Err(Rejection::Language);
        }
        match work.work_type.as_deref() {
            Some(t) if self.accepted_types.iter().any(|a| a == t) => {}
            _ => return Err(Rejection::WorkType),
        }
        if let Some(title) = &work.title {
            if self.excluded_titles.is_match(&title.to_lowercase()) {
                return Err(Rejection::Title);
            }
        }
        Ok(())
    }
}

/// Counts from harvesting one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestStats {
    /// Years queried.
    pub years: usize,
    /// Works returned by the API.
    pub fetched: usize,
    /// Works accepted.
    pub accepted: usize,
    /// Dropped for language.
    pub rejected_language: usize,
    /// Dropped for work type.
    pub rejected_type: usize,
    /// Dropped for title.
    pub rejected_title: usize,
}

impl HarvestStats {
    fn reject(&mut self, reason: Rejection) {
        match reason {
            Rejection::Language => self.rejected_language += 1,
            Rejection::WorkType => self.rejected_type += 1,
            Rejection::Title => self.rejected_title += 1,
        }
    }
}

/// Convert one year of works into publications of `target`.
///
/// Works are read in the given order; the target's institution on each
/// publication is their majority institution over the year's works so far.
pub fn publications_from_works<R: Rng + ?Sized>(
    target: &Target,
    year: i32,
    works: &[Work],
    filter: &WorkFilter,
    shuffle_dates: bool,
    rng: &mut R,
    stats: &mut HarvestStats,
) -> Vec<Publication> {
    let mut institutions = MentionTally::new();
    let mut publications = Vec::with_capacity(works.len());

    for work in works {
        stats.fetched += 1;
        if let Err(reason) = filter.check(work) {
            tracing::trace!(work_id = %work.key(), ?reason, "Work filtered");
            stats.reject(reason);
            continue;
        }
        stats.accepted += 1;

        let mut publication = Publication::new(&target.id, work.key(), year);
        publication.title.clone_from(&work.title);
        if let Some(raw) = &work.publication_date {
            publication.date = Some(match dates::parse_date(raw) {
                Some(date) if shuffle_dates => dates::shuffle_day_within_month(date, &mut *rng).to_string(),
                _ => raw.clone(),
            });
        }
        publication.work_type = work.work_type.as_deref().and_then(WorkType::parse);
        publication.primary_topic = work.topic().map(str::to_string);
        publication.doi = work.doi();
        publication.cited_by_count = work.cited_by_count.unwrap_or(0);
        publication.authors = work.authorships.as_deref().map(contributors);

        if let Some(own) = work.authorships.iter().flatten().find(|a| is_target(a, target)) {
            publication.target_position = own.author_position.as_deref().and_then(AuthorPosition::parse);
            for institution in own.institution_names() {
                institutions.add(institution);
            }
        }
        publication.target_institution = institutions.majority().cloned();

        publications.push(publication);
    }
    publications
}

fn contributors(authorships: &[Authorship]) -> Vec<Contributor> {
    authorships
        .iter()
        .filter_map(|a| {
            let id = a.author.id.as_deref().map(openalex_key);
            let name = a.author.display_name.clone().or_else(|| id.clone())?;
            Some(Contributor { name, id, institutions: a.institution_names() })
        })
        .collect()
}

fn is_target(authorship: &Authorship, target: &Target) -> bool {
    match authorship.author.id.as_deref() {
        Some(id) => openalex_key(id) == target.id,
        None => authorship.author.display_name.as_deref() == Some(target.name.as_str()),
    }
}

/// Fetches and filters a target's works year by year.
#[derive(Debug, Clone)]
pub struct Harvester {
    client: OpenAlexClient,
    filter: WorkFilter,
    shuffle_dates: bool,
    min_valid_first_year: i32,
}

impl Harvester {
    /// Create a harvester.
    ///
    /// # Errors
    ///
    /// Returns error if the title filter does not compile.
    pub fn new(client: OpenAlexClient, config: &Config) -> Result<Self, regex::Error> {
        Ok(Self {
            client,
            filter: WorkFilter::from_config(config)?,
            shuffle_dates: config.shuffle_dates,
            min_valid_first_year: config.min_valid_first_year,
        })
    }

    /// Harvest every year of `span`.
    ///
    /// A missing first year (discarded as implausible) starts the harvest at
    /// `min_valid_first_year`. A missing last year skips the target. A failing
    /// year aborts it.
    pub async fn harvest<R: Rng + Send + ?Sized>(
        &self,
        target: &Target,
        span: CareerSpan,
        rng: &mut R,
    ) -> TimelineResult<(Vec<Publication>, HarvestStats)> {
        let Some(last) = span.last_year else {
            return Err(TimelineError::skipped(&target.id, "no career span to harvest"));
        };
        let last = last.min(chrono::Utc::now().year());
        let first = span.first_year.unwrap_or_else(|| {
            tracing::debug!(
                target_id = %target.id,
                from = self.min_valid_first_year,
                "No first year, harvesting from floor"
            );
            self.min_valid_first_year
        });

        let mut stats = HarvestStats::default();
        let mut publications = Vec::new();
        for year in first..=last {
            let works = self.client.works_for_author_year(&target.id, year).await?;
            stats.years += 1;
            publications.extend(publications_from_works(
                target,
                year,
                &works,
                &self.filter,
                self.shuffle_dates,
                rng,
                &mut stats,
            ));
        }

        tracing::info!(
            target_id = %target.id,
            years = stats.years,
            fetched = stats.fetched,
            accepted = stats.accepted,
            "Harvested works"
        );
        Ok((publications, stats))
    }
}
