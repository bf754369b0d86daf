//! Career span resolution and author-year rows.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use moka::future::Cache;

use crate::config::Config;
use crate::engine::TargetTimeline;
use crate::error::TimelineResult;
use crate::models::{AuthorYear, CareerSpan};
use crate::sources::CareerSpanResolver;

/// Resolves career spans: manual override, then cache, then upstream, then fallback.
///
/// First years before `min_valid_first_year` are treated as upstream errors
/// and nulled. Manual overrides are trusted as given.
#[derive(Clone)]
pub struct CareerResolver {
    upstream: Option<Arc<dyn CareerSpanResolver>>,
    fallback: Arc<dyn CareerSpanResolver>,
    overrides: HashMap<String, i32>,
    cache: Cache<String, CareerSpan>,
    min_valid_first_year: i32,
    concurrency: usize,
}

impl CareerResolver {
    /// Create a resolver over a fallback source (usually the corpus).
    #[must_use]
    pub fn new(fallback: Arc<dyn CareerSpanResolver>, config: &Config) -> Self {
        Self {
            upstream: None,
            fallback,
            overrides: HashMap::new(),
            cache: Cache::builder().max_capacity(100_000).build(),
            min_valid_first_year: config.min_valid_first_year,
            concurrency: config.concurrency.max(1),
        }
    }

    /// Consult `upstream` before the fallback.
    #[must_use]
    pub fn with_upstream(mut self, upstream: Arc<dyn CareerSpanResolver>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Replace the fallback source. Clones of a resolver share one cache.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn CareerSpanResolver>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Manual first-year overrides, keyed by author ID.
    #[must_use]
    pub fn with_overrides(mut self, overrides: HashMap<String, i32>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Pre-populate the cache with spans already known to the author table.
    pub async fn seed(&self, spans: HashMap<String, CareerSpan>) {
        for (author_id, span) in spans {
            self.cache.insert(author_id, span).await;
        }
    }

    /// Resolve one author's span.
    pub async fn resolve(&self, author_id: &str) -> TimelineResult<CareerSpan> {
        let span = match self.cache.get(author_id).await {
            Some(span) => span,
            None => {
                let span = self.lookup(author_id).await?;
                self.cache.insert(author_id.to_string(), span).await;
                span
            }
        };

        Ok(match self.overrides.get(author_id) {
            Some(first) => CareerSpan { first_year: Some(*first), ..span },
            None => span,
        })
    }

    /// Resolve many authors, a few at a time.
    pub async fn resolve_many<'a>(
        &self,
        author_ids: impl IntoIterator<Item = &'a str>,
    ) -> TimelineResult<HashMap<String, CareerSpan>> {
        let results: Vec<_> = stream::iter(author_ids)
            .map(|id| async move { self.resolve(id).await.map(|span| (id.to_string(), span)) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results.into_iter().collect()
    }

    async fn lookup(&self, author_id: &str) -> TimelineResult<CareerSpan> {
        let mut span = CareerSpan::default();
        if let Some(upstream) = &self.upstream {
            match upstream.career_span(author_id).await {
                Ok(found) => span = self.plausible(author_id, found),
                Err(e) => tracing::warn!(author_id, error = %e, "Upstream career span failed, using fallback"),
            }
        }
        if !span.is_complete() {
            let fallback = self.fallback.career_span(author_id).await?;
            span = span.or(self.plausible(author_id, fallback));
        }
        Ok(span)
    }

    fn plausible(&self, author_id: &str, mut span: CareerSpan) -> CareerSpan {
        if let Some(first) = span.first_year {
            if first < self.min_valid_first_year {
                tracing::warn!(
                    author_id,
                    first_year = first,
                    min_valid = self.min_valid_first_year,
                    "Implausible first publication year, discarding"
                );
                span.first_year = None;
            }
        }
        span
    }
}

#[async_trait::async_trait]
impl CareerSpanResolver for CareerResolver {
    async fn career_span(&self, author_id: &str) -> TimelineResult<CareerSpan> {
        self.resolve(author_id).await
    }
}

impl std::fmt::Debug for CareerResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CareerResolver")
            .field("has_upstream", &self.upstream.is_some())
            .field("overrides", &self.overrides.len())
            .field("min_valid_first_year", &self.min_valid_first_year)
            .finish()
    }
}

/// Author-year rows for a derived timeline: the target and every coauthor on a new record.
///
/// Rows with a negative career age are discarded.
pub async fn author_rows(
    timeline: &TargetTimeline,
    resolver: &CareerResolver,
    max_author_age: i32,
) -> TimelineResult<Vec<AuthorYear>> {
    let target = &timeline.target;
    let mut ids: Vec<&str> = timeline.records.iter().map(|r| r.coauthor_id.as_str()).collect();
    ids.push(&target.id);
    ids.sort_unstable();
    ids.dedup();
    let spans = resolver.resolve_many(ids).await?;

    let mut rows: BTreeMap<(String, i32), AuthorYear> = BTreeMap::new();
    let target_span = spans.get(&target.id).copied().unwrap_or_default();
    for (year, institution) in &timeline.target_institutions {
        let row = AuthorYear::new(&target.id, &target.name, institution.clone(), *year, target_span);
        rows.insert(row.key(), row);
    }
    for record in &timeline.records {
        let span = spans.get(&record.coauthor_id).copied().unwrap_or_default();
        let row = AuthorYear::new(
            &record.coauthor_id,
            &record.coauthor_name,
            record.coauthor_institution.clone(),
            record.year,
            span,
        );
        rows.entry(row.key()).or_insert(row);
    }

    let before = rows.len();
    rows.retain(|_, row| !row.has_negative_age());
    if rows.len() < before {
        tracing::debug!(target_id = %target.id, dropped = before - rows.len(), "Discarded rows with negative age");
    }

    let suspicious = rows.values().filter(|r| r.career_age.is_some_and(|a| a > max_author_age)).count();
    if suspicious > 0 {
        tracing::warn!(target_id = %target.id, rows = suspicious, max_author_age, "Career ages above plausible maximum");
    }

    Ok(rows.into_values().collect())
}
