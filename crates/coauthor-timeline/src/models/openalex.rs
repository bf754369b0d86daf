//! Wire models matching the OpenAlex API schema.
//!
//! Only the fields the pipeline reads are modelled; everything is optional
//! because OpenAlex omits or nulls fields freely.

use serde::{Deserialize, Serialize};

/// A work (paper, chapter, preprint, ...) from OpenAlex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Work {
    /// OpenAlex work URL, e.g. `https://openalex.org/W2741809807`.
    pub id: String,

    /// Work title.
    #[serde(default)]
    pub title: Option<String>,

    /// Publication date in ISO format (YYYY-MM-DD).
    #[serde(default)]
    pub publication_date: Option<String>,

    /// Publication year.
    #[serde(default)]
    pub publication_year: Option<i32>,

    /// Work type (article, preprint, book-chapter, ...).
    #[serde(default, rename = "type")]
    pub work_type: Option<String>,

    /// ISO 639-1 language code.
    #[serde(default)]
    pub language: Option<String>,

    /// Number of citing works.
    #[serde(default)]
    pub cited_by_count: Option<i64>,

    /// External identifiers.
    #[serde(default)]
    pub ids: Option<WorkIds>,

    /// Primary research topic.
    #[serde(default)]
    pub primary_topic: Option<Topic>,

    /// Author list with positions and institutions; `None` when absent from the payload.
    #[serde(default)]
    pub authorships: Option<Vec<Authorship>>,
}

impl Work {
    /// Short OpenAlex key of this work (`W...`).
    #[must_use]
    pub fn key(&self) -> String {
        openalex_key(&self.id)
    }

    /// DOI without the resolver prefix.
    #[must_use]
    pub fn doi(&self) -> Option<String> {
        self.ids
            .as_ref()?
            .doi
            .as_deref()
            .map(|d| d.trim_start_matches("https://doi.org/").to_string())
    }

    /// Display name of the primary topic.
    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.primary_topic.as_ref()?.display_name.as_deref()
    }

    /// True when the work is tagged as English.
    #[must_use]
    pub fn is_english(&self) -> bool {
        self.language.as_deref() == Some("en")
    }
}

/// External identifiers of a work.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkIds {
    /// DOI URL.
    #[serde(default)]
    pub doi: Option<String>,

    /// Microsoft Academic Graph ID.
    #[serde(default)]
    pub mag: Option<String>,
}

/// A research topic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topic {
    /// Topic name.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// One author slot on a work.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Authorship {
    /// "first", "middle" or "last".
    #[serde(default)]
    pub author_position: Option<String>,

    /// The author.
    #[serde(default)]
    pub author: DehydratedAuthor,

    /// Institutions listed for this author on this work.
    #[serde(default)]
    pub institutions: Vec<Institution>,
}

impl Authorship {
    /// Institution display names, skipping unnamed entries.
    #[must_use]
    pub fn institution_names(&self) -> Vec<String> {
        self.institutions.iter().filter_map(|i| i.display_name.clone()).collect()
    }
}

/// Minimal author embedded in an authorship.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DehydratedAuthor {
    /// OpenAlex author URL.
    #[serde(default)]
    pub id: Option<String>,

    /// Author display name.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// An institution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Institution {
    /// Institution name.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Paginated works response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorksPage {
    /// Paging metadata.
    #[serde(default)]
    pub meta: PageMeta,

    /// Works in this page.
    #[serde(default)]
    pub results: Vec<Work>,
}

/// Paging metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageMeta {
    /// Total matching works.
    #[serde(default)]
    pub count: Option<i64>,

    /// Cursor for the next page (None = no more results).
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Author entity from `/authors/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorRecord {
    /// OpenAlex author URL.
    pub id: String,

    /// Author display name.
    #[serde(default)]
    pub display_name: Option<String>,

    /// Yearly activity, most recent year first.
    #[serde(default)]
    pub counts_by_year: Vec<YearCount>,
}

impl AuthorRecord {
    /// Most recent year with activity.
    #[must_use]
    pub fn latest_active_year(&self) -> Option<i32> {
        self.counts_by_year.iter().map(|c| c.year).max()
    }
}

/// Activity counts for one year.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YearCount {
    /// Calendar year.
    pub year: i32,

    /// Works published that year.
    #[serde(default)]
    pub works_count: i64,

    /// Citations received that year.
    #[serde(default)]
    pub cited_by_count: i64,
}

/// Normalize an OpenAlex entity URL to its short key (`https://openalex.org/A5` -> `A5`).
///
/// Keys are uppercased since OpenAlex accepts either case.
#[must_use]
pub fn openalex_key(id: &str) -> String {
    let key = url::Url::parse(id)
        .ok()
        .and_then(|u| u.path_segments()?.filter(|s| !s.is_empty()).next_back().map(str::to_string))
        .unwrap_or_else(|| id.trim().to_string());
    key.to_uppercase()
}
