//! Publication records, as seen from the target author analysed.

use serde::{Deserialize, Serialize};

/// Accepted work types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkType {
    /// Journal or conference article.
    Article,
    /// Preprint.
    Preprint,
    /// Chapter in an edited book.
    BookChapter,
    /// Monograph.
    Book,
    /// Technical report.
    Report,
}

impl WorkType {
    /// Parse an OpenAlex work type; unknown types return `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "article" => Some(Self::Article),
            "preprint" => Some(Self::Preprint),
            "book-chapter" => Some(Self::BookChapter),
            "book" => Some(Self::Book),
            "report" => Some(Self::Report),
            _ => None,
        }
    }

    /// Wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Preprint => "preprint",
            Self::BookChapter => "book-chapter",
            Self::Book => "book",
            Self::Report => "report",
        }
    }
}

/// Position of the target in a work's author list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorPosition {
    /// First author.
    First,
    /// Any position between first and last.
    Middle,
    /// Last (often senior) author.
    Last,
}

impl AuthorPosition {
    /// Parse an OpenAlex `author_position` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "first" => Some(Self::First),
            "middle" => Some(Self::Middle),
            "last" => Some(Self::Last),
            _ => None,
        }
    }
}

/// One named person on a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    /// Display name as printed on the work.
    pub name: String,

    /// Stable author ID if the source provided one.
    #[serde(default)]
    pub id: Option<String>,

    /// Institutions listed for this person on this work.
    #[serde(default)]
    pub institutions: Vec<String>,
}

impl Contributor {
    /// Create a contributor without institutions.
    #[must_use]
    pub fn new(name: impl Into<String>, id: Option<&str>) -> Self {
        Self { name: name.into(), id: id.map(str::to_string), institutions: Vec::new() }
    }

    /// Add an institution mention.
    #[must_use]
    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.institutions.push(institution.into());
        self
    }

    /// True when this contributor is the given author.
    ///
    /// Matches by ID; the exact name is only consulted when the contributor has no ID.
    #[must_use]
    pub fn is_author(&self, author_id: &str, author_name: &str) -> bool {
        match self.id.as_deref() {
            Some(id) => id == author_id,
            None => self.name == author_name,
        }
    }
}

/// A publication of the target author.
///
/// Identity is `(author_id, work_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    /// The target author this record belongs to.
    pub author_id: String,

    /// Work ID.
    pub work_id: String,

    /// Title.
    #[serde(default)]
    pub title: Option<String>,

    /// Raw publication date (`YYYY-MM-DD`); may be missing or unparsable.
    #[serde(default)]
    pub date: Option<String>,

    /// Publication year.
    pub year: i32,

    /// Work type; missing values may be filled by a later harvest.
    #[serde(default)]
    pub work_type: Option<WorkType>,

    /// Primary topic; missing values may be filled by a later harvest.
    #[serde(default)]
    pub primary_topic: Option<String>,

    /// DOI without resolver prefix.
    #[serde(default)]
    pub doi: Option<String>,

    /// Ordered author list including the target; `None` when the source had none.
    #[serde(default)]
    pub authors: Option<Vec<Contributor>>,

    /// Citation count.
    #[serde(default)]
    pub cited_by_count: i64,

    /// Target's position in the author list.
    #[serde(default)]
    pub target_position: Option<AuthorPosition>,

    /// Target's majority institution for the year, as of this paper.
    #[serde(default)]
    pub target_institution: Option<String>,
}

impl Publication {
    /// Create a publication with only identity and year set.
    #[must_use]
    pub fn new(author_id: impl Into<String>, work_id: impl Into<String>, year: i32) -> Self {
        Self {
            author_id: author_id.into(),
            work_id: work_id.into(),
            title: None,
            date: None,
            year,
            work_type: None,
            primary_topic: None,
            doi: None,
            authors: Some(Vec::new()),
            cited_by_count: 0,
            target_position: None,
            target_institution: None,
        }
    }

    /// Set the raw date.
    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Append a contributor to the author list.
    #[must_use]
    pub fn with_author(mut self, contributor: Contributor) -> Self {
        self.authors.get_or_insert_with(Vec::new).push(contributor);
        self
    }

    /// Ordered display names joined with ", ".
    #[must_use]
    pub fn author_names(&self) -> Option<String> {
        let authors = self.authors.as_ref()?;
        Some(authors.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", "))
    }

    /// Fill missing metadata from a newer record of the same work.
    ///
    /// Existing values are never overwritten. Returns true if anything changed.
    pub fn coalesce(&mut self, newer: &Self) -> bool {
        let mut changed = false;
        if self.work_type.is_none() && newer.work_type.is_some() {
            self.work_type = newer.work_type;
            changed = true;
        }
        if self.primary_topic.is_none() && newer.primary_topic.is_some() {
            self.primary_topic.clone_from(&newer.primary_topic);
            changed = true;
        }
        changed
    }
}
