//! Author-year rows and career spans.

use serde::{Deserialize, Serialize};

/// First and most recent publication year of an author.
///
/// Either bound may be unknown; a span with both bounds unknown is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerSpan {
    /// First observed publication year.
    pub first_year: Option<i32>,

    /// Last observed publication year.
    pub last_year: Option<i32>,
}

impl CareerSpan {
    /// A span with both bounds known.
    #[must_use]
    pub const fn new(first_year: i32, last_year: i32) -> Self {
        Self { first_year: Some(first_year), last_year: Some(last_year) }
    }

    /// True when neither bound is known.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        self.first_year.is_none() && self.last_year.is_none()
    }

    /// True when both bounds are known.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.first_year.is_some() && self.last_year.is_some()
    }

    /// True when `year` lies within the known bounds.
    #[must_use]
    pub fn contains(&self, year: i32) -> bool {
        self.first_year.is_none_or(|first| year >= first)
            && self.last_year.is_none_or(|last| year <= last)
    }

    /// Fill unknown bounds from another span.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self {
            first_year: self.first_year.or(other.first_year),
            last_year: self.last_year.or(other.last_year),
        }
    }
}

/// One row per (author, year).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorYear {
    /// Stable author ID.
    pub author_id: String,

    /// Display name.
    pub display_name: String,

    /// Majority institution that year.
    #[serde(default)]
    pub institution: Option<String>,

    /// Calendar year of this row.
    pub year: i32,

    /// First observed publication year.
    #[serde(default)]
    pub first_pub_year: Option<i32>,

    /// Last observed publication year.
    #[serde(default)]
    pub last_pub_year: Option<i32>,

    /// `year - first_pub_year`.
    #[serde(default)]
    pub career_age: Option<i32>,
}

impl AuthorYear {
    /// Build a row, deriving the career age from the span.
    #[must_use]
    pub fn new(
        author_id: impl Into<String>,
        display_name: impl Into<String>,
        institution: Option<String>,
        year: i32,
        span: CareerSpan,
    ) -> Self {
        Self {
            author_id: author_id.into(),
            display_name: display_name.into(),
            institution,
            year,
            first_pub_year: span.first_year,
            last_pub_year: span.last_year,
            career_age: span.first_year.map(|first| year - first),
        }
    }

    /// Natural key.
    #[must_use]
    pub fn key(&self) -> (String, i32) {
        (self.author_id.clone(), self.year)
    }

    /// True when the age is negative, which means the first year is wrong.
    #[must_use]
    pub fn has_negative_age(&self) -> bool {
        self.career_age.is_some_and(|age| age < 0)
    }

    /// Rewrite the first publication year and recompute the age.
    pub fn set_first_year(&mut self, first_year: i32) {
        self.first_pub_year = Some(first_year);
        self.career_age = Some(self.year - first_year);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_contains() {
        let span = CareerSpan::new(2010, 2020);
        assert!(span.contains(2010));
        assert!(span.contains(2020));
        assert!(!span.contains(2021));

        let open = CareerSpan { first_year: Some(2010), last_year: None };
        assert!(open.contains(2030));
        assert!(!open.contains(2009));
        assert!(CareerSpan::default().is_absent());
    }

    #[test]
    fn test_span_or_fills_missing_bounds() {
        let partial = CareerSpan { first_year: None, last_year: Some(2022) };
        let merged = partial.or(CareerSpan::new(2001, 2019));
        assert_eq!(merged, CareerSpan::new(2001, 2022));
    }

    #[test]
    fn test_author_year_age() {
        let row = AuthorYear::new("A1", "Ada", None, 2015, CareerSpan::new(2010, 2020));
        assert_eq!(row.career_age, Some(5));
        assert!(!row.has_negative_age());

        let mut early = AuthorYear::new("A1", "Ada", None, 2008, CareerSpan::new(2010, 2020));
        assert!(early.has_negative_age());
        early.set_first_year(2005);
        assert_eq!(early.career_age, Some(3));
    }
}
