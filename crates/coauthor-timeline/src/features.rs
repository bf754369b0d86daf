//! Age-gap features for relationship records.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::models::{AuthorYear, CoauthorRelationship};

/// Coarse bucket of `coauthor_age - target_age`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBucket {
    /// Below -15.
    MuchYounger,
    /// -15 up to (not including) -7.
    Younger,
    /// -7 up to (not including) 7.
    SameAge,
    /// 7 up to (not including) 15.
    Older,
    /// 15 and above.
    MuchOlder,
}

impl AgeBucket {
    /// Bucket an age difference.
    #[must_use]
    pub const fn from_diff(diff: i32) -> Self {
        match diff {
            i32::MIN..=-16 => Self::MuchYounger,
            -15..=-8 => Self::Younger,
            -7..=6 => Self::SameAge,
            7..=14 => Self::Older,
            _ => Self::MuchOlder,
        }
    }

    /// Wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MuchYounger => "much_younger",
            Self::Younger => "younger",
            Self::SameAge => "same_age",
            Self::Older => "older",
            Self::MuchOlder => "much_older",
        }
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relationship joined with both parties' career ages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipFeatures {
    /// The underlying record.
    #[serde(flatten)]
    pub relationship: CoauthorRelationship,
    /// Target's career age that year.
    pub target_age: Option<i32>,
    /// Coauthor's career age that year.
    pub coauthor_age: Option<i32>,
    /// `coauthor_age - target_age`.
    pub age_diff: Option<i32>,
    /// Bucket of `age_diff`.
    pub age_bucket: Option<AgeBucket>,
}

/// Join relationships with author rows on `(author_id, year)`.
///
/// Ages resting on a first year before `min_valid_first_year` are left out.
#[must_use]
pub fn relationship_features(
    relationships: &[CoauthorRelationship],
    authors: &[AuthorYear],
    min_valid_first_year: i32,
) -> Vec<RelationshipFeatures> {
    let ages: HashMap<(&str, i32), i32> = authors
        .iter()
        .filter(|row| row.first_pub_year.is_some_and(|first| first >= min_valid_first_year))
        .filter_map(|row| Some(((row.author_id.as_str(), row.year), row.career_age?)))
        .collect();

    relationships
        .iter()
        .map(|r| {
            let target_age = ages.get(&(r.target_id.as_str(), r.year)).copied();
            let coauthor_age = ages.get(&(r.coauthor_id.as_str(), r.year)).copied();
            let age_diff = target_age.zip(coauthor_age).map(|(t, c)| c - t);
            RelationshipFeatures {
                relationship: r.clone(),
                target_age,
                coauthor_age,
                age_diff,
                age_bucket: age_diff.map(AgeBucket::from_diff),
            }
        })
        .collect()
}

/// Write features as JSON lines, replacing `path`.
pub async fn write_features(path: &Path, features: &[RelationshipFeatures]) -> StoreResult<()> {
    let mut buf = Vec::new();
    for feature in features {
        serde_json::to_writer(&mut buf, feature)?;
        buf.push(b'\n');
    }
    tokio::fs::write(path, buf).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{CareerSpan, CollaborationKind};

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(AgeBucket::from_diff(-16), AgeBucket::MuchYounger);
        assert_eq!(AgeBucket::from_diff(-15), AgeBucket::Younger);
        assert_eq!(AgeBucket::from_diff(-8), AgeBucket::Younger);
        assert_eq!(AgeBucket::from_diff(-7), AgeBucket::SameAge);
        assert_eq!(AgeBucket::from_diff(0), AgeBucket::SameAge);
        assert_eq!(AgeBucket::from_diff(6), AgeBucket::SameAge);
        assert_eq!(AgeBucket::from_diff(7), AgeBucket::Older);
        assert_eq!(AgeBucket::from_diff(14), AgeBucket::Older);
        assert_eq!(AgeBucket::from_diff(15), AgeBucket::MuchOlder);
        assert_eq!(AgeBucket::MuchOlder.to_string(), "much_older");
    }

    fn relationship(coauthor: &str) -> CoauthorRelationship {
        CoauthorRelationship {
            target_id: "A".into(),
            date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            year: 2020,
            coauthor_id: coauthor.into(),
            coauthor_name: coauthor.into(),
            kind: CollaborationKind::NewCollaboration,
            yearly_count: 1,
            all_time_count: 1,
            shared_institution: None,
            coauthor_institution: None,
        }
    }

    #[test]
    fn test_features_join_ages() {
        let rows = [
            AuthorYear::new("A", "Ada", None, 2020, CareerSpan::new(2000, 2020)),
            AuthorYear::new("B", "Bob", None, 2020, CareerSpan::new(2015, 2020)),
            AuthorYear::new("C", "Cy", None, 2020, CareerSpan::new(1900, 2020)),
        ];
        let features = relationship_features(&[relationship("B"), relationship("C"), relationship("D")], &rows, 1950);

        assert_eq!(features[0].target_age, Some(20));
        assert_eq!(features[0].coauthor_age, Some(5));
        assert_eq!(features[0].age_diff, Some(-15));
        assert_eq!(features[0].age_bucket, Some(AgeBucket::Younger));

        assert_eq!(features[1].coauthor_age, None, "implausible first year");
        assert_eq!(features[1].age_bucket, None);
        assert_eq!(features[2].coauthor_age, None);
    }

    #[test]
    fn test_features_serialize_flat() {
        let rows = [AuthorYear::new("A", "Ada", None, 2020, CareerSpan::new(2010, 2020))];
        let features = relationship_features(&[relationship("B")], &rows, 1950);
        let value = serde_json::to_value(&features[0]).unwrap();
        assert_eq!(value["target_id"], "A");
        assert_eq!(value["target_age"], 10);
        assert!(value["age_bucket"].is_null());
    }
}
