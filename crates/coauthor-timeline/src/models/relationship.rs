//! Classified coauthor relationship records.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How a coauthor relates to the target in a given year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationKind {
    /// First collaboration, with no prior introduction.
    NewCollaboration,
    /// First collaboration with someone previously reachable through a collaborator.
    NewViaMutualConnection,
    /// The coauthor already collaborated with the target in an earlier year.
    ExistingCollaboration,
}

impl CollaborationKind {
    /// All labels, in declaration order.
    pub const ALL: [Self; 3] =
        [Self::NewCollaboration, Self::NewViaMutualConnection, Self::ExistingCollaboration];

    /// Stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewCollaboration => "new_collaboration",
            Self::NewViaMutualConnection => "new_via_mutual_connection",
            Self::ExistingCollaboration => "existing_collaboration",
        }
    }

    /// True for both "new" labels.
    #[must_use]
    pub const fn is_new(self) -> bool {
        !matches!(self, Self::ExistingCollaboration)
    }
}

impl fmt::Display for CollaborationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique key of a relationship record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipKey {
    /// Target author ID.
    pub target_id: String,
    /// Coauthor ID.
    pub coauthor_id: String,
    /// Publication year.
    pub year: i32,
}

impl RelationshipKey {
    /// Create a key.
    #[must_use]
    pub fn new(target_id: impl Into<String>, coauthor_id: impl Into<String>, year: i32) -> Self {
        Self { target_id: target_id.into(), coauthor_id: coauthor_id.into(), year }
    }
}

/// A classified (target, coauthor, year) relationship.
///
/// Created once per key and never mutated afterwards. Field order is the
/// persisted column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoauthorRelationship {
    /// Target author ID.
    pub target_id: String,

    /// A date sampled from the year's papers; only places the record within the year.
    pub date: NaiveDate,

    /// Publication year.
    pub year: i32,

    /// Coauthor ID.
    pub coauthor_id: String,

    /// Coauthor display name (first seen that year).
    pub coauthor_name: String,

    /// Classification label.
    pub kind: CollaborationKind,

    /// Papers shared with the target this year.
    pub yearly_count: u32,

    /// Papers shared with the target up to and including this year.
    pub all_time_count: u32,

    /// The coauthor's majority institution, when it equals the target's.
    #[serde(default)]
    pub shared_institution: Option<String>,

    /// The coauthor's majority institution this year.
    #[serde(default)]
    pub coauthor_institution: Option<String>,
}

impl CoauthorRelationship {
    /// Unique key of this record.
    #[must_use]
    pub fn key(&self) -> RelationshipKey {
        RelationshipKey::new(self.target_id.clone(), self.coauthor_id.clone(), self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_roundtrip_through_serde() {
        for kind in CollaborationKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert!(CollaborationKind::NewViaMutualConnection.is_new());
        assert!(!CollaborationKind::ExistingCollaboration.is_new());
    }

    #[test]
    fn test_relationship_key() {
        let record = CoauthorRelationship {
            target_id: "A1".into(),
            date: NaiveDate::from_ymd_opt(2019, 3, 4).unwrap(),
            year: 2019,
            coauthor_id: "A2".into(),
            coauthor_name: "Grace".into(),
            kind: CollaborationKind::NewCollaboration,
            yearly_count: 1,
            all_time_count: 1,
            shared_institution: None,
            coauthor_institution: None,
        };
        assert_eq!(record.key(), RelationshipKey::new("A1", "A2", 2019));
    }
}
