//! Data models.
//!
//! `openalex` mirrors the API payloads; the other modules are the pipeline's
//! own records, which never carry API naming.

mod author;
mod enums;
pub mod openalex;
mod publication;
mod relationship;

pub use author::{AuthorYear, CareerSpan};
pub use enums::ResponseFormat;
pub use openalex::{AuthorRecord, Authorship, Work, WorksPage, openalex_key};
pub use publication::{AuthorPosition, Contributor, Publication, WorkType};
pub use relationship::{CoauthorRelationship, CollaborationKind, RelationshipKey};
