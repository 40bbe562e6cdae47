//! Track catalog: records handed over by ingestion, the id map persisted next to
//! the embedding matrix, and the text canonicalization shared by feature
//! building and fuzzy lookup.

pub mod corpus;
pub mod normalize;
pub mod types;

pub use normalize::normalize;
pub use types::{IdMap, TrackMeta, TrackRecord};
