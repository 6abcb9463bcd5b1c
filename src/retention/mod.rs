//! Retention subsystem (spec §4.G): date-filtered extraction (G1),
//! top-K maintenance (G2), source-weighted merge (G3), and cleanup (G4).
//! `RetentionMetadata` persists as `data/retention/retention_metadata.json`
//! via the shared atomic-write helper.

pub mod cleanup;
pub mod date_filter;
pub mod merge;
pub mod top_models;

pub use date_filter::DateFilterResult;
pub use merge::MergeResult;
pub use top_models::TopModelsResult;
