pub mod client;
pub mod types;

pub use client::{HttpHubClient, HubClient};
pub use types::{ListModelsQuery, ModelSummary, PathInfo, Sibling};
