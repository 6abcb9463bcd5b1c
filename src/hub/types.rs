//! DTOs for hub HTTP responses (spec §6). Kept separate from [`crate::types`]
//! so the on-the-wire shape of the upstream API can drift independently of
//! our internal, normalized data model.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSummary {
    pub id: String,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "lastModified")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub siblings: Vec<Sibling>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sibling {
    pub rfilename: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathInfo {
    pub path: String,
    pub size: u64,
    #[serde(rename = "lastCommit")]
    pub last_commit: Option<LastCommit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastCommit {
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct ListModelsQuery {
    pub filter: Option<String>,
    pub search: Option<String>,
    pub author: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<i32>,
    pub limit: Option<u32>,
}

impl ListModelsQuery {
    pub fn gguf_tagged() -> Self {
        Self {
            filter: Some("gguf".to_string()),
            ..Default::default()
        }
    }
}
