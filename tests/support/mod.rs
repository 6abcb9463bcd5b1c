//! Shared fixtures for the end-to-end orchestrator scenarios in
//! `tests/scenarios.rs`: an in-memory `HubClient` fake, avoiding any real
//! network traffic.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gguf_sync::error::SyncError;
use gguf_sync::hub::client::HubClient;
use gguf_sync::hub::types::{ListModelsQuery, ModelSummary, PathInfo, Sibling};

#[derive(Clone)]
pub struct FakeModel {
    pub id: String,
    pub downloads: u64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub files: Vec<&'static str>,
}

impl FakeModel {
    pub fn new(id: &str, downloads: u64, tags: &[&str], age_days: i64, files: &[&'static str]) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            downloads,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: now - chrono::Duration::days(age_days),
            last_modified: now - chrono::Duration::days(age_days),
            files: files.to_vec(),
        }
    }

    fn summary(&self) -> ModelSummary {
        ModelSummary {
            id: self.id.clone(),
            downloads: self.downloads,
            likes: 0,
            tags: self.tags.clone(),
            author: self.id.split('/').next().map(|s| s.to_string()),
            created_at: Some(self.created_at),
            last_modified: Some(self.last_modified),
            siblings: self.files.iter().map(|f| Sibling { rfilename: f.to_string() }).collect(),
        }
    }
}

/// Every hub endpoint served from a fixed roster of models, regardless of
/// the query's filter/search/author/sort — good enough to drive discovery,
/// enrichment, and retention against a deterministic dataset without
/// reimplementing the hub's actual search semantics.
pub struct FakeHub {
    models: Vec<FakeModel>,
    pub call_count: Mutex<u32>,
}

impl FakeHub {
    pub fn new(models: Vec<FakeModel>) -> Self {
        Self { models, call_count: Mutex::new(0) }
    }

    fn bump(&self) {
        *self.call_count.lock().unwrap() += 1;
    }
}

#[async_trait]
impl HubClient for FakeHub {
    async fn list_models(&self, query: ListModelsQuery) -> Result<Vec<ModelSummary>, SyncError> {
        self.bump();
        let mut matches: Vec<ModelSummary> = self
            .models
            .iter()
            .filter(|m| m.tags.iter().any(|t| t == "gguf"))
            .map(|m| m.summary())
            .collect();
        if query.sort.as_deref() == Some("downloads") {
            matches.sort_by(|a, b| b.downloads.cmp(&a.downloads));
        } else {
            matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        if let Some(limit) = query.limit {
            matches.truncate(limit as usize);
        }
        Ok(matches)
    }

    async fn model_info(&self, id: &str) -> Result<ModelSummary, SyncError> {
        self.bump();
        self.models
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.summary())
            .ok_or_else(|| SyncError::Api { status: 404, message: format!("unknown model {id}") })
    }

    async fn list_repo_files(&self, id: &str) -> Result<Vec<String>, SyncError> {
        self.bump();
        let model = self.models.iter().find(|m| m.id == id).ok_or_else(|| SyncError::Api { status: 404, message: format!("unknown model {id}") })?;
        Ok(model.files.iter().map(|f| f.to_string()).collect())
    }

    async fn get_paths_info(&self, id: &str, paths: &[String]) -> Result<Vec<PathInfo>, SyncError> {
        self.bump();
        let model = self.models.iter().find(|m| m.id == id).ok_or_else(|| SyncError::Api { status: 404, message: format!("unknown model {id}") })?;
        Ok(paths
            .iter()
            .map(|p| PathInfo {
                path: p.clone(),
                size: 1_000_000 + (p.len() as u64 * 37),
                last_commit: Some(gguf_sync::hub::types::LastCommit { date: Some(model.last_modified) }),
            })
            .collect())
    }

    async fn count_gguf_models(&self) -> Result<u64, SyncError> {
        self.bump();
        Ok(self.models.iter().filter(|m| m.tags.iter().any(|t| t == "gguf")).count() as u64)
    }
}

pub fn attrs_with_downloads(downloads: u64) -> HashMap<String, serde_json::Value> {
    let mut map = HashMap::new();
    map.insert("downloads".to_string(), downloads.into());
    map
}
