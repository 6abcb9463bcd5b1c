//! G1: date-filtered extraction, grounded in `DateFilteredExtractor` in
//! `original_source/scripts/date_filtered_extractor.py`.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::discovery::heuristic::likely_has_gguf;
use crate::fetcher::{Fetcher, Outcome};
use crate::hub::client::HubClient;
use crate::hub::types::ListModelsQuery;
use crate::types::ModelRef;

#[derive(Debug, Clone)]
pub struct DateFilterResult {
    pub models: Vec<ModelRef>,
    pub cutoff: DateTime<Utc>,
    pub api_calls: u32,
    pub elapsed: Duration,
    pub success: bool,
}

/// Fetch hub models sorted by creation time descending and retain those
/// created on or after `now - retention_days`. A sibling without a parsable
/// creation timestamp is kept at reduced confidence when
/// `recent_models_priority` is set, else dropped (spec §4.G1).
pub async fn extract(
    hub: &dyn HubClient,
    fetcher: &Fetcher,
    retention_days: u32,
    recent_models_priority: bool,
    now: DateTime<Utc>,
    cancel: &CancellationToken,
) -> DateFilterResult {
    let started = Instant::now();
    let cutoff = now - chrono::Duration::days(retention_days as i64);

    let Some(permit) = fetcher.acquire(cancel).await else {
        return DateFilterResult {
            models: Vec::new(),
            cutoff,
            api_calls: 0,
            elapsed: started.elapsed(),
            success: false,
        };
    };
    let query = ListModelsQuery {
        sort: Some("createdAt".to_string()),
        direction: Some(-1),
        ..ListModelsQuery::gguf_tagged()
    };
    let result = hub.list_models(query).await;
    permit.report(Outcome::from_result(&result)).await;

    let summaries = match result {
        Ok(summaries) => summaries,
        Err(error) => {
            tracing::warn!(%error, "date-filtered extraction query failed");
            return DateFilterResult {
                models: Vec::new(),
                cutoff,
                api_calls: 1,
                elapsed: started.elapsed(),
                success: false,
            };
        }
    };

    let mut models = Vec::new();
    for summary in summaries {
        if !likely_has_gguf(&summary.id, &summary.tags) {
            continue;
        }
        match summary.created_at {
            Some(created_at) if created_at >= cutoff => {
                let mut model_ref = ModelRef::new(summary.id, "date_filtered", 1.0);
                model_ref
                    .attributes
                    .insert("downloads".to_string(), summary.downloads.into());
                model_ref
                    .attributes
                    .insert("created_at".to_string(), created_at.to_rfc3339().into());
                models.push(model_ref);
            }
            Some(_) => {}
            None if recent_models_priority => {
                let mut model_ref = ModelRef::new(summary.id, "date_filtered_no_date", 0.8);
                model_ref
                    .attributes
                    .insert("downloads".to_string(), summary.downloads.into());
                models.push(model_ref);
            }
            None => {}
        }
    }

    DateFilterResult {
        models,
        cutoff,
        api_calls: 1,
        elapsed: started.elapsed(),
        success: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::hub::types::{ModelSummary, PathInfo};
    use async_trait::async_trait;

    struct FakeHub {
        summaries: Vec<ModelSummary>,
    }

    #[async_trait]
    impl HubClient for FakeHub {
        async fn list_models(&self, _query: ListModelsQuery) -> Result<Vec<ModelSummary>, SyncError> {
            Ok(self.summaries.clone())
        }
        async fn model_info(&self, _id: &str) -> Result<ModelSummary, SyncError> {
            unimplemented!()
        }
        async fn list_repo_files(&self, _id: &str) -> Result<Vec<String>, SyncError> {
            unimplemented!()
        }
        async fn get_paths_info(&self, _id: &str, _paths: &[String]) -> Result<Vec<PathInfo>, SyncError> {
            unimplemented!()
        }
        async fn count_gguf_models(&self) -> Result<u64, SyncError> {
            unimplemented!()
        }
    }

    fn summary(id: &str, created_at: Option<DateTime<Utc>>) -> ModelSummary {
        ModelSummary {
            id: id.to_string(),
            downloads: 10,
            likes: 0,
            tags: vec!["gguf".to_string()],
            author: None,
            created_at,
            last_modified: None,
            siblings: vec![],
        }
    }

    #[tokio::test]
    async fn retains_only_models_created_after_cutoff() {
        let now = Utc::now();
        let hub = FakeHub {
            summaries: vec![
                summary("org/new-gguf", Some(now - chrono::Duration::days(1))),
                summary("org/old-gguf", Some(now - chrono::Duration::days(100))),
            ],
        };
        let fetcher = Fetcher::new(4, 1000);
        let cancel = CancellationToken::new();
        let result = extract(&hub, &fetcher, 30, false, now, &cancel).await;
        assert!(result.success);
        assert_eq!(result.models.len(), 1);
        assert_eq!(result.models[0].id, "org/new-gguf");
        assert_eq!(result.models[0].discovery_method, vec!["date_filtered"]);
    }

    #[tokio::test]
    async fn undated_model_kept_at_lower_confidence_when_priority_enabled() {
        let now = Utc::now();
        let hub = FakeHub {
            summaries: vec![summary("org/undated-gguf", None)],
        };
        let fetcher = Fetcher::new(4, 1000);
        let cancel = CancellationToken::new();

        let dropped = extract(&hub, &fetcher, 30, false, now, &cancel).await;
        assert!(dropped.models.is_empty());

        let kept = extract(&hub, &fetcher, 30, true, now, &cancel).await;
        assert_eq!(kept.models.len(), 1);
        assert_eq!(kept.models[0].confidence_score, 0.8);
        assert_eq!(kept.models[0].discovery_method, vec!["date_filtered_no_date"]);
    }
}
